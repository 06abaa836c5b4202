pub mod extractor;
pub mod fetcher;
pub mod paginator;
pub mod sink;

#[cfg(feature = "browser")]
pub mod browser_fetcher;

#[cfg(feature = "browser")]
pub use browser_fetcher::BrowserFetcher;
pub use extractor::SelectorExtractor;
pub use fetcher::HttpFetcher;
pub use paginator::SelectorPaginator;
pub use sink::FileSink;
