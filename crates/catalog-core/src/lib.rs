pub mod config;
pub mod crawl;
pub mod error;
pub mod models;
pub mod throttle;
pub mod traits;
pub mod util;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use config::{RunConfig, ScrapeProfile, SiteConfig};
pub use crawl::{CrawlController, CrawlSettings, run_session, save_records};
pub use error::CrawlError;
pub use models::{CrawlReport, ProductRecord, TerminalReason};
pub use traits::{PageFetcher, Paginator, RecordExtractor, Sink};
