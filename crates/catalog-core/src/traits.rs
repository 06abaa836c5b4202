use std::future::Future;
use std::path::Path;
use std::time::Duration;

use url::Url;

use crate::error::CrawlError;
use crate::models::ProductRecord;

/// A page-fetching session: one long-lived client or browser tab.
///
/// Implementations keep the most recently loaded document so the
/// controller can re-read it after waiting or after a failure.
pub trait PageFetcher: Send + Sync {
    /// Navigate to `url` and return the HTML available once loading ends.
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, CrawlError>> + Send;

    /// Wait up to `timeout` for `css` to match. `Ok(false)` means timed out.
    fn wait_for_selector(
        &self,
        css: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<bool, CrawlError>> + Send;

    /// HTML of the current document, possibly partial after a failure.
    fn current_html(&self) -> impl Future<Output = Result<String, CrawlError>> + Send;

    /// Release the session. Must tolerate being called after a failure.
    fn close(&self) -> impl Future<Output = Result<(), CrawlError>> + Send;
}

/// Turns a listing page into product records.
pub trait RecordExtractor: Send + Sync {
    fn extract(&self, html: &str) -> Result<Vec<ProductRecord>, CrawlError>;
}

/// Finds the next listing page. Absence is a normal outcome.
pub trait Paginator: Send + Sync {
    fn find_next(&self, html: &str) -> Option<Url>;
}

/// Persists collected records.
///
/// Both methods are no-ops (with a warning) for an empty slice, create the
/// destination directory if needed, and overwrite any existing file.
pub trait Sink: Send + Sync {
    fn write_tabular(&self, records: &[ProductRecord], path: &Path) -> Result<(), CrawlError>;

    fn write_document(&self, records: &[ProductRecord], path: &Path) -> Result<(), CrawlError>;
}
