use thiserror::Error;

/// Error types shared by every Catalog crate.
#[derive(Error, Debug)]
pub enum CrawlError {
    /// The fetching session (HTTP client, browser) could not be created.
    #[error("Setup error: {0}")]
    Setup(String),

    /// Invalid run configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A CSS selector in the scrape profile failed to compile.
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Connection or driver-level failure. The session is unusable.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Page load did not complete in time.
    #[error("Page load timed out after {0} seconds")]
    Timeout(u64),

    /// The page could not be loaded (bad status, navigation refused).
    #[error("Navigation error: {0}")]
    Navigation(String),

    /// Record extraction failed for a whole page.
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Writing results failed.
    #[error("Sink error: {0}")]
    Sink(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CrawlError {
    /// Returns true if the crawl cannot continue after this error.
    ///
    /// Everything else is a per-page failure the controller recovers from
    /// by moving on to the next page, if one can be found.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CrawlError::Transport(_) | CrawlError::Setup(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, CrawlError::Timeout(_))
    }
}
