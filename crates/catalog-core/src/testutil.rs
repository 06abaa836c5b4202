//! Test utilities: mock implementations of the collaborator traits.
//!
//! Handwritten mocks for driving the crawl controller with literal HTML.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use url::Url;

use crate::error::CrawlError;
use crate::models::ProductRecord;
use crate::traits::{PageFetcher, Paginator, RecordExtractor, Sink};

// ---------------------------------------------------------------------------
// MockPageFetcher
// ---------------------------------------------------------------------------

struct MockPage {
    html: String,
    /// Whether `wait_for_selector` reports the content as ready.
    ready: bool,
    /// Returned by the next `fetch` of this URL; `html` is then the partial
    /// content left behind.
    error: Option<CrawlError>,
}

#[derive(Default)]
struct FetcherState {
    pages: HashMap<String, MockPage>,
    current_html: String,
    current_ready: bool,
    visited: Vec<String>,
    close_calls: u32,
}

/// Mock fetcher serving canned HTML per URL.
///
/// Unknown URLs fail with a navigation error and leave an empty document.
#[derive(Clone, Default)]
pub struct MockPageFetcher {
    state: Arc<Mutex<FetcherState>>,
}

impl MockPageFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(self, url: &str, page: MockPage) -> Self {
        self.state
            .lock()
            .unwrap()
            .pages
            .insert(url.to_string(), page);
        self
    }

    /// A page whose listing content renders in time.
    pub fn with_page(self, url: &str, html: &str) -> Self {
        self.insert(
            url,
            MockPage {
                html: html.to_string(),
                ready: true,
                error: None,
            },
        )
    }

    /// A page that loads but never shows the awaited selector.
    pub fn with_unready_page(self, url: &str, html: &str) -> Self {
        self.insert(
            url,
            MockPage {
                html: html.to_string(),
                ready: false,
                error: None,
            },
        )
    }

    /// A page whose fetch fails with `error`, leaving `partial_html` behind.
    pub fn with_failing_page(self, url: &str, error: CrawlError, partial_html: &str) -> Self {
        self.insert(
            url,
            MockPage {
                html: partial_html.to_string(),
                ready: false,
                error: Some(error),
            },
        )
    }

    /// URLs passed to `fetch`, in call order.
    pub fn visited(&self) -> Vec<String> {
        self.state.lock().unwrap().visited.clone()
    }

    pub fn close_calls(&self) -> u32 {
        self.state.lock().unwrap().close_calls
    }
}

impl PageFetcher for MockPageFetcher {
    async fn fetch(&self, url: &str) -> Result<String, CrawlError> {
        let mut state = self.state.lock().unwrap();
        state.visited.push(url.to_string());

        let Some(page) = state.pages.get_mut(url) else {
            state.current_html.clear();
            state.current_ready = false;
            return Err(CrawlError::Navigation(format!("No fixture for {url}")));
        };

        let html = page.html.clone();
        let ready = page.ready;
        let error = page.error.take();

        state.current_html = html.clone();
        state.current_ready = ready;
        match error {
            Some(e) => Err(e),
            None => Ok(html),
        }
    }

    async fn wait_for_selector(&self, _css: &str, _timeout: Duration) -> Result<bool, CrawlError> {
        Ok(self.state.lock().unwrap().current_ready)
    }

    async fn current_html(&self) -> Result<String, CrawlError> {
        Ok(self.state.lock().unwrap().current_html.clone())
    }

    async fn close(&self) -> Result<(), CrawlError> {
        self.state.lock().unwrap().close_calls += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockExtractor
// ---------------------------------------------------------------------------

/// Mock extractor keyed by the exact HTML it receives.
///
/// Unknown HTML yields no records.
#[derive(Clone, Default)]
pub struct MockExtractor {
    records: Arc<Mutex<HashMap<String, Vec<ProductRecord>>>>,
    failures: Arc<Mutex<HashMap<String, String>>>,
    calls: Arc<Mutex<u32>>,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(self, html: &str, records: Vec<ProductRecord>) -> Self {
        self.records
            .lock()
            .unwrap()
            .insert(html.to_string(), records);
        self
    }

    /// Extraction of `html` fails with an extraction error.
    pub fn with_failure(self, html: &str, message: &str) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(html.to_string(), message.to_string());
        self
    }

    pub fn calls(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

impl RecordExtractor for MockExtractor {
    fn extract(&self, html: &str) -> Result<Vec<ProductRecord>, CrawlError> {
        *self.calls.lock().unwrap() += 1;
        if let Some(message) = self.failures.lock().unwrap().get(html) {
            return Err(CrawlError::Extraction(message.clone()));
        }
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(html)
            .cloned()
            .unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// MockPaginator
// ---------------------------------------------------------------------------

/// Mock paginator mapping page HTML to a next URL.
#[derive(Clone, Default)]
pub struct MockPaginator {
    links: Arc<Mutex<HashMap<String, Url>>>,
}

impl MockPaginator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_link(self, html: &str, next: &str) -> Self {
        let next = Url::parse(next).unwrap();
        self.links.lock().unwrap().insert(html.to_string(), next);
        self
    }
}

impl Paginator for MockPaginator {
    fn find_next(&self, html: &str) -> Option<Url> {
        self.links.lock().unwrap().get(html).cloned()
    }
}

// ---------------------------------------------------------------------------
// MockSink
// ---------------------------------------------------------------------------

/// Recorded write: (destination, number of records).
pub type SinkWrite = (PathBuf, usize);

/// Mock sink that records every write call.
#[derive(Clone, Default)]
pub struct MockSink {
    pub tabular_writes: Arc<Mutex<Vec<SinkWrite>>>,
    pub document_writes: Arc<Mutex<Vec<SinkWrite>>>,
}

impl MockSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_count(&self) -> usize {
        self.tabular_writes.lock().unwrap().len() + self.document_writes.lock().unwrap().len()
    }
}

impl Sink for MockSink {
    fn write_tabular(&self, records: &[ProductRecord], path: &Path) -> Result<(), CrawlError> {
        self.tabular_writes
            .lock()
            .unwrap()
            .push((path.to_path_buf(), records.len()));
        Ok(())
    }

    fn write_document(&self, records: &[ProductRecord], path: &Path) -> Result<(), CrawlError> {
        self.document_writes
            .lock()
            .unwrap()
            .push((path.to_path_buf(), records.len()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// A record named `name` pointing at a product page derived from it.
pub fn make_test_record(name: &str) -> ProductRecord {
    let slug = name.to_lowercase().replace(' ', "-");
    let url = Url::parse(&format!("https://shop.test/p/{slug}")).unwrap();
    ProductRecord::new(name, &url).unwrap()
}
