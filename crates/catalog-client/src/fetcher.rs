use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use catalog_core::config::FetcherConfig;
use catalog_core::error::CrawlError;
use catalog_core::traits::PageFetcher;
use reqwest::Client;
use scraper::Html;

use crate::extractor::parse_selector;

/// Plain HTTP fetcher using reqwest.
///
/// Downloads server-rendered HTML with the configured User-Agent and page
/// load timeout. There is no script execution, so the "content ready" wait
/// is a single check against the last downloaded document.
///
/// The last body received (including the body of a non-2xx response) is kept
/// as the current document, which is what [`PageFetcher::current_html`]
/// returns after a failed load.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout_secs: u64,
    document: Arc<Mutex<String>>,
}

impl HttpFetcher {
    pub fn new(config: &FetcherConfig) -> Result<Self, CrawlError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.page_load_timeout)
            .build()
            .map_err(|e| CrawlError::Setup(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            timeout_secs: config.page_load_timeout.as_secs(),
            document: Arc::new(Mutex::new(String::new())),
        })
    }

    fn set_document(&self, html: String) {
        *self.document.lock().unwrap_or_else(PoisonError::into_inner) = html;
    }

    fn document(&self) -> String {
        self.document
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn classify(&self, e: reqwest::Error, url: &str) -> CrawlError {
        if e.is_timeout() {
            CrawlError::Timeout(self.timeout_secs)
        } else if e.is_connect() {
            CrawlError::Transport(format!("Connection failed: {e}"))
        } else {
            CrawlError::Navigation(format!("Failed to load {url}: {e}"))
        }
    }
}

impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, CrawlError> {
        self.set_document(String::new());

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(e, url))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                CrawlError::Timeout(self.timeout_secs)
            } else {
                CrawlError::Navigation(format!("Failed to read response body: {e}"))
            }
        })?;
        self.set_document(body.clone());

        if !status.is_success() {
            return Err(CrawlError::Navigation(format!(
                "HTTP {} for {}",
                status.as_u16(),
                url
            )));
        }
        Ok(body)
    }

    async fn wait_for_selector(&self, css: &str, _timeout: Duration) -> Result<bool, CrawlError> {
        let selector = parse_selector(css)?;
        let document = Html::parse_document(&self.document());
        Ok(document.select(&selector).next().is_some())
    }

    async fn current_html(&self) -> Result<String, CrawlError> {
        Ok(self.document())
    }

    async fn close(&self) -> Result<(), CrawlError> {
        self.set_document(String::new());
        Ok(())
    }
}
