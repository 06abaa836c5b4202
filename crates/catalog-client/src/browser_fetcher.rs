use std::path::PathBuf;
use std::sync::{Mutex as StdMutex, PoisonError};
use std::time::Duration;

use catalog_core::config::FetcherConfig;
use catalog_core::error::CrawlError;
use catalog_core::traits::PageFetcher;
use chromiumoxide::error::CdpError;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Interval between checks while waiting for a selector to appear.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Browser-automation fetcher using Chromium via the Chrome DevTools Protocol.
///
/// Renders JavaScript before content is read, so listing pages that build
/// their product grid client-side are visible to the extractor.
///
/// One Chromium process and one tab are used for the whole crawl; every
/// [`PageFetcher::fetch`] navigates that tab. [`PageFetcher::close`] shuts
/// the browser down and may be called more than once.
///
/// # Example
///
/// ```rust,no_run
/// use catalog_client::BrowserFetcher;
/// use catalog_core::config::FetcherConfig;
/// use catalog_core::traits::PageFetcher;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let fetcher = BrowserFetcher::launch(&FetcherConfig::default()).await?;
/// let html = fetcher.fetch("https://example.com").await?;
/// println!("{}", &html[..200]);
/// fetcher.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct BrowserFetcher {
    browser: Mutex<Option<Browser>>,
    page: Mutex<Option<Page>>,
    handler: StdMutex<Option<JoinHandle<()>>>,
    page_load_timeout: Duration,
}

impl BrowserFetcher {
    /// Launches Chromium configured from `config`.
    ///
    /// Requires a Chromium / Chrome binary reachable via `$CHROME_BIN`, one
    /// of the well-known install paths, or `chromiumoxide`'s own lookup.
    pub async fn launch(config: &FetcherConfig) -> Result<Self, CrawlError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .disable_default_args();

        // Snap-packaged Chromium exposes a wrapper that rejects standard
        // Chrome CLI flags, so prefer the real binary when one is found.
        if let Some(bin) = find_chrome_binary() {
            tracing::info!("Using Chrome binary: {}", bin.display());
            builder = builder.chrome_executable(bin);
        }

        if config.headless {
            builder = builder.arg("--headless=new");
        } else {
            builder = builder.with_head();
        }

        let viewport = Viewport {
            width: config.viewport.width,
            height: config.viewport.height,
            ..Viewport::default()
        };

        let browser_config = builder
            .window_size(config.viewport.width, config.viewport.height)
            .viewport(viewport)
            .request_timeout(config.page_load_timeout)
            .arg(format!("--user-agent={}", config.user_agent))
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-popup-blocking")
            .arg("--disable-translate")
            .arg("--no-first-run")
            .build()
            .map_err(|e| CrawlError::Setup(format!("Browser config error: {e}")))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| CrawlError::Setup(format!("Failed to launch browser: {e}")))?;

        // The CDP handler must be polled continuously for the connection to work.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    tracing::warn!("Browser CDP handler error: {event:?}");
                    break;
                }
            }
        });

        tracing::info!(
            headless = config.headless,
            width = config.viewport.width,
            height = config.viewport.height,
            "Browser session started"
        );

        Ok(Self {
            browser: Mutex::new(Some(browser)),
            page: Mutex::new(None),
            handler: StdMutex::new(Some(handler_task)),
            page_load_timeout: config.page_load_timeout,
        })
    }

    /// The crawl's tab, opened on first use.
    async fn page(&self) -> Result<Page, CrawlError> {
        let mut slot = self.page.lock().await;
        if let Some(page) = slot.as_ref() {
            return Ok(page.clone());
        }

        let browser = self.browser.lock().await;
        let browser = browser
            .as_ref()
            .ok_or_else(|| CrawlError::Transport("Browser session is closed".into()))?;
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| self.classify(e, "about:blank"))?;

        *slot = Some(page.clone());
        Ok(page)
    }

    fn classify(&self, e: CdpError, url: &str) -> CrawlError {
        match e {
            CdpError::Timeout => CrawlError::Timeout(self.page_load_timeout.as_secs()),
            CdpError::Ws(_) | CdpError::ChannelSendError(_) | CdpError::NoResponse => {
                CrawlError::Transport(format!("Browser connection lost: {e}"))
            }
            other => CrawlError::Navigation(format!("Failed to navigate to {url}: {other}")),
        }
    }
}

impl PageFetcher for BrowserFetcher {
    async fn fetch(&self, url: &str) -> Result<String, CrawlError> {
        let page = self.page().await?;

        match tokio::time::timeout(self.page_load_timeout, page.goto(url)).await {
            Err(_) => return Err(CrawlError::Timeout(self.page_load_timeout.as_secs())),
            Ok(Err(e)) => return Err(self.classify(e, url)),
            Ok(Ok(_)) => {}
        }

        page.content().await.map_err(|e| self.classify(e, url))
    }

    async fn wait_for_selector(&self, css: &str, timeout: Duration) -> Result<bool, CrawlError> {
        let page = self.page().await?;
        let deadline = Instant::now() + timeout;

        loop {
            if page.find_element(css).await.is_ok() {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn current_html(&self) -> Result<String, CrawlError> {
        let page = self.page.lock().await.clone();
        match page {
            Some(page) => page
                .content()
                .await
                .map_err(|e| self.classify(e, "current page")),
            None => Ok(String::new()),
        }
    }

    async fn close(&self) -> Result<(), CrawlError> {
        if let Some(page) = self.page.lock().await.take()
            && let Err(e) = page.close().await
        {
            tracing::debug!(error = %e, "Failed to close tab");
        }

        let Some(mut browser) = self.browser.lock().await.take() else {
            return Ok(());
        };

        let result = browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| CrawlError::Transport(format!("Failed to close browser: {e}")));
        let _ = browser.wait().await;

        if let Some(handler) = self
            .handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handler.abort();
        }

        tracing::info!("Browser session closed");
        result
    }
}

/// Tries to locate the real Chrome/Chromium binary.
///
/// `$CHROME_BIN` wins when it points at an existing file, then well-known
/// system paths are checked. `None` lets `chromiumoxide` do its own lookup.
fn find_chrome_binary() -> Option<PathBuf> {
    const CANDIDATES: &[&str] = &[
        "/snap/chromium/current/usr/lib/chromium-browser/chrome",
        "/var/lib/flatpak/exports/bin/org.chromium.Chromium",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/google-chrome",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
    ];

    if let Ok(p) = std::env::var("CHROME_BIN") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    CANDIDATES.iter().map(PathBuf::from).find(|p| p.exists())
}
