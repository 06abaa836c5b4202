use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::CrawlError;
use crate::throttle::PolitenessConfig;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/98.0.4758.102 Safari/537.36";

/// CSS selectors and markers describing one site's listing markup.
///
/// The defaults fit a generic storefront layout and almost always need to
/// be replaced with a profile file for a real site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeProfile {
    /// One element per product. Also the "content ready" signal.
    pub container: String,
    pub name: String,
    pub price: String,
    pub rating: String,
    pub reviews: String,
    /// Element carrying the product link in its `href`.
    pub url: String,
    pub next_page: String,
    /// Case-insensitive text a site shows on an empty listing.
    pub no_results_marker: String,
}

impl Default for ScrapeProfile {
    fn default() -> Self {
        Self {
            container: "div.product-item".into(),
            name: "h2.product-title a".into(),
            price: "span.price".into(),
            rating: "div.rating span.star-rating".into(),
            reviews: "a.reviews-link span".into(),
            url: "h2.product-title a[href]".into(),
            next_page: "a.pagination-next[href]".into(),
            no_results_marker: "no results".into(),
        }
    }
}

impl ScrapeProfile {
    /// Load a profile from a JSON file. Missing keys keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, CrawlError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            CrawlError::Config(format!("Failed to read profile {}: {e}", path.display()))
        })?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// The site being crawled.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// Display name, used in logs only.
    pub name: String,
    /// Base for resolving relative links.
    pub base_url: Url,
    /// Category path or query appended to the base URL for the first page.
    pub category_path: String,
}

impl SiteConfig {
    pub fn new(name: impl Into<String>, base_url: Url, category_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url,
            category_path: category_path.into(),
        }
    }

    pub fn start_url(&self) -> Result<Url, CrawlError> {
        self.base_url.join(&self.category_path).map_err(|e| {
            CrawlError::Config(format!(
                "Cannot build start URL from '{}' and '{}': {e}",
                self.base_url, self.category_path
            ))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// Settings consumed by page fetchers.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub headless: bool,
    pub page_load_timeout: Duration,
    /// Upper bound for the "content ready" wait on each page.
    pub element_wait_timeout: Duration,
    pub user_agent: String,
    pub viewport: Viewport,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            headless: true,
            page_load_timeout: Duration::from_secs(45),
            element_wait_timeout: Duration::from_secs(15),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            viewport: Viewport::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub csv_filename: String,
    pub json_filename: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data"),
            csv_filename: "products.csv".into(),
            json_filename: "products.json".into(),
        }
    }
}

impl OutputConfig {
    pub fn csv_path(&self) -> PathBuf {
        self.dir.join(&self.csv_filename)
    }

    pub fn json_path(&self) -> PathBuf {
        self.dir.join(&self.json_filename)
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub dir: PathBuf,
    pub filename: String,
    /// An `EnvFilter` directive such as `info` or `catalog_core=debug`.
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            filename: "catalog.log".into(),
            level: "info".into(),
        }
    }
}

impl LogConfig {
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.filename)
    }
}

/// Everything one crawl run needs, loaded once at startup.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub site: SiteConfig,
    pub page_budget: u32,
    pub fetcher: FetcherConfig,
    pub politeness: PolitenessConfig,
    pub profile: ScrapeProfile,
    pub output: OutputConfig,
    pub log: LogConfig,
}

impl RunConfig {
    /// Defaults for everything but the site. Page budget defaults to 2.
    pub fn new(site: SiteConfig) -> Self {
        Self {
            site,
            page_budget: 2,
            fetcher: FetcherConfig::default(),
            politeness: PolitenessConfig::default(),
            profile: ScrapeProfile::default(),
            output: OutputConfig::default(),
            log: LogConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<(), CrawlError> {
        match self.site.base_url.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(CrawlError::Config(format!(
                    "Base URL scheme '{scheme}' is not supported (only http/https)"
                )));
            }
        }
        self.site.start_url()?;

        if self.page_budget == 0 {
            return Err(CrawlError::Config("Page budget must be at least 1".into()));
        }
        if self.fetcher.page_load_timeout.is_zero() {
            return Err(CrawlError::Config(
                "Page load timeout must be greater than zero".into(),
            ));
        }
        if self.fetcher.viewport.width == 0 || self.fetcher.viewport.height == 0 {
            return Err(CrawlError::Config(
                "Viewport width and height must be greater than zero".into(),
            ));
        }
        if self.output.csv_filename.trim().is_empty()
            || self.output.json_filename.trim().is_empty()
        {
            return Err(CrawlError::Config("Output filenames must not be empty".into()));
        }
        if self.log.filename.trim().is_empty() {
            return Err(CrawlError::Config("Log filename must not be empty".into()));
        }
        if self.profile.container.trim().is_empty() {
            return Err(CrawlError::Config(
                "Product container selector must not be empty".into(),
            ));
        }
        Ok(())
    }
}
