use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use url::Url;

use catalog_client::{FileSink, HttpFetcher, SelectorExtractor, SelectorPaginator};
use catalog_core::config::{
    DEFAULT_USER_AGENT, FetcherConfig, LogConfig, OutputConfig, RunConfig, ScrapeProfile,
    SiteConfig, Viewport,
};
use catalog_core::crawl::{CrawlController, CrawlSettings, run_session, save_records};
use catalog_core::error::CrawlError;
use catalog_core::models::CrawlReport;
use catalog_core::throttle::PolitenessConfig;
use catalog_core::traits::PageFetcher;

#[derive(Parser, Debug)]
#[command(
    name = "catalog",
    version,
    about = "Crawl a paginated product category and save the listings"
)]
struct Cli {
    /// Display name of the target site (used in logs only)
    #[arg(long, env = "CATALOG_SITE_NAME", default_value = "Example E-commerce Site")]
    site_name: String,

    /// Base URL of the target site; relative links resolve against it
    #[arg(
        long,
        env = "CATALOG_BASE_URL",
        default_value = "https://www.example-ecommerce.com"
    )]
    base_url: Url,

    /// Path of the first category listing page, relative to the base URL
    #[arg(long, env = "CATALOG_CATEGORY_PATH", default_value = "/electronics/laptops")]
    category_path: String,

    /// Maximum number of listing pages to visit
    #[arg(short = 'p', long, env = "CATALOG_MAX_PAGES", default_value_t = 2)]
    max_pages: u32,

    /// How pages are loaded
    #[arg(long, value_enum, env = "CATALOG_FETCHER", default_value_t = FetcherKind::Http)]
    fetcher: FetcherKind,

    /// Show the browser window instead of running headless
    #[arg(long, env = "CATALOG_HEADED", default_value_t = false)]
    headed: bool,

    /// Page load timeout in seconds
    #[arg(long, env = "CATALOG_PAGE_LOAD_TIMEOUT", default_value_t = 45)]
    page_load_timeout: u64,

    /// How long to wait for product containers to render, in seconds
    #[arg(long, env = "CATALOG_ELEMENT_WAIT_TIMEOUT", default_value_t = 15)]
    element_wait_timeout: u64,

    /// Pause between listing pages, in milliseconds
    #[arg(long, env = "CATALOG_DELAY_MS", default_value_t = 3000)]
    delay_ms: u64,

    /// Extra random pause added to each delay, up to this many milliseconds
    #[arg(long, env = "CATALOG_JITTER_MS", default_value_t = 0)]
    jitter_ms: u64,

    /// User-Agent header sent with every request
    #[arg(long, env = "CATALOG_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    user_agent: String,

    #[arg(long, env = "CATALOG_VIEWPORT_WIDTH", default_value_t = 1920)]
    viewport_width: u32,

    #[arg(long, env = "CATALOG_VIEWPORT_HEIGHT", default_value_t = 1080)]
    viewport_height: u32,

    /// JSON file overriding the default CSS selectors
    #[arg(long, env = "CATALOG_PROFILE")]
    profile: Option<PathBuf>,

    /// Directory for the CSV and JSON output
    #[arg(short, long, env = "CATALOG_OUTPUT_DIR", default_value = "data")]
    output_dir: PathBuf,

    #[arg(long, env = "CATALOG_CSV_FILENAME", default_value = "products.csv")]
    csv_filename: String,

    #[arg(long, env = "CATALOG_JSON_FILENAME", default_value = "products.json")]
    json_filename: String,

    /// Directory for the log file
    #[arg(long, env = "CATALOG_LOG_DIR", default_value = "logs")]
    log_dir: PathBuf,

    #[arg(long, env = "CATALOG_LOG_FILE", default_value = "catalog.log")]
    log_file: String,

    /// Log filter, e.g. "info" or "catalog_core=debug" (RUST_LOG wins when set)
    #[arg(long, env = "CATALOG_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum FetcherKind {
    /// Plain HTTP requests; no JavaScript
    Http,
    /// Headless Chromium (requires the `browser` feature)
    Browser,
}

impl Cli {
    fn into_config(self) -> Result<RunConfig, CrawlError> {
        let profile = match &self.profile {
            Some(path) => ScrapeProfile::from_json_file(path)?,
            None => ScrapeProfile::default(),
        };

        let config = RunConfig {
            site: SiteConfig::new(self.site_name, self.base_url, self.category_path),
            page_budget: self.max_pages,
            fetcher: FetcherConfig {
                headless: !self.headed,
                page_load_timeout: Duration::from_secs(self.page_load_timeout),
                element_wait_timeout: Duration::from_secs(self.element_wait_timeout),
                user_agent: self.user_agent,
                viewport: Viewport {
                    width: self.viewport_width,
                    height: self.viewport_height,
                },
            },
            politeness: PolitenessConfig::new(Duration::from_millis(self.delay_ms))
                .with_jitter(Duration::from_millis(self.jitter_ms)),
            profile,
            output: OutputConfig {
                dir: self.output_dir,
                csv_filename: self.csv_filename,
                json_filename: self.json_filename,
            },
            log: LogConfig {
                dir: self.log_dir,
                filename: self.log_file,
                level: self.log_level,
            },
        };
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let kind = cli.fetcher;
    let config = cli.into_config().context("Invalid configuration")?;

    init_logging(&config.log)?;

    tracing::info!(site = %config.site.name, "--- Starting scraper ---");
    let result = match kind {
        FetcherKind::Http => {
            let fetcher =
                HttpFetcher::new(&config.fetcher).context("Failed to create HTTP client")?;
            crawl(&fetcher, &config).await
        }
        FetcherKind::Browser => crawl_with_browser(&config).await,
    };

    match result {
        Ok(report) => {
            tracing::info!(
                site = %config.site.name,
                run_id = %report.run_id,
                records = report.records.len(),
                pages = report.pages_visited,
                reason = %report.reason,
                "--- Scraper finished ---"
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl setup failed: {e:#}");
            Err(e)
        }
    }
}

/// Install stderr and log-file layers behind one `EnvFilter`.
fn init_logging(log: &LogConfig) -> Result<()> {
    fs::create_dir_all(&log.dir)
        .with_context(|| format!("Failed to create log directory: {}", log.dir.display()))?;
    let path = log.path();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&log.level))
        .with_context(|| format!("Invalid log level: {}", log.level))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;
    Ok(())
}

#[cfg(feature = "browser")]
async fn crawl_with_browser(config: &RunConfig) -> Result<CrawlReport> {
    let fetcher = catalog_client::BrowserFetcher::launch(&config.fetcher)
        .await
        .context("Failed to launch browser")?;
    crawl(&fetcher, config).await
}

#[cfg(not(feature = "browser"))]
async fn crawl_with_browser(_config: &RunConfig) -> Result<CrawlReport> {
    anyhow::bail!("This build has no browser support; rebuild with `--features browser`")
}

/// Run the crawl inside a fetching session and save whatever was collected.
///
/// Only setup problems surface as `Err`; crawl and save failures are logged.
async fn crawl<F: PageFetcher>(fetcher: &F, config: &RunConfig) -> Result<CrawlReport> {
    let start_url = config.site.start_url()?;
    let settings = CrawlSettings::from_config(config);

    let report = run_session(fetcher, |f| async move {
        let base = config.site.base_url.clone();
        let extractor = SelectorExtractor::new(&config.profile, base.clone())?;
        let paginator = SelectorPaginator::new(&config.profile, base)?;

        let controller = CrawlController::new(f, extractor, paginator, settings);
        Ok::<_, CrawlError>(controller.run(start_url.as_str(), config.page_budget).await)
    })
    .await
    .context("Failed to prepare the crawl")?;

    if let Some(error) = &report.error {
        tracing::warn!(reason = %report.reason, "Crawl ended early: {error}");
    }

    match save_records(&FileSink::new(), &report.records, &config.output) {
        Ok(true) => tracing::info!(
            records = report.records.len(),
            csv = %config.output.csv_path().display(),
            json = %config.output.json_path().display(),
            "Saved scraped products"
        ),
        Ok(false) => {}
        Err(e) => tracing::error!("Error saving data: {e}"),
    }

    Ok(report)
}
