use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use url::Url;
use uuid::Uuid;

use crate::config::{OutputConfig, RunConfig};
use crate::error::CrawlError;
use crate::models::{CrawlReport, CrawlState, PageOutcome, ProductRecord, TerminalReason};
use crate::throttle::PolitenessConfig;
use crate::traits::{PageFetcher, Paginator, RecordExtractor, Sink};

/// Controller settings taken from the run configuration.
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    /// Selector whose presence means the listing has rendered.
    pub ready_selector: String,
    /// Case-insensitive text marking an empty listing.
    pub no_results_marker: String,
    pub element_wait: Duration,
    pub politeness: PolitenessConfig,
}

impl CrawlSettings {
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            ready_selector: config.profile.container.clone(),
            no_results_marker: config.profile.no_results_marker.clone(),
            element_wait: config.fetcher.element_wait_timeout,
            politeness: config.politeness.clone(),
        }
    }
}

/// Drives the paginated crawl: fetch → extract → find next → repeat.
///
/// Generic over every collaborator so the loop can be driven with literal
/// HTML in tests. The fetcher is borrowed: releasing it is the caller's
/// job (see [`run_session`]).
pub struct CrawlController<'a, F, E, P>
where
    F: PageFetcher,
    E: RecordExtractor,
    P: Paginator,
{
    fetcher: &'a F,
    extractor: E,
    paginator: P,
    settings: CrawlSettings,
}

impl<'a, F, E, P> CrawlController<'a, F, E, P>
where
    F: PageFetcher,
    E: RecordExtractor,
    P: Paginator,
{
    pub fn new(fetcher: &'a F, extractor: E, paginator: P, settings: CrawlSettings) -> Self {
        Self {
            fetcher,
            extractor,
            paginator,
            settings,
        }
    }

    /// Crawl from `start_url`, visiting at most `page_budget` pages.
    ///
    /// Never fails: a fatal transport error ends the loop early and the
    /// report still carries every record collected before it.
    pub async fn run(&self, start_url: &str, page_budget: u32) -> CrawlReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();

        let start = match Url::parse(start_url) {
            Ok(url) => url,
            Err(e) => {
                tracing::error!(%run_id, url = %start_url, error = %e, "Invalid start URL");
                return CrawlReport {
                    run_id,
                    records: Vec::new(),
                    pages_visited: 0,
                    reason: TerminalReason::FetchFailed,
                    error: Some(format!("Invalid start URL '{start_url}': {e}")),
                    started_at,
                    finished_at: Utc::now(),
                };
            }
        };

        tracing::info!(%run_id, url = %start, page_budget, "Starting crawl");

        let mut state = CrawlState::new(start, page_budget);
        let mut reason = TerminalReason::NoNextLink;
        let mut error = None;

        while state.has_next() {
            let Some(url) = state.current_url.take() else {
                break;
            };
            state.page_index += 1;
            let page = state.page_index;
            tracing::info!(page, %url, "Scraping page");

            let outcome = match self.visit_page(&url, page).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(page, %url, error = %e, "Fatal fetch error, aborting crawl");
                    reason = TerminalReason::Fatal;
                    error = Some(e.to_string());
                    break;
                }
            };

            let found = outcome.records.len();
            state.accumulated.extend(outcome.records);
            if outcome.html.is_some() {
                tracing::info!(
                    page,
                    found,
                    total = state.accumulated.len(),
                    "Page scraped"
                );
            }

            match outcome.next_url {
                Some(next) => {
                    tracing::debug!(page, next = %next, "Found next page link");
                    state.current_url = Some(next);
                    if state.budget_exhausted() {
                        reason = TerminalReason::BudgetExhausted;
                        tracing::info!(page_budget, "Reached page budget, stopping");
                    } else {
                        self.settings.politeness.wait_between_pages().await;
                    }
                }
                None => {
                    reason = outcome.terminal.unwrap_or(TerminalReason::NoNextLink);
                    error = outcome.error;
                    tracing::info!(page, %reason, "No further pages to visit");
                }
            }
        }

        tracing::info!(
            %run_id,
            pages = state.page_index,
            total = state.accumulated.len(),
            %reason,
            "Crawl finished"
        );

        CrawlReport {
            run_id,
            records: state.accumulated,
            pages_visited: state.page_index,
            reason,
            error,
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// One loop iteration. `Err` only for fatal errors; everything else is
    /// folded into the outcome.
    async fn visit_page(&self, url: &Url, page: u32) -> Result<PageOutcome, CrawlError> {
        if let Err(e) = self.fetcher.fetch(url.as_str()).await {
            if e.is_fatal() {
                return Err(e);
            }
            tracing::warn!(page, %url, error = %e, "Page fetch failed, skipping page");
            return self.recover(e, TerminalReason::FetchFailed).await;
        }

        let ready = &self.settings.ready_selector;
        match self
            .fetcher
            .wait_for_selector(ready, self.settings.element_wait)
            .await
        {
            Ok(true) => tracing::debug!(page, selector = %ready, "Listing content ready"),
            Ok(false) => {
                tracing::warn!(
                    page,
                    selector = %ready,
                    timeout_secs = self.settings.element_wait.as_secs(),
                    "Timed out waiting for product containers, page may be empty or changed"
                );
                if self.shows_no_results().await? {
                    tracing::info!(page, "Page reports no results, stopping pagination");
                    return Ok(PageOutcome::terminal(TerminalReason::NoResults));
                }
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::warn!(page, error = %e, "Waiting for content failed, skipping page");
                return self.recover(e, TerminalReason::FetchFailed).await;
            }
        }

        self.settings.politeness.settle().await;

        let html = match self.fetcher.current_html().await {
            Ok(html) => html,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::warn!(page, error = %e, "Could not read page content");
                String::new()
            }
        };
        if html.trim().is_empty() {
            tracing::warn!(page, %url, "No HTML content retrieved, skipping page");
            return self
                .recover(
                    CrawlError::Navigation(format!("Empty document at {url}")),
                    TerminalReason::FetchFailed,
                )
                .await;
        }

        let records = match self.extractor.extract(&html) {
            Ok(records) => records,
            Err(e) => {
                tracing::error!(page, %url, error = %e, "Unexpected error while scraping page");
                return Ok(self.recover_from(&html, e, TerminalReason::PageError));
            }
        };

        if records.is_empty() {
            if page == 1 {
                tracing::warn!(
                    "No products found on the first page, check the scrape profile selectors against the site"
                );
            } else {
                tracing::info!(page, "No products found, this may be the end of results");
            }
        }

        let next_url = self.paginator.find_next(&html);
        Ok(PageOutcome {
            html: Some(html),
            records,
            next_url,
            terminal: None,
            error: None,
        })
    }

    async fn shows_no_results(&self) -> Result<bool, CrawlError> {
        let marker = self.settings.no_results_marker.to_lowercase();
        if marker.is_empty() {
            return Ok(false);
        }
        match self.fetcher.current_html().await {
            Ok(html) => Ok(html.to_lowercase().contains(&marker)),
            Err(e) if e.is_fatal() => Err(e),
            Err(_) => Ok(false),
        }
    }

    /// Look for a next link in whatever the fetcher still holds.
    async fn recover(
        &self,
        cause: CrawlError,
        reason: TerminalReason,
    ) -> Result<PageOutcome, CrawlError> {
        match self.fetcher.current_html().await {
            Ok(html) => Ok(self.recover_from(&html, cause, reason)),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                tracing::error!(error = %e, "Failed to read partial content, stopping");
                Ok(PageOutcome {
                    terminal: Some(reason),
                    error: Some(cause.to_string()),
                    ..PageOutcome::default()
                })
            }
        }
    }

    fn recover_from(&self, html: &str, cause: CrawlError, reason: TerminalReason) -> PageOutcome {
        let next_url = self.paginator.find_next(html);
        match &next_url {
            Some(next) => tracing::info!(next = %next, "Recovered next page link, continuing"),
            None => tracing::error!("Failed to find next page link after page error, stopping"),
        }
        PageOutcome {
            next_url,
            terminal: Some(reason),
            error: Some(cause.to_string()),
            ..PageOutcome::default()
        }
    }
}

/// Run `body` against `fetcher`, then close the fetcher exactly once.
///
/// The close happens whatever `body` returns; a close failure is logged and
/// does not replace the body's result.
pub async fn run_session<'a, F, T, Fut>(fetcher: &'a F, body: impl FnOnce(&'a F) -> Fut) -> T
where
    F: PageFetcher,
    Fut: Future<Output = T>,
{
    let result = body(fetcher).await;
    match fetcher.close().await {
        Ok(()) => tracing::info!("Fetching session closed"),
        Err(e) => tracing::error!(error = %e, "Error closing fetching session"),
    }
    result
}

/// Hand the collected records to `sink` in both output forms.
///
/// Returns `Ok(false)` without touching the sink when there is nothing to
/// save. Both forms are attempted even if the first one fails; the first
/// error is returned.
pub fn save_records<S: Sink>(
    sink: &S,
    records: &[ProductRecord],
    output: &OutputConfig,
) -> Result<bool, CrawlError> {
    if records.is_empty() {
        tracing::warn!("No products were scraped, nothing to save");
        return Ok(false);
    }

    let tabular = sink.write_tabular(records, &output.csv_path());
    let document = sink.write_document(records, &output.json_path());
    tabular.and(document).map(|()| true)
}
