use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// One product scraped from a listing page.
///
/// `name` and `url` are always present: [`ProductRecord::new`] is the only
/// way to build one and it refuses a blank name. Every other field degrades
/// to `None` when the page does not yield a usable value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub name: String,
    pub price: Option<f64>,
    pub rating: Option<f64>,
    pub reviews: Option<u64>,
    /// Absolute product URL.
    pub url: String,
    #[serde(rename = "scraped_timestamp")]
    pub scraped_at: DateTime<Utc>,
}

impl ProductRecord {
    /// Returns `None` if `name` is blank after trimming.
    pub fn new(name: &str, url: &Url) -> Option<Self> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            price: None,
            rating: None,
            reviews: None,
            url: url.to_string(),
            scraped_at: Utc::now(),
        })
    }

    pub fn with_price(mut self, price: Option<f64>) -> Self {
        self.price = price;
        self
    }

    pub fn with_rating(mut self, rating: Option<f64>) -> Self {
        self.rating = rating;
        self
    }

    pub fn with_reviews(mut self, reviews: Option<u64>) -> Self {
        self.reviews = reviews;
        self
    }
}

/// Why a crawl stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalReason {
    /// The page explicitly said there are no results.
    NoResults,
    /// The last visited page had no next-page link.
    NoNextLink,
    /// The page budget ran out while a next page was still available.
    BudgetExhausted,
    /// A page could not be fetched and no next link could be recovered.
    FetchFailed,
    /// A page failed after fetching and no next link could be recovered.
    PageError,
    /// A transport failure aborted the crawl.
    Fatal,
}

impl TerminalReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminalReason::NoResults => "no_results",
            TerminalReason::NoNextLink => "no_next_link",
            TerminalReason::BudgetExhausted => "budget_exhausted",
            TerminalReason::FetchFailed => "fetch_failed",
            TerminalReason::PageError => "page_error",
            TerminalReason::Fatal => "fatal",
        }
    }
}

impl fmt::Display for TerminalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Mutable state of one crawl run. Owned by the controller.
#[derive(Debug)]
pub struct CrawlState {
    pub current_url: Option<Url>,
    pub page_index: u32,
    pub page_budget: u32,
    pub accumulated: Vec<ProductRecord>,
}

impl CrawlState {
    pub fn new(start_url: Url, page_budget: u32) -> Self {
        Self {
            current_url: Some(start_url),
            page_index: 0,
            page_budget,
            accumulated: Vec::new(),
        }
    }

    /// True while there is a page to visit and budget left to visit it.
    pub fn has_next(&self) -> bool {
        self.current_url.is_some() && self.page_index < self.page_budget
    }

    pub fn budget_exhausted(&self) -> bool {
        self.page_index >= self.page_budget
    }
}

/// Result of visiting a single page. Lives for one loop iteration.
#[derive(Debug, Default)]
pub struct PageOutcome {
    pub html: Option<String>,
    pub records: Vec<ProductRecord>,
    pub next_url: Option<Url>,
    pub terminal: Option<TerminalReason>,
    /// The page-level error this outcome recovered from, if any.
    pub error: Option<String>,
}

impl PageOutcome {
    pub fn terminal(reason: TerminalReason) -> Self {
        Self {
            terminal: Some(reason),
            ..Self::default()
        }
    }
}

/// Summary of a completed crawl run.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    pub run_id: Uuid,
    pub records: Vec<ProductRecord>,
    pub pages_visited: u32,
    pub reason: TerminalReason,
    /// Set when the crawl ended on an error (fatal or unrecovered).
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CrawlReport {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product_url() -> Url {
        Url::parse("https://shop.example.com/p/1").unwrap()
    }

    #[test]
    fn test_record_requires_name() {
        assert!(ProductRecord::new("", &product_url()).is_none());
        assert!(ProductRecord::new("   ", &product_url()).is_none());

        let record = ProductRecord::new("  Laptop  ", &product_url()).unwrap();
        assert_eq!(record.name, "Laptop");
        assert_eq!(record.url, "https://shop.example.com/p/1");
        assert!(record.price.is_none());
    }

    #[test]
    fn test_record_serializes_expected_fields() {
        let record = ProductRecord::new("Laptop", &product_url())
            .unwrap()
            .with_price(Some(999.0))
            .with_reviews(Some(12));
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["name"], "Laptop");
        assert_eq!(json["price"], 999.0);
        assert!(json["rating"].is_null());
        assert_eq!(json["reviews"], 12);
        assert!(json["scraped_timestamp"].is_string());
    }

    #[test]
    fn test_terminal_reason_names() {
        assert_eq!(TerminalReason::NoNextLink.to_string(), "no_next_link");
        assert_eq!(
            serde_json::to_value(TerminalReason::BudgetExhausted).unwrap(),
            "budget_exhausted"
        );
    }

    #[test]
    fn test_crawl_state_budget() {
        let mut state = CrawlState::new(product_url(), 1);
        assert!(state.has_next());
        state.page_index += 1;
        assert!(!state.has_next());
        assert!(state.budget_exhausted());
    }
}
