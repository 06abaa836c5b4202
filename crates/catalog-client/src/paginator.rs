use catalog_core::config::ScrapeProfile;
use catalog_core::error::CrawlError;
use catalog_core::traits::Paginator;
use catalog_core::util::resolve_href;
use scraper::{Html, Selector};
use url::Url;

use crate::extractor::parse_selector;

/// Finds the "next page" link with the profile's `next_page` selector.
pub struct SelectorPaginator {
    next_css: String,
    next: Selector,
    base_url: Url,
}

impl SelectorPaginator {
    pub fn new(profile: &ScrapeProfile, base_url: Url) -> Result<Self, CrawlError> {
        Ok(Self {
            next_css: profile.next_page.clone(),
            next: parse_selector(&profile.next_page)?,
            base_url,
        })
    }
}

impl Paginator for SelectorPaginator {
    fn find_next(&self, html: &str) -> Option<Url> {
        let document = Html::parse_document(html);
        let next = document
            .select(&self.next)
            .next()
            .and_then(|link| link.value().attr("href"))
            .and_then(|href| resolve_href(&self.base_url, href));

        match &next {
            Some(url) => tracing::info!(next = %url, "Found next page URL"),
            None => tracing::info!(selector = %self.next_css, "No next page link found"),
        }
        next
    }
}
