use catalog_core::config::ScrapeProfile;
use catalog_core::error::CrawlError;
use catalog_core::models::ProductRecord;
use catalog_core::traits::RecordExtractor;
use catalog_core::util::{clean_price, collapse_whitespace, extract_rating, extract_reviews, resolve_href};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Compile a CSS selector, mapping failures to [`CrawlError::Selector`].
pub(crate) fn parse_selector(css: &str) -> Result<Selector, CrawlError> {
    Selector::parse(css).map_err(|e| CrawlError::Selector {
        selector: css.to_string(),
        message: e.to_string(),
    })
}

/// Record extractor driven by the CSS selectors of a [`ScrapeProfile`].
///
/// Every field is read independently from its container; a missing or
/// unreadable field only blanks that field. Containers without both a name
/// and a navigable product link are skipped.
pub struct SelectorExtractor {
    container_css: String,
    container: Selector,
    name: Selector,
    price: Selector,
    rating: Selector,
    reviews: Selector,
    url: Selector,
    base_url: Url,
}

impl SelectorExtractor {
    /// Compiles all selectors up front; an invalid one is a setup error.
    pub fn new(profile: &ScrapeProfile, base_url: Url) -> Result<Self, CrawlError> {
        Ok(Self {
            container_css: profile.container.clone(),
            container: parse_selector(&profile.container)?,
            name: parse_selector(&profile.name)?,
            price: parse_selector(&profile.price)?,
            rating: parse_selector(&profile.rating)?,
            reviews: parse_selector(&profile.reviews)?,
            url: parse_selector(&profile.url)?,
            base_url,
        })
    }

    fn extract_container(&self, container: ElementRef<'_>) -> Option<ProductRecord> {
        let name = first_text(container, &self.name);
        let url = container
            .select(&self.url)
            .next()
            .and_then(|link| link.value().attr("href"))
            .and_then(|href| resolve_href(&self.base_url, href));

        let (Some(name), Some(url)) = (name, url) else {
            tracing::debug!(
                selector = %self.container_css,
                "Skipping container due to missing name or URL"
            );
            return None;
        };

        let price = first_text(container, &self.price).and_then(|text| clean_price(&text));
        let rating = first_text(container, &self.rating).and_then(|text| extract_rating(&text));
        if let Some(rating) = rating.filter(|r| *r > 5.0) {
            tracing::debug!(rating, name = %name, "Rating outside the usual 0-5 scale");
        }
        let reviews = first_text(container, &self.reviews).and_then(|text| extract_reviews(&text));

        ProductRecord::new(&name, &url).map(|record| {
            record
                .with_price(price)
                .with_rating(rating)
                .with_reviews(reviews)
        })
    }
}

impl RecordExtractor for SelectorExtractor {
    fn extract(&self, html: &str) -> Result<Vec<ProductRecord>, CrawlError> {
        let document = Html::parse_document(html);
        let containers: Vec<_> = document.select(&self.container).collect();

        if containers.is_empty() {
            tracing::warn!(
                selector = %self.container_css,
                "Could not find product containers"
            );
            return Ok(Vec::new());
        }
        tracing::info!(count = containers.len(), "Found potential product containers");

        let records: Vec<_> = containers
            .into_iter()
            .filter_map(|container| self.extract_container(container))
            .collect();

        tracing::info!(count = records.len(), "Parsed products from page");
        Ok(records)
    }
}

/// Whitespace-collapsed text of the first match, if non-empty.
fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope
        .select(selector)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|text| !text.is_empty())
}
