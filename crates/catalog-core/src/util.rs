//! Tolerant parsers for the free-text fields of a product listing.
//!
//! None of these functions fail: text that cannot be read yields `None` and
//! the record is still produced without that field.

use lazy_regex::regex;
use url::Url;

/// Parse a displayed price into a number.
///
/// Strips currency symbols, `,` thousands separators and whitespace, keeps
/// the lower bound of a `low-high` range, and maps `free` to `0.0`.
/// `.` is always read as the decimal point.
pub fn clean_price(raw: &str) -> Option<f64> {
    let cleaned = regex!(r"[\p{Sc},\s]").replace_all(raw.trim(), "");
    let lower = cleaned.split('-').next().unwrap_or_default();

    if lower.eq_ignore_ascii_case("free") {
        return Some(0.0);
    }

    match lower.parse::<f64>() {
        Ok(price) if price.is_finite() && price >= 0.0 => Some(price),
        _ => {
            tracing::debug!(raw, "Could not clean price");
            None
        }
    }
}

/// First decimal or integer numeral in the text, e.g. `"4.5 out of 5 stars"` → `4.5`.
pub fn extract_rating(text: &str) -> Option<f64> {
    regex!(r"\d+(?:\.\d+)?")
        .find(text)
        .and_then(|m| m.as_str().parse().ok())
}

/// First integer numeral in the text, `,` separators allowed: `"1,234 reviews"` → `1234`.
pub fn extract_reviews(text: &str) -> Option<u64> {
    regex!(r"\d{1,3}(?:,\d{3})+|\d+")
        .find(text)
        .and_then(|m| m.as_str().replace(',', "").parse().ok())
}

/// Resolve an `href` against the site base URL.
///
/// Empty and fragment-only targets, and anything that does not end up as
/// an `http`/`https` URL (`javascript:`, `mailto:`), are not navigable.
pub fn resolve_href(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let url = base.join(href).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

/// Trim and collapse runs of whitespace into single spaces.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
