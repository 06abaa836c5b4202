use catalog_client::{FileSink, HttpFetcher, SelectorExtractor, SelectorPaginator};
use catalog_core::config::{OutputConfig, ScrapeProfile};
use catalog_core::crawl::{CrawlController, run_session, save_records};
use catalog_core::models::{CrawlReport, TerminalReason};
use url::Url;

use crate::integration::common::{
    fetcher_config, listing_page, ok, product_tile, serve_site, settings,
};

async fn crawl(base: &Url, start: &str, budget: u32) -> CrawlReport {
    let profile = ScrapeProfile::default();
    let fetcher = HttpFetcher::new(&fetcher_config()).unwrap();
    let extractor = SelectorExtractor::new(&profile, base.clone()).unwrap();
    let paginator = SelectorPaginator::new(&profile, base.clone()).unwrap();
    let start = base.join(start).unwrap();

    run_session(&fetcher, |f| async move {
        CrawlController::new(f, extractor, paginator, settings())
            .run(start.as_str(), budget)
            .await
    })
    .await
}

#[tokio::test]
async fn two_page_listing_is_crawled_and_saved() {
    let base = serve_site(vec![
        (
            "/laptops?page=1",
            ok(listing_page(
                &[product_tile("Ultrabook 13", "/p/ultrabook-13", "$999.00")],
                Some("/laptops?page=2"),
            )),
        ),
        (
            "/laptops?page=2",
            ok(listing_page(
                &[product_tile("Workstation 17", "/p/workstation-17", "$2,499.99")],
                None,
            )),
        ),
    ])
    .await;

    let report = crawl(&base, "/laptops?page=1", 5).await;

    assert_eq!(report.reason, TerminalReason::NoNextLink);
    assert_eq!(report.pages_visited, 2);
    let names: Vec<_> = report.records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["Ultrabook 13", "Workstation 17"]);
    assert_eq!(report.records[1].price, Some(2499.99));
    assert_eq!(report.records[0].rating, Some(4.2));
    assert_eq!(report.records[0].reviews, Some(87));
    assert_eq!(
        report.records[0].url,
        base.join("/p/ultrabook-13").unwrap().as_str()
    );

    let dir = tempfile::tempdir().unwrap();
    let output = OutputConfig {
        dir: dir.path().join("data"),
        ..OutputConfig::default()
    };
    assert!(save_records(&FileSink::new(), &report.records, &output).unwrap());

    let mut reader = csv::Reader::from_path(output.csv_path()).unwrap();
    assert_eq!(reader.records().count(), 2);
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(output.json_path()).unwrap()).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn empty_trailing_page_ends_with_no_next_link() {
    let base = serve_site(vec![
        (
            "/laptops",
            ok(listing_page(
                &[
                    product_tile("Ultrabook 13", "/p/ultrabook-13", "$999.00"),
                    product_tile("Ultrabook 15", "/p/ultrabook-15", "$1,199.00"),
                ],
                Some("/laptops?page=2"),
            )),
        ),
        ("/laptops?page=2", ok(listing_page(&[], None))),
    ])
    .await;

    let report = crawl(&base, "/laptops", 5).await;

    assert_eq!(report.records.len(), 2);
    assert_eq!(report.pages_visited, 2);
    assert_eq!(report.reason, TerminalReason::NoNextLink);
    assert!(report.error.is_none());
}

#[tokio::test]
async fn page_budget_of_one_stops_after_first_page() {
    let base = serve_site(vec![
        (
            "/laptops?page=1",
            ok(listing_page(
                &[product_tile("Ultrabook 13", "/p/ultrabook-13", "$999.00")],
                Some("/laptops?page=2"),
            )),
        ),
        (
            "/laptops?page=2",
            ok(listing_page(
                &[product_tile("Never Seen", "/p/never", "$1")],
                None,
            )),
        ),
    ])
    .await;

    let report = crawl(&base, "/laptops?page=1", 1).await;

    assert_eq!(report.reason, TerminalReason::BudgetExhausted);
    assert_eq!(report.pages_visited, 1);
    assert_eq!(report.records.len(), 1);
}

#[tokio::test]
async fn error_page_with_next_link_is_skipped() {
    let base = serve_site(vec![
        (
            "/laptops?page=1",
            ok(listing_page(
                &[product_tile("First", "/p/first", "$10")],
                Some("/laptops?page=2"),
            )),
        ),
        (
            "/laptops?page=2",
            (
                503,
                listing_page(&[], Some("/laptops?page=3")),
            ),
        ),
        (
            "/laptops?page=3",
            ok(listing_page(&[product_tile("Third", "/p/third", "$30")], None)),
        ),
    ])
    .await;

    let report = crawl(&base, "/laptops?page=1", 5).await;

    let names: Vec<_> = report.records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["First", "Third"]);
    assert_eq!(report.pages_visited, 3);
    assert_eq!(report.reason, TerminalReason::NoNextLink);
}

#[tokio::test]
async fn missing_page_without_next_link_ends_gracefully() {
    let base = serve_site(vec![(
        "/laptops?page=1",
        ok(listing_page(
            &[product_tile("Only", "/p/only", "$5")],
            Some("/laptops?page=2"),
        )),
    )])
    .await;

    let report = crawl(&base, "/laptops?page=1", 5).await;

    assert_eq!(report.records.len(), 1);
    assert_eq!(report.pages_visited, 2);
    assert_eq!(report.reason, TerminalReason::FetchFailed);
    assert!(report.error.unwrap().contains("404"));
}

#[tokio::test]
async fn no_results_page_stops_pagination() {
    let base = serve_site(vec![
        (
            "/search?q=laptop",
            ok(listing_page(
                &[product_tile("Match", "/p/match", "$100")],
                Some("/search?q=laptop&page=2"),
            )),
        ),
        (
            "/search?q=laptop&page=2",
            ok(r#"<html><body><p class="no-results-message">No results for "laptop"</p>
                <a class="pagination-next" href="/search?q=laptop&page=3">Next</a></body></html>"#
                .to_string()),
        ),
    ])
    .await;

    let report = crawl(&base, "/search?q=laptop", 5).await;

    assert_eq!(report.reason, TerminalReason::NoResults);
    assert_eq!(report.pages_visited, 2);
    assert_eq!(report.records.len(), 1);
}
