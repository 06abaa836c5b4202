use catalog_client::{HttpFetcher, SelectorExtractor, SelectorPaginator};
use catalog_core::config::{OutputConfig, ScrapeProfile};
use catalog_core::crawl::{CrawlController, run_session, save_records};
use catalog_core::error::CrawlError;
use catalog_core::models::TerminalReason;
use catalog_core::testutil::{MockPageFetcher, MockSink};
use catalog_core::traits::RecordExtractor;
use url::Url;

use crate::integration::common::{fetcher_config, listing_page, product_tile, settings};

const START: &str = "https://shop.test/laptops?page=1";

fn site() -> Url {
    Url::parse("https://shop.test").unwrap()
}

#[tokio::test]
async fn fatal_error_on_first_page_closes_session_and_skips_sink() {
    let profile = ScrapeProfile::default();
    let fetcher = MockPageFetcher::new().with_failing_page(
        START,
        CrawlError::Transport("browser connection lost".into()),
        "",
    );
    let extractor = SelectorExtractor::new(&profile, site()).unwrap();
    let paginator = SelectorPaginator::new(&profile, site()).unwrap();

    let report = run_session(&fetcher, |f| async move {
        CrawlController::new(f, extractor, paginator, settings())
            .run(START, 5)
            .await
    })
    .await;

    assert!(report.is_empty());
    assert_eq!(report.reason, TerminalReason::Fatal);
    assert_eq!(fetcher.close_calls(), 1);

    let sink = MockSink::new();
    assert!(!save_records(&sink, &report.records, &OutputConfig::default()).unwrap());
    assert_eq!(sink.write_count(), 0);
}

#[tokio::test]
async fn refused_connection_aborts_http_crawl() {
    let port = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };
    let base = Url::parse(&format!("http://127.0.0.1:{port}")).unwrap();
    let profile = ScrapeProfile::default();
    let fetcher = HttpFetcher::new(&fetcher_config()).unwrap();
    let extractor = SelectorExtractor::new(&profile, base.clone()).unwrap();
    let paginator = SelectorPaginator::new(&profile, base.clone()).unwrap();

    let report = CrawlController::new(&fetcher, extractor, paginator, settings())
        .run(base.join("/laptops").unwrap().as_str(), 3)
        .await;

    assert_eq!(report.reason, TerminalReason::Fatal);
    assert_eq!(report.pages_visited, 1);
    assert!(report.records.is_empty());
}

#[tokio::test]
async fn selector_pipeline_over_mock_pages() {
    let profile = ScrapeProfile::default();
    let page_1 = listing_page(
        &[
            product_tile("Alpha", "/p/alpha", "$10.00"),
            product_tile("Beta", "/p/beta", "Free"),
        ],
        Some("/laptops?page=2"),
    );
    let page_2 = listing_page(&[product_tile("Gamma", "/p/gamma", "$5 - $7")], None);
    let fetcher = MockPageFetcher::new()
        .with_page(START, &page_1)
        .with_page("https://shop.test/laptops?page=2", &page_2);
    let extractor = SelectorExtractor::new(&profile, site()).unwrap();
    let paginator = SelectorPaginator::new(&profile, site()).unwrap();

    let report = CrawlController::new(&fetcher, extractor, paginator, settings())
        .run(START, 5)
        .await;

    let prices: Vec<_> = report.records.iter().map(|r| r.price).collect();
    assert_eq!(prices, [Some(10.0), Some(0.0), Some(5.0)]);
    assert_eq!(report.reason, TerminalReason::NoNextLink);
    assert_eq!(
        fetcher.visited(),
        [START, "https://shop.test/laptops?page=2"]
    );
}

#[test]
fn extractor_count_matches_well_formed_tiles() {
    let profile = ScrapeProfile::default();
    let extractor = SelectorExtractor::new(&profile, site()).unwrap();
    let tiles: Vec<_> = (0..12)
        .map(|i| product_tile(&format!("Item {i}"), &format!("/p/{i}"), "$1"))
        .collect();
    let broken = r#"<div class="product-item"><span class="price">$3</span></div>"#.to_string();

    let mut all = tiles.clone();
    all.push(broken);
    let records = extractor.extract(&listing_page(&all, None)).unwrap();

    assert_eq!(records.len(), tiles.len());
}
