/// Smoke-test for `BrowserFetcher`.
///
/// Launches a headless Chromium, loads <https://example.com>, waits for its
/// `<h1>` and verifies the rendered HTML before closing the session.
///
/// Run with:
///   cargo run --example browser_smoke --features browser
use std::time::Duration;

use catalog_client::BrowserFetcher;
use catalog_core::config::FetcherConfig;
use catalog_core::traits::PageFetcher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    println!("Launching headless browser…");
    let fetcher = BrowserFetcher::launch(&FetcherConfig::default()).await?;

    let url = "https://example.com";
    println!("Fetching {url} …");
    let html = fetcher.fetch(url).await?;

    let ready = fetcher.wait_for_selector("h1", Duration::from_secs(10)).await?;
    assert!(ready, "Expected <h1> to appear");
    assert!(
        html.contains("Example Domain"),
        "Expected heading text not found in rendered HTML"
    );

    let current = fetcher.current_html().await?;
    println!("OK: got {} bytes of rendered HTML", current.len());
    println!("First 300 chars:\n{}", &current[..current.len().min(300)]);

    fetcher.close().await?;
    fetcher.close().await?;
    Ok(())
}
