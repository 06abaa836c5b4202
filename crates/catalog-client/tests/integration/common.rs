use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use catalog_core::config::{FetcherConfig, ScrapeProfile};
use catalog_core::crawl::CrawlSettings;
use catalog_core::throttle::PolitenessConfig;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;

/// A canned response: status code and body.
pub type Route = (u16, String);

/// Serves `routes` (keyed by path and query, e.g. `/laptops?page=1`) on an
/// ephemeral local port until the test ends. Unknown targets get a 404.
///
/// Returns the site's base URL.
pub async fn serve_site(routes: Vec<(&str, Route)>) -> Url {
    let routes: Arc<HashMap<String, Route>> = Arc::new(
        routes
            .into_iter()
            .map(|(target, route)| (target.to_string(), route))
            .collect(),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let routes = Arc::clone(&routes);
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }

                let request = String::from_utf8_lossy(&request);
                let target = request.split_whitespace().nth(1).unwrap_or("/");
                let (status, body) = routes
                    .get(target)
                    .cloned()
                    .unwrap_or_else(|| (404, "<p>Not found</p>".to_string()));

                let response = format!(
                    "HTTP/1.1 {status} {}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    if status < 400 { "OK" } else { "Error" },
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    Url::parse(&format!("http://{addr}")).unwrap()
}

/// A product tile as the default scrape profile expects it.
pub fn product_tile(name: &str, href: &str, price: &str) -> String {
    format!(
        r#"<div class="product-item">
            <h2 class="product-title"><a href="{href}">{name}</a></h2>
            <span class="price">{price}</span>
            <div class="rating"><span class="star-rating">4.2 out of 5</span></div>
            <a class="reviews-link" href="{href}#reviews"><span>(87)</span></a>
        </div>"#
    )
}

/// A listing page with the given tiles and an optional "next" link.
pub fn listing_page(tiles: &[String], next: Option<&str>) -> String {
    let pagination = next
        .map(|href| format!(r#"<a class="pagination-next" href="{href}">Next</a>"#))
        .unwrap_or_default();
    format!(
        "<html><body><main>{}</main><nav>{pagination}</nav></body></html>",
        tiles.concat()
    )
}

pub fn ok(html: String) -> Route {
    (200, html)
}

pub fn fetcher_config() -> FetcherConfig {
    FetcherConfig {
        page_load_timeout: Duration::from_secs(5),
        ..FetcherConfig::default()
    }
}

pub fn settings() -> CrawlSettings {
    let profile = ScrapeProfile::default();
    CrawlSettings {
        ready_selector: profile.container,
        no_results_marker: profile.no_results_marker,
        element_wait: Duration::from_millis(50),
        politeness: PolitenessConfig::none(),
    }
}
