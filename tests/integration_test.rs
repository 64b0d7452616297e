//! Integration tests for meta-scraper
//!
//! These tests serve the real router on an ephemeral port and talk to it over
//! HTTP. Loopback targets are refused by the default validator, so most cases
//! plug in a stub fetcher; one case relaxes the blocklist to run the real
//! fetch engine against a wiremock upstream.

use async_trait::async_trait;
use meta_scraper::{
    config::{Config, Environment, ValidationConfig},
    http::HttpServer,
    scraping::{FetchError, FetchedPage, MetaScraper, PageFetcher, UrlValidator},
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Fetcher that answers every URL from a closure
struct StubFetcher<F>(F);

#[async_trait]
impl<F> PageFetcher for StubFetcher<F>
where
    F: Fn(&Url) -> Result<FetchedPage, FetchError> + Send + Sync,
{
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        (self.0)(url)
    }
}

fn html_page(url: &Url, body: &str) -> FetchedPage {
    FetchedPage {
        final_url: url.clone(),
        status_code: 200,
        content_type: Some("text/html; charset=utf-8".to_string()),
        body: body.to_string(),
        fetch_duration: Duration::from_millis(5),
        attempts: 1,
    }
}

fn stub_scraper<F>(respond: F) -> MetaScraper
where
    F: Fn(&Url) -> Result<FetchedPage, FetchError> + Send + Sync + 'static,
{
    MetaScraper::new(UrlValidator::default(), Arc::new(StubFetcher(respond)))
}

/// Start a server and return its base URL
async fn spawn_server(config: Config, scraper: MetaScraper) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    let server = HttpServer::new(Arc::new(config), Arc::new(scraper));

    tokio::spawn(async move {
        server
            .serve(listener, std::future::pending())
            .await
            .unwrap();
    });

    format!("http://{}", addr)
}

async fn get(url: &str) -> (u16, reqwest::header::HeaderMap, Value) {
    let response = reqwest::get(url).await.unwrap();
    let status = response.status().as_u16();
    let headers = response.headers().clone();
    let body = serde_json::from_str(&response.text().await.unwrap()).unwrap();
    (status, headers, body)
}

fn github_scraper() -> MetaScraper {
    stub_scraper(|url| Ok(html_page(url, "<html><head><title>GitHub</title></head><body></body></html>")))
}

#[tokio::test]
async fn test_scrape_success() {
    let base = spawn_server(Config::default(), github_scraper()).await;

    let (status, _, body) = get(&format!("{}/meta-scraper?url=github.com", base)).await;
    assert_eq!(status, 200);
    assert_eq!(
        body,
        json!({
            "success": true,
            "data": {
                "title": "GitHub",
                "description": null,
                "url": "https://github.com",
                "image": null
            }
        })
    );
}

#[tokio::test]
async fn test_missing_and_blocked_urls_are_rejected() {
    let base = spawn_server(Config::default(), github_scraper()).await;

    let (status, _, body) = get(&format!("{}/meta-scraper", base)).await;
    assert_eq!(status, 400);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Invalid URL");
    assert_eq!(body["message"], "URL parameter is required and must be a string");
    assert_eq!(body["type"], "INVALID_URL");

    let (status, _, body) = get(&format!("{}/meta-scraper?url=http://192.168.1.1/admin", base)).await;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "Access to private/local networks is not allowed");

    let (status, _, body) = get(&format!("{}/meta-scraper?url=ftp://example.com", base)).await;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "Only HTTP and HTTPS protocols are supported");
}

#[tokio::test]
async fn test_dns_failure_is_connection_error() {
    let scraper = stub_scraper(|url| {
        Err(FetchError::HostNotFound {
            host: url.host_str().unwrap_or_default().to_string(),
            message: "dns error: failed to lookup address information".to_string(),
        })
    });
    let base = spawn_server(Config::default(), scraper).await;

    let (status, _, body) =
        get(&format!("{}/meta-scraper?url=https://does-not-exist.example", base)).await;
    assert_eq!(status, 404);
    assert_eq!(body["success"], false);
    assert_eq!(body["kind"], "CONNECTION_ERROR");
    assert_eq!(body["error"], "Unable to connect to the provided URL");
    // Development mode exposes the underlying error
    assert!(body["details"].as_str().unwrap().contains("does-not-exist.example"));
}

#[tokio::test]
async fn test_timeout_hides_details_in_production() {
    let scraper = stub_scraper(|_| Err(FetchError::Timeout(Duration::from_secs(10))));
    let mut config = Config::default();
    config.server.environment = Environment::Production;
    let base = spawn_server(config, scraper).await;

    let (status, _, body) = get(&format!("{}/meta-scraper?url=slow.example", base)).await;
    assert_eq!(status, 408);
    assert_eq!(body["kind"], "TIMEOUT_ERROR");
    assert_eq!(body["type"], "TIMEOUT_ERROR");
    assert!(body.get("details").is_none());
}

#[tokio::test]
async fn test_real_fetch_against_mock_upstream() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/article"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"<html><head>
                <meta property="og:title" content="Mock Article">
                <meta name="description" content="A page served by the mock">
                <meta property="og:image" content="/cover.png">
            </head><body></body></html>"#,
            "text/html",
        ))
        .mount(&upstream)
        .await;
    Mock::given(method("GET"))
        .and(path("/forbidden"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&upstream)
        .await;

    let mut config = Config::default();
    config.validation = ValidationConfig {
        blocked_hosts: vec![],
        blocked_prefixes: vec![],
    };
    config.scraping.retry_limit = 0;
    let scraper = MetaScraper::from_config(&config).unwrap();
    let base = spawn_server(config, scraper).await;

    let target = format!("{}/article", upstream.uri());
    let (status, _, body) = get(&format!("{}/meta-scraper?url={}", base, target)).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["title"], "Mock Article");
    assert_eq!(body["data"]["description"], "A page served by the mock");
    assert_eq!(body["data"]["url"], target.as_str());
    assert_eq!(body["data"]["image"], format!("{}/cover.png", upstream.uri()).as_str());

    let target = format!("{}/forbidden", upstream.uri());
    let (status, _, body) = get(&format!("{}/meta-scraper?url={}", base, target)).await;
    assert_eq!(status, 403);
    assert_eq!(body["kind"], "ACCESS_DENIED");
}

#[tokio::test]
async fn test_rate_limit() {
    let mut config = Config::default();
    config.rate_limit.max_requests = 2;
    let base = spawn_server(config, github_scraper()).await;
    let url = format!("{}/health", base);

    assert_eq!(get(&url).await.0, 200);
    assert_eq!(get(&url).await.0, 200);

    let (status, _, body) = get(&url).await;
    assert_eq!(status, 429);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Too many requests");
    assert_eq!(
        body["message"],
        "Rate limit exceeded. Maximum 2 requests per minute allowed."
    );
}

#[tokio::test]
async fn test_health_and_descriptor() {
    let base = spawn_server(Config::default(), github_scraper()).await;

    let (status, _, body) = get(&format!("{}/health", base)).await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Meta Scraper API is running");
    assert_eq!(body["environment"], "development");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(chrono::DateTime::parse_from_rfc3339(body["timestamp"].as_str().unwrap()).is_ok());

    let (status, _, body) = get(&base).await;
    assert_eq!(status, 200);
    assert_eq!(body["name"], "Meta Scraper API");
    assert!(body["endpoints"]["GET /meta-scraper"].is_object());
    assert_eq!(body["rateLimit"]["requests"], 100);
}

#[tokio::test]
async fn test_unknown_route_and_headers() {
    let base = spawn_server(Config::default(), github_scraper()).await;

    let (status, headers, body) = get(&format!("{}/nope", base)).await;
    assert_eq!(status, 404);
    assert_eq!(
        body,
        json!({
            "success": false,
            "error": "Endpoint not found",
            "message": "Available endpoints: GET /, GET /meta-scraper, GET /health"
        })
    );

    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "SAMEORIGIN");
    assert!(headers["content-security-policy"]
        .to_str()
        .unwrap()
        .contains("default-src 'self'"));
    assert!(headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn test_wrong_method_gets_json_not_found() {
    let base = spawn_server(Config::default(), github_scraper()).await;
    let client = reqwest::Client::new();

    for path in ["/meta-scraper?url=github.com", "/health", "/"] {
        let response = client
            .post(format!("{}{}", base, path))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 404, "POST {}", path);
        let body: Value = serde_json::from_str(&response.text().await.unwrap()).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Endpoint not found");
    }
}

#[tokio::test]
async fn test_cors_preflight() {
    let base = spawn_server(Config::default(), github_scraper()).await;

    let response = reqwest::Client::new()
        .request(reqwest::Method::OPTIONS, format!("{}/meta-scraper", base))
        .header("Origin", "https://app.example")
        .header("Access-Control-Request-Method", "GET")
        .send()
        .await
        .unwrap();

    assert!(response.status().is_success());
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
}
