//! Integration tests for the polling layer against mock HTTP servers.

use edgepulse::fetch::{
    FetchError, FetchOptions, FetchScheduler, HttpFetcher, RequestDeduplicator, ResourceFetcher,
    ResourceRequest,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn scheduler_for(server: &MockServer, ttl: Duration) -> FetchScheduler {
    let fetcher = Arc::new(HttpFetcher::new(server.uri(), 2).unwrap());
    FetchScheduler::new(Arc::new(RequestDeduplicator::new(ttl)), fetcher)
}

#[tokio::test]
async fn test_http_fetcher_success_with_query() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/metrics"))
        .and(query_param("range", "1h"))
        .and(query_param("pop", "lax1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rps": 1200,
            "p95_ms": 18
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = HttpFetcher::new(mock_server.uri(), 2).unwrap();
    let request = ResourceRequest::new("/api/metrics")
        .with_query("range", "1h")
        .with_query("pop", "lax1");

    let data = fetcher.fetch(&request).await.unwrap();
    assert_eq!(data["rps"], 1200);
}

#[tokio::test]
async fn test_http_fetcher_maps_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/broken"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let fetcher = HttpFetcher::new(mock_server.uri(), 2).unwrap();

    let missing = fetcher.fetch(&ResourceRequest::new("/api/missing")).await;
    assert_eq!(missing, Err(FetchError::Http(404)));

    let broken = fetcher.fetch(&ResourceRequest::new("/api/broken")).await;
    assert_eq!(broken, Err(FetchError::Http(503)));
}

#[tokio::test]
async fn test_http_fetcher_invalid_json() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/pops"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&mock_server)
        .await;

    let fetcher = HttpFetcher::new(mock_server.uri(), 2).unwrap();
    let result = fetcher.fetch(&ResourceRequest::new("/api/pops")).await;
    assert!(matches!(result, Err(FetchError::Decode(_))));
}

#[tokio::test]
async fn test_http_fetcher_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let fetcher = HttpFetcher::new(mock_server.uri(), 1).unwrap();
    let result = fetcher.fetch(&ResourceRequest::new("/api/slow")).await;
    assert_eq!(result, Err(FetchError::Timeout(1)));
}

#[tokio::test]
async fn test_http_fetcher_connection_refused() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let fetcher = HttpFetcher::new(format!("http://{}", addr), 2).unwrap();
    let result = fetcher.fetch(&ResourceRequest::new("/api/pops")).await;
    assert!(matches!(result, Err(FetchError::Connection(_))));
}

#[tokio::test]
async fn test_concurrent_fetches_hit_server_once() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/alerts"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"id": "a-1"}]))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let scheduler = scheduler_for(&mock_server, Duration::from_secs(5));
    let request = ResourceRequest::new("/api/alerts");

    let (a, b, c) = tokio::join!(
        scheduler.fetch(&request, false),
        scheduler.fetch(&request, false),
        scheduler.fetch(&request, true),
    );

    assert_eq!(a.unwrap(), json!([{"id": "a-1"}]));
    assert_eq!(b.unwrap(), json!([{"id": "a-1"}]));
    assert_eq!(c.unwrap(), json!([{"id": "a-1"}]));

    // Fresh cache answers without another request
    scheduler.fetch(&request, false).await.unwrap();
}

#[tokio::test]
async fn test_skip_cache_refetches() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/pops"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"count": 12})))
        .expect(2)
        .mount(&mock_server)
        .await;

    let scheduler = scheduler_for(&mock_server, Duration::from_secs(5));
    let request = ResourceRequest::new("/api/pops");

    scheduler.fetch(&request, false).await.unwrap();
    scheduler.fetch(&request, false).await.unwrap();
    scheduler.fetch(&request, true).await.unwrap();
}

#[tokio::test]
async fn test_failed_fetch_keeps_stale_cache() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/metrics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"rps": 1})))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/metrics"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let scheduler = scheduler_for(&mock_server, Duration::from_secs(5));
    let request = ResourceRequest::new("/api/metrics");

    scheduler.fetch(&request, false).await.unwrap();
    let failed = scheduler.fetch(&request, true).await;
    assert_eq!(failed, Err(FetchError::Http(500)));

    let stale = scheduler.deduplicator().cached("/api/metrics").unwrap();
    assert_eq!(stale.data, json!({"rps": 1}));
}

#[tokio::test]
async fn test_poll_subscription_refreshes_until_closed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/metrics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"rps": 7})))
        .mount(&mock_server)
        .await;

    let scheduler = scheduler_for(&mock_server, Duration::from_secs(5));
    let mut subscription = scheduler.subscribe(
        ResourceRequest::new("/api/metrics"),
        Some(Duration::from_millis(100)),
    );

    tokio::time::sleep(Duration::from_millis(350)).await;
    let state = subscription.state();
    assert_eq!(state.data, Some(json!({"rps": 7})));
    assert!(state.last_updated.is_some());

    subscription.close();
    let seen = mock_server.received_requests().await.unwrap().len();
    assert!(seen >= 3, "expected initial fetch plus refreshes, got {}", seen);

    tokio::time::sleep(Duration::from_millis(350)).await;
    let after = mock_server.received_requests().await.unwrap().len();
    assert!(after <= seen + 1, "polling continued after close");
}

#[tokio::test]
async fn test_options_skip_cache_constructor() {
    let dedup = RequestDeduplicator::new(Duration::from_secs(5));
    let value = dedup
        .get_or_fetch(
            "k",
            || async { Ok(json!(1)) },
            FetchOptions::skip_cache(),
        )
        .await
        .unwrap();
    assert_eq!(value, json!(1));
    assert_eq!(dedup.cached("k").unwrap().data, json!(1));
}
