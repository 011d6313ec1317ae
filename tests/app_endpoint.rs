//! Integration tests for the application listener router

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use hostpulse::metrics::AppMetrics;
use hostpulse::middleware::request_id::REQUEST_ID_HEADER;
use hostpulse::server::app_router;
use tower::ServiceExt; // for `oneshot`

async fn send(metrics: &AppMetrics, method: Method, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app_router(metrics.clone())
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

#[tokio::test]
async fn test_any_path_returns_ok() {
    let metrics = AppMetrics::new().unwrap();

    for uri in ["/", "/foo", "/deeply/nested/path", "/metrics"] {
        let (status, body) = send(&metrics, Method::GET, uri).await;
        assert_eq!(status, StatusCode::OK, "{}", uri);
        assert_eq!(&body[..], b"OK", "{}", uri);
    }
}

#[tokio::test]
async fn test_foo_three_times_bar_once() {
    let metrics = AppMetrics::new().unwrap();

    for _ in 0..3 {
        send(&metrics, Method::GET, "/foo").await;
    }
    send(&metrics, Method::GET, "/bar").await;

    assert_eq!(metrics.request_count("/foo"), 3);
    assert_eq!(metrics.request_count("/bar"), 1);

    let output = metrics.render().unwrap();
    assert!(output.contains("app_requests_total{path=\"/foo\"} 3"));
    assert!(output.contains("app_requests_total{path=\"/bar\"} 1"));
}

#[tokio::test]
async fn test_every_method_is_counted() {
    let metrics = AppMetrics::new().unwrap();

    for method in [Method::GET, Method::POST, Method::PUT, Method::DELETE] {
        let (status, _) = send(&metrics, method, "/any").await;
        assert_eq!(status, StatusCode::OK);
    }

    assert_eq!(metrics.request_count("/any"), 4);
}

#[tokio::test]
async fn test_response_carries_request_id() {
    let metrics = AppMetrics::new().unwrap();

    let response = app_router(metrics)
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let header = response
        .headers()
        .get(REQUEST_ID_HEADER)
        .expect("x-request-id header should be set");
    assert!(uuid::Uuid::parse_str(header.to_str().unwrap()).is_ok());
}

#[tokio::test]
async fn test_concurrent_requests_are_all_counted() {
    let metrics = AppMetrics::new().unwrap();

    let requests = (0..50).map(|i| {
        let metrics = metrics.clone();
        async move {
            let path = if i % 2 == 0 { "/even" } else { "/odd" };
            send(&metrics, Method::GET, path).await
        }
    });
    futures::future::join_all(requests).await;

    assert_eq!(metrics.request_count("/even"), 25);
    assert_eq!(metrics.request_count("/odd"), 25);
    assert_eq!(metrics.total_requests(), 50);
}
