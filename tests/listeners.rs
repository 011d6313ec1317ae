//! End-to-end tests against live listeners bound to ephemeral ports

use hostpulse::config::Config;
use hostpulse::metrics::{AppMetrics, HostMetrics};
use hostpulse::sampler::SystemSampler;
use hostpulse::server::Server;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

const EPHEMERAL: &str = r#"
[server]
host = "127.0.0.1"
app_port = 0
metrics_port = 0
"#;

/// Start both listeners and return their addresses with the app counter
async fn start() -> (SocketAddr, SocketAddr, AppMetrics) {
    let config = Config::from_str(EPHEMERAL).unwrap();
    let app_metrics = AppMetrics::new().unwrap();
    let host_metrics = HostMetrics::new(Arc::new(SystemSampler::default())).unwrap();

    let server = Server::bind(&config, app_metrics.clone(), host_metrics)
        .await
        .expect("ephemeral ports should bind");
    let addrs = (server.app_addr(), server.metrics_addr());

    tokio::spawn(server.serve());
    (addrs.0, addrs.1, app_metrics)
}

#[tokio::test]
async fn test_app_listener_counts_paths() {
    let (app_addr, _, app_metrics) = start().await;
    let client = reqwest::Client::new();

    for path in ["/foo", "/foo", "/foo", "/bar"] {
        let response = client
            .get(format!("http://{}{}", app_addr, path))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(response.text().await.unwrap(), "OK");
    }

    assert_eq!(app_metrics.request_count("/foo"), 3);
    assert_eq!(app_metrics.request_count("/bar"), 1);
}

#[tokio::test]
async fn test_metrics_listener_serves_host_gauges() {
    let (_, metrics_addr, _) = start().await;

    let response = reqwest::get(format!("http://{}/metrics", metrics_addr))
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let body = response.text().await.unwrap();
    for name in [
        "host_cpu_percent",
        "host_memory_total_bytes",
        "host_memory_used_bytes",
        "host_disk_total_bytes",
        "host_disk_used_bytes",
        "host_uptime_seconds",
    ] {
        let line = body
            .lines()
            .find(|line| line.starts_with(&format!("{} ", name)))
            .unwrap_or_else(|| panic!("missing {} in:\n{}", name, body));
        let value: f64 = line.split_whitespace().last().unwrap().parse().unwrap();
        assert!(value >= 0.0);
    }
}

#[tokio::test]
async fn test_listeners_are_independent() {
    let (app_addr, metrics_addr, app_metrics) = start().await;

    // /metrics on the application port is just another counted path
    let body = reqwest::get(format!("http://{}/metrics", app_addr))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "OK");
    assert_eq!(app_metrics.request_count("/metrics"), 1);

    // Scraping never touches the application counter
    let scrape = reqwest::get(format!("http://{}/metrics", metrics_addr))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(!scrape.contains("app_requests_total"));
    assert_eq!(app_metrics.total_requests(), 1);

    let missing = reqwest::get(format!("http://{}/foo", metrics_addr))
        .await
        .unwrap();
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
}
