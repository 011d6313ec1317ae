//! Prometheus metrics endpoint
//!
//! Exposes host statistics in Prometheus text format for scraping.

use axum::{
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};

use crate::error::AppError;
use crate::metrics::HostMetrics;

/// Metrics handler for Prometheus scraping
///
/// Samples every host statistic and returns them in Prometheus text format.
/// Sampling does blocking OS reads, so it runs on the blocking thread pool
/// and never stalls the runtime serving the application listener.
///
/// # Response
///
/// - `200 OK` with metrics in Prometheus text format
/// - `500 Internal Server Error` if metrics encoding fails
///
/// # Example
///
/// ```bash
/// curl http://localhost:8082/metrics
/// # HELP host_cpu_percent Total CPU usage percent
/// # TYPE host_cpu_percent gauge
/// host_cpu_percent 3.25
/// ```
pub async fn handler(State(host): State<HostMetrics>) -> Result<impl IntoResponse, AppError> {
    let rendered = tokio::task::spawn_blocking(move || host.render())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Host metrics sampling task failed");
            AppError::Internal(format!("metrics sampling task failed: {}", e))
        })?;

    let body = rendered.map_err(|e| {
        tracing::error!(
            error = %e,
            "Failed to gather host metrics for Prometheus scraping"
        );
        AppError::MetricsEncoding(e.to_string())
    })?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
        body,
    ))
}
