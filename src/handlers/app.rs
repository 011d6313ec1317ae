//! Application endpoint
//!
//! Catch-all handler that counts each request by path and acknowledges it.

use axum::{extract::State, http::StatusCode, http::Uri};

use crate::metrics::AppMetrics;

/// Body returned for every application request
pub const ACK_BODY: &str = "OK";

/// Count the request under its path and reply `200 OK`
///
/// The path is taken without the query string. A failure to record the
/// metric is logged and never fails the request.
pub async fn handler(State(metrics): State<AppMetrics>, uri: Uri) -> (StatusCode, &'static str) {
    let path = uri.path();

    if let Err(e) = metrics.record_request(path) {
        tracing::warn!(
            error = %e,
            path = %path,
            "Failed to record application request metric"
        );
    }

    (StatusCode::OK, ACK_BODY)
}
