//! Error types for hostpulse
//!
//! All errors implement `IntoResponse` for Axum handlers.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read config file {path}: {source}")]
    ConfigFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration in {path}: {reason}")]
    ConfigValidationFailed { path: String, reason: String },

    #[error("Failed to register metric: {0}")]
    MetricsRegistration(#[from] prometheus::Error),

    #[error("Metric '{name}' is registered in both the application and host registries")]
    MetricNameClash { name: String },

    #[error("Failed to encode metrics: {0}")]
    MetricsEncoding(String),

    #[error("{listener} listener failed to bind {addr}: {source}")]
    Bind {
        listener: &'static str,
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("{listener} listener stopped serving: {source}")]
    Serve {
        listener: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Nothing a client sends can cause these; every variant is a server fault.
        let status = StatusCode::INTERNAL_SERVER_ERROR;

        let body = Json(serde_json::json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

/// Convenience type alias for Results
pub type AppResult<T> = Result<T, AppError>;
