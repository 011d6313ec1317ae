//! hostpulse - request counter and host metrics exporter
//!
//! Serves two independent HTTP listeners: an application listener that
//! counts requests by path, and a metrics listener that samples host CPU,
//! memory, disk and uptime on every Prometheus scrape.

pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod sampler;
pub mod server;
pub mod telemetry;
