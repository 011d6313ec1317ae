//! Command-line interface for hostpulse
//!
//! Provides argument parsing and subcommand handling for the hostpulse binary.

use clap::{Parser, Subcommand};

/// Request counter and host metrics exporter
#[derive(Parser)]
#[command(name = "hostpulse")]
#[command(version)]
#[command(about = "Request counter and host metrics exporter")]
#[command(
    long_about = "hostpulse counts application requests by path on one port and serves \
    live host CPU, memory, disk and uptime gauges for Prometheus on another."
)]
pub struct Cli {
    /// Path to configuration file (built-in defaults are used when omitted)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },
}

/// Generate template configuration content
pub fn generate_config_template() -> &'static str {
    r#"# hostpulse Configuration
# ========================
#
# Every setting is optional. Running without a config file is equivalent to
# using the values below.

# ─────────────────────────────────────────────────────────────────────────────
# LISTENERS
# ─────────────────────────────────────────────────────────────────────────────

[server]
# IP address both listeners bind to (0.0.0.0 for all interfaces)
host = "0.0.0.0"

# Application listener: every path answers "OK" and is counted in
# app_requests_total{path="..."}
app_port = 8081

# Metrics listener: GET /metrics returns host gauges in Prometheus text format
metrics_port = 8082

# ─────────────────────────────────────────────────────────────────────────────
# HOST SAMPLING
# ─────────────────────────────────────────────────────────────────────────────

[host]
# Any path on the filesystem reported by host_disk_total_bytes and
# host_disk_used_bytes
disk_mount_point = "/"

# ─────────────────────────────────────────────────────────────────────────────
# OBSERVABILITY
# ─────────────────────────────────────────────────────────────────────────────

[observability]
# Log level: "trace", "debug", "info", "warn", "error"
# RUST_LOG overrides this when set
log_level = "info"
"#
}
