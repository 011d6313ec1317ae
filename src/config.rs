//! Configuration management for hostpulse
//!
//! Parses TOML configuration files and provides typed access to settings.
//! Every key is optional: with no file at all the exporter listens on the
//! compile-time default ports.

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::str::FromStr;

/// Port of the application listener when none is configured
pub const DEFAULT_APP_PORT: u16 = 8081;

/// Port of the metrics listener when none is configured
pub const DEFAULT_METRICS_PORT: u16 = 8082;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub host: HostConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Listener configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_host")]
    pub host: String,
    /// Port serving the catch-all application handler
    #[serde(default = "default_app_port")]
    pub app_port: u16,
    /// Port serving `/metrics`
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_bind_host(),
            app_port: DEFAULT_APP_PORT,
            metrics_port: DEFAULT_METRICS_PORT,
        }
    }
}

fn default_bind_host() -> String {
    "0.0.0.0".to_string()
}

fn default_app_port() -> u16 {
    DEFAULT_APP_PORT
}

fn default_metrics_port() -> u16 {
    DEFAULT_METRICS_PORT
}

/// Host sampling configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HostConfig {
    /// Path on the filesystem that backs the disk gauges (usually a mount point)
    #[serde(default = "default_disk_mount_point")]
    pub disk_mount_point: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            disk_mount_point: default_disk_mount_point(),
        }
    }
}

fn default_disk_mount_point() -> String {
    "/".to_string()
}

/// Observability configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path_display = path.as_ref().display().to_string();

        // Phase 1: Read file (preserves io::Error context)
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|source| AppError::ConfigFileRead {
                path: path_display.clone(),
                source,
            })?;

        // Phase 2: Parse TOML (preserves toml::de::Error context)
        let config: Self =
            toml::from_str(&content).map_err(|source| AppError::ConfigParseFailed {
                path: path_display.clone(),
                source,
            })?;

        // Phase 3: Validate parsed config
        config
            .validate()
            .map_err(|e| AppError::ConfigValidationFailed {
                path: path_display,
                reason: e.to_string(),
            })?;

        Ok(config)
    }

    /// Validate configuration after parsing
    ///
    /// Called by `from_file()` and `from_str()`. Tests constructing a
    /// `Config` by hand can call it directly.
    pub fn validate(&self) -> AppResult<()> {
        self.bind_ip()?;

        let ports = (self.server.app_port, self.server.metrics_port);
        if ports.0 == ports.1 && ports.0 != 0 {
            return Err(AppError::Config(format!(
                "server.app_port and server.metrics_port must differ, both are {}",
                ports.0
            )));
        }

        if self.host.disk_mount_point.trim().is_empty() {
            return Err(AppError::Config(
                "host.disk_mount_point must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Address of the application listener
    pub fn app_addr(&self) -> AppResult<SocketAddr> {
        Ok(SocketAddr::new(self.bind_ip()?, self.server.app_port))
    }

    /// Address of the metrics listener
    pub fn metrics_addr(&self) -> AppResult<SocketAddr> {
        Ok(SocketAddr::new(self.bind_ip()?, self.server.metrics_port))
    }

    fn bind_ip(&self) -> AppResult<IpAddr> {
        self.server.host.parse::<IpAddr>().map_err(|e| {
            AppError::Config(format!(
                "server.host '{}' is not an IP address: {}",
                self.server.host, e
            ))
        })
    }
}

impl FromStr for Config {
    type Err = AppError;

    fn from_str(toml_str: &str) -> Result<Self, Self::Err> {
        let config: Config =
            toml::from_str(toml_str).map_err(|source| AppError::ConfigParseFailed {
                path: "<string>".to_string(),
                source,
            })?;

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_CONFIG: &str = r#"
[server]
host = "127.0.0.1"
app_port = 9081
metrics_port = 9082

[host]
disk_mount_point = "/var"

[observability]
log_level = "debug"
"#;

    #[test]
    fn test_config_from_str_parses_successfully() {
        let config = Config::from_str(TEST_CONFIG).expect("should parse config");
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.app_port, 9081);
        assert_eq!(config.server.metrics_port, 9082);
        assert_eq!(config.host.disk_mount_point, "/var");
        assert_eq!(config.observability.log_level, "debug");
    }

    #[test]
    fn test_empty_config_uses_default_ports() {
        let config = Config::from_str("").expect("empty config is valid");
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.app_port, DEFAULT_APP_PORT);
        assert_eq!(config.server.metrics_port, DEFAULT_METRICS_PORT);
        assert_eq!(config.host.disk_mount_point, "/");
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn test_default_matches_empty_file() {
        let parsed = Config::from_str("").unwrap();
        let default = Config::default();
        assert_eq!(parsed.server.app_port, default.server.app_port);
        assert_eq!(parsed.server.metrics_port, default.server.metrics_port);
        assert_eq!(parsed.server.host, default.server.host);
    }

    #[test]
    fn test_partial_server_section_keeps_other_defaults() {
        let config = Config::from_str("[server]\napp_port = 7000\n").unwrap();
        assert_eq!(config.server.app_port, 7000);
        assert_eq!(config.server.metrics_port, DEFAULT_METRICS_PORT);
    }

    #[test]
    fn test_same_ports_rejected() {
        let result = Config::from_str("[server]\napp_port = 9000\nmetrics_port = 9000\n");
        let err = result.expect_err("identical ports must be rejected");
        assert!(err.to_string().contains("must differ"));
    }

    #[test]
    fn test_both_ephemeral_ports_allowed() {
        let config = Config::from_str("[server]\napp_port = 0\nmetrics_port = 0\n").unwrap();
        assert_eq!(config.server.app_port, 0);
    }

    #[test]
    fn test_invalid_host_rejected() {
        let err = Config::from_str("[server]\nhost = \"localhost:80\"\n").unwrap_err();
        assert!(err.to_string().contains("not an IP address"));
    }

    #[test]
    fn test_empty_mount_point_rejected() {
        let err = Config::from_str("[host]\ndisk_mount_point = \"  \"\n").unwrap_err();
        assert!(err.to_string().contains("disk_mount_point"));
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let err = Config::from_str("[server\napp_port = 1").unwrap_err();
        assert!(matches!(err, AppError::ConfigParseFailed { .. }));
    }

    #[test]
    fn test_addresses_combine_host_and_ports() {
        let config = Config::from_str(TEST_CONFIG).unwrap();
        assert_eq!(
            config.app_addr().unwrap(),
            SocketAddr::from(([127, 0, 0, 1], 9081))
        );
        assert_eq!(
            config.metrics_addr().unwrap(),
            SocketAddr::from(([127, 0, 0, 1], 9082))
        );
    }

    #[test]
    fn test_from_file_missing_file_is_read_error() {
        let err = Config::from_file("/nonexistent/hostpulse.toml").unwrap_err();
        assert!(matches!(err, AppError::ConfigFileRead { .. }));
    }
}
