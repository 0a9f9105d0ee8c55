//! Daemon configuration loaded from a YAML file.
//!
//! ```yaml
//! server:
//!   address: 127.0.0.1
//!   port: 8080
//! prometheus:
//!   address: 127.0.0.1
//!   port: 9090
//!   timeout: 10
//! interval: 10
//! proc_path: /proc
//! debug: false
//! ```
//!
//! Every key is optional. Command line flags are applied on top by the binary.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Location read when no `--config` is given.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/hostmetrics/config.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Upstream Prometheus used by the query proxy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PrometheusConfig {
    pub address: String,
    pub port: u16,
    /// Request timeout in seconds.
    pub timeout: u64,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 9090,
            timeout: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub prometheus: PrometheusConfig,
    /// Seconds between collector ticks.
    pub interval: u64,
    pub proc_path: PathBuf,
    /// Forces debug-level logging.
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            prometheus: PrometheusConfig::default(),
            interval: 10,
            proc_path: PathBuf::from("/proc"),
            debug: false,
        }
    }
}

/// Formats `host:port`, bracketing IPv6 literals.
fn join_host_port(address: &str, port: u16) -> String {
    if address.contains(':') && !address.starts_with('[') {
        format!("[{address}]:{port}")
    } else {
        format!("{address}:{port}")
    }
}

impl Config {
    /// Loads the configuration.
    ///
    /// An explicitly given file must exist. Without one, the default
    /// location is tried and built-in defaults are used if it is absent.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        };

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if !explicit && e.kind() == io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(source) => return Err(ConfigError::Read { path, source }),
        };

        let config: Self = if content.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?
        };
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the daemon cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval == 0 {
            return Err(ConfigError::Invalid(
                "interval must be at least 1 second".to_string(),
            ));
        }
        if self.prometheus.timeout == 0 {
            return Err(ConfigError::Invalid(
                "prometheus.timeout must be at least 1 second".to_string(),
            ));
        }
        Ok(())
    }

    /// Overrides the listener from a `host:port` string.
    pub fn set_listen(&mut self, listen: &str) -> Result<(), ConfigError> {
        let invalid = || ConfigError::Invalid(format!("invalid listen address '{listen}'"));
        let (host, port) = listen.rsplit_once(':').ok_or_else(invalid)?;
        let port: u16 = port.parse().map_err(|_| invalid())?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(invalid());
        }
        self.server.address = host.to_string();
        self.server.port = port;
        Ok(())
    }

    pub fn collection_interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    /// Address the HTTP server binds to, as `host:port`.
    pub fn listen_addr(&self) -> String {
        join_host_port(&self.server.address, self.server.port)
    }

    /// Base URL of the upstream Prometheus, without trailing slash.
    pub fn prometheus_base_url(&self) -> String {
        format!(
            "http://{}",
            join_host_port(&self.prometheus.address, self.prometheus.port)
        )
    }

    pub fn prometheus_timeout(&self) -> Duration {
        Duration::from_secs(self.prometheus.timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.listen_addr(), "127.0.0.1:8080");
        assert_eq!(config.prometheus_base_url(), "http://127.0.0.1:9090");
        assert_eq!(config.collection_interval(), Duration::from_secs(10));
        assert_eq!(config.prometheus_timeout(), Duration::from_secs(10));
        assert_eq!(config.proc_path, PathBuf::from("/proc"));
        assert!(!config.debug);
    }

    #[test]
    fn test_load_full_file() {
        let file = write_config(
            "\
server:
  address: 0.0.0.0
  port: 9100
prometheus:
  address: prom.internal
  port: 9091
  timeout: 3
interval: 15
proc_path: /host/proc
debug: true
",
        );
        let config = Config::load(Some(file.path())).unwrap();

        assert_eq!(config.listen_addr(), "0.0.0.0:9100");
        assert_eq!(config.prometheus_base_url(), "http://prom.internal:9091");
        assert_eq!(config.prometheus_timeout(), Duration::from_secs(3));
        assert_eq!(config.interval, 15);
        assert_eq!(config.proc_path, PathBuf::from("/host/proc"));
        assert!(config.debug);
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let file = write_config("prometheus:\n  port: 9999\n");
        let config = Config::load(Some(file.path())).unwrap();

        assert_eq!(config.prometheus.port, 9999);
        assert_eq!(config.prometheus.address, "127.0.0.1");
        assert_eq!(config.prometheus.timeout, 10);
        assert_eq!(config.server, ServerConfig::default());
        assert_eq!(config.interval, 10);
    }

    #[test]
    fn test_load_empty_file() {
        let file = write_config("");
        assert_eq!(Config::load(Some(file.path())).unwrap(), Config::default());
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let err = Config::load(Some(Path::new("/nonexistent/hostmetrics.yaml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_load_invalid_yaml() {
        let file = write_config("server: [unclosed\n");
        let err = Config::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let file = write_config("interval: 0\n");
        let err = Config::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_set_listen() {
        let mut config = Config::default();
        config.set_listen("0.0.0.0:9100").unwrap();
        assert_eq!(config.listen_addr(), "0.0.0.0:9100");

        config.set_listen("[::1]:9200").unwrap();
        assert_eq!(config.server.address, "::1");
        assert_eq!(config.listen_addr(), "[::1]:9200");

        assert!(config.set_listen("no-port").is_err());
        assert!(config.set_listen("host:http").is_err());
        assert!(config.set_listen(":80").is_err());
    }
}
