//! Collector configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::CollectorError;

/// Conventional memcached port, used when the port argument is empty.
pub const DEFAULT_PORT: u16 = 11211;

/// Default bound on connect, write and the whole response read.
pub const DEFAULT_TIMEOUT_SECS: f64 = 10.0;

/// Directory name under the system temp dir holding snapshot files.
pub const SNAPSHOT_DIR_NAME: &str = "memrate";

/// Settings for one collection run.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub snapshot_dir: PathBuf,
    pub timeout: Duration,
    pub default_port: u16,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            snapshot_dir: default_snapshot_dir(),
            timeout: Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS),
            default_port: DEFAULT_PORT,
        }
    }
}

/// `<system temp dir>/memrate`.
pub fn default_snapshot_dir() -> PathBuf {
    std::env::temp_dir().join(SNAPSHOT_DIR_NAME)
}

/// Host and port of the server to collect from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub port: u16,
}

impl Target {
    /// Build a target from the raw positional arguments.
    ///
    /// An empty (or blank) port falls back to `default_port`.
    pub fn parse(host: &str, port: &str, default_port: u16) -> Result<Self, CollectorError> {
        let port = port.trim();
        let port = if port.is_empty() {
            default_port
        } else {
            port.parse::<u16>()
                .map_err(|e| CollectorError::Other(format!("Invalid port '{port}': {e}")))?
        };
        Ok(Self {
            host: host.trim().to_string(),
            port,
        })
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Validate a timeout given in seconds.
pub fn timeout_from_secs(secs: f64) -> Result<Duration, CollectorError> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(CollectorError::Other(format!(
            "Invalid timeout {secs}: expected a finite value > 0"
        )));
    }
    Ok(Duration::from_secs_f64(secs.min(86_400.0)))
}
