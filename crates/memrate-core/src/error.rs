//! Error taxonomy for a collection run.
//!
//! Every failure is terminal. Each variant maps to exactly one process exit
//! code so the monitoring agent that launched us can tell the cases apart
//! without parsing messages.

use std::fmt;
use std::path::PathBuf;

/// Exit code for a successful run.
pub const EXIT_OK: i32 = 0;
/// Exit code for uncategorized failures.
pub const EXIT_OTHER: i32 = 1;
/// Exit code for a wrong parameter count or malformed metric mask.
pub const EXIT_USAGE: i32 = 3;
/// Exit code when an enabled metric is missing from the stats response.
pub const EXIT_METRIC_NOT_FOUND: i32 = 8;
/// Exit code when the snapshot directory cannot be created.
pub const EXIT_CREATE_SNAPSHOT_DIR: i32 = 21;
/// Exit code when the snapshot file cannot be written.
pub const EXIT_WRITE_SNAPSHOT_FILE: i32 = 22;
/// Exit code for unresolvable, unreachable or unresponsive targets.
pub const EXIT_UNKNOWN_HOST: i32 = 28;

/// Everything that can end a collection run early.
#[derive(Debug)]
pub enum CollectorError {
    /// Positional parameter count differs from the invocation contract.
    WrongParameterCount { expected: usize, found: usize },

    /// The metric-state mask could not be turned into a selection.
    InvalidMetricState { reason: String },

    /// Name resolution, connect, write or read against the target failed.
    UnknownHost {
        host: String,
        port: u16,
        source: std::io::Error,
    },

    /// Enabled metrics absent from (or non-numeric in) the stats response.
    MetricNotFound { metrics: Vec<String> },

    /// The directory holding snapshot files could not be created.
    CreateSnapshotDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The snapshot file could not be written or moved into place.
    WriteSnapshotFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Anything else.
    Other(String),
}

impl CollectorError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::WrongParameterCount { .. } | Self::InvalidMetricState { .. } => EXIT_USAGE,
            Self::UnknownHost { .. } => EXIT_UNKNOWN_HOST,
            Self::MetricNotFound { .. } => EXIT_METRIC_NOT_FOUND,
            Self::CreateSnapshotDir { .. } => EXIT_CREATE_SNAPSHOT_DIR,
            Self::WriteSnapshotFile { .. } => EXIT_WRITE_SNAPSHOT_FILE,
            Self::Other(_) => EXIT_OTHER,
        }
    }
}

impl fmt::Display for CollectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongParameterCount { expected, found } => write!(
                f,
                "Wrong number of parameters: expected {expected}, got {found}."
            ),
            Self::InvalidMetricState { reason } => {
                write!(f, "Invalid metric state: {reason}")
            }
            Self::UnknownHost { host, port, source } => {
                write!(f, "Unknown host {host}:{port}: {source}")
            }
            Self::MetricNotFound { metrics } => {
                write!(f, "Metric(s) not found: {}", metrics.join(", "))
            }
            Self::CreateSnapshotDir { path, source } => write!(
                f,
                "Failed to create snapshot directory {}: {source}",
                path.display()
            ),
            Self::WriteSnapshotFile { path, source } => write!(
                f,
                "Failed to write snapshot file {}: {source}",
                path.display()
            ),
            Self::Other(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for CollectorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::UnknownHost { source, .. }
            | Self::CreateSnapshotDir { source, .. }
            | Self::WriteSnapshotFile { source, .. } => Some(source),
            Self::WrongParameterCount { .. }
            | Self::InvalidMetricState { .. }
            | Self::MetricNotFound { .. }
            | Self::Other(_) => None,
        }
    }
}
