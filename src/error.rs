use std::path::PathBuf;
use sysinfo::Pid;
use thiserror::Error;

/// Failures reported by a [`MetricSource`](crate::metrics::MetricSource).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// A system counter could not be read this cycle.
    #[error("metric unavailable: {0}")]
    MetricUnavailable(String),
    /// The process exited while it was being read.
    #[error("process {0} exited during scan")]
    ProcessGone(Pid),
    /// The process exists but its details are not readable.
    #[error("access denied reading process {0}")]
    AccessDenied(Pid),
    #[error("no such process: {0}")]
    NoSuchProcess(Pid),
    #[error("permission denied for process {0}")]
    PermissionDenied(Pid),
    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),
}

/// Errors returned by [`Controller`](crate::app::Controller) commands.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error(transparent)]
    Process(#[from] SourceError),
    #[error("export to {} failed: {source}", path.display())]
    ExportFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ControlError {
    /// True when the command targeted a process that no longer exists.
    pub fn is_no_such_process(&self) -> bool {
        matches!(self, ControlError::Process(SourceError::NoSuchProcess(_)))
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
