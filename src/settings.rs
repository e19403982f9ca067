use crate::error::ConfigError;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Lower bound for both sampling cadences.
pub const MIN_INTERVAL_MS: u64 = 100;

/// Runtime configuration. Missing fields fall back to [`Settings::default`].
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct Settings {
    /// Cadence of the system series (graph) sampling.
    pub series_interval_ms: u64,
    /// Cadence of the process table refresh.
    pub process_interval_ms: u64,
    /// Samples retained per series.
    pub history_length: usize,
    pub cpu_threshold: f64,
    pub memory_threshold: f64,
    pub disk_threshold: f64,
    /// Increase over the last fired value that re-raises an active alert.
    pub escalation_step: f64,
    /// Filesystem whose usage feeds the disk series.
    pub disk_mount: PathBuf,
    pub log_file: PathBuf,
    pub shutdown_timeout_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            series_interval_ms: 2000,
            process_interval_ms: 5000,
            history_length: 50,
            cpu_threshold: 80.0,
            memory_threshold: 80.0,
            disk_threshold: 90.0,
            escalation_step: 10.0,
            disk_mount: PathBuf::from("/"),
            log_file: PathBuf::from("process_monitor.log"),
            shutdown_timeout_ms: 1000,
        }
    }
}

impl Settings {
    /// Reads a TOML file. The result is already normalized.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        let settings: Settings = toml::from_str(raw)?;
        Ok(settings.normalized())
    }

    /// Clamps every field into its valid range.
    pub fn normalized(mut self) -> Self {
        self.series_interval_ms = self.series_interval_ms.max(MIN_INTERVAL_MS);
        self.process_interval_ms = self.process_interval_ms.max(MIN_INTERVAL_MS);
        self.history_length = self.history_length.max(1);
        self.cpu_threshold = clamp_threshold(self.cpu_threshold);
        self.memory_threshold = clamp_threshold(self.memory_threshold);
        self.disk_threshold = clamp_threshold(self.disk_threshold);
        if !self.escalation_step.is_finite() || self.escalation_step <= 0.0 {
            self.escalation_step = Settings::default().escalation_step;
        }
        self
    }

    pub fn series_interval(&self) -> Duration {
        Duration::from_millis(self.series_interval_ms)
    }

    pub fn process_interval(&self) -> Duration {
        Duration::from_millis(self.process_interval_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

/// Thresholds are percentages in `[1, 100]`. Out-of-range input is clamped
/// rather than rejected; NaN falls back to the upper bound.
pub fn clamp_threshold(value: f64) -> f64 {
    if value.is_nan() {
        return 100.0;
    }
    value.clamp(1.0, 100.0)
}
