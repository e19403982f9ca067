use crate::error::SourceError;
use crate::process::ProcessRecord;
use std::fmt;
use sysinfo::Pid;

/// Named system-wide metric streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Series {
    Cpu,
    Memory,
    Disk,
    Network,
}

impl Series {
    pub const ALL: [Series; 4] = [Series::Cpu, Series::Memory, Series::Disk, Series::Network];

    pub fn as_str(&self) -> &'static str {
        match self {
            Series::Cpu => "cpu",
            Series::Memory => "memory",
            Series::Disk => "disk",
            Series::Network => "network",
        }
    }
}

impl fmt::Display for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reading of the system-wide counters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SystemMetrics {
    pub cpu_percent: f64,
    pub mem_percent: f64,
    pub disk_percent: f64,
    /// Bytes received plus transmitted since boot, all interfaces.
    pub net_bytes_cumulative: f64,
}

impl SystemMetrics {
    pub fn value(&self, series: Series) -> f64 {
        match series {
            Series::Cpu => self.cpu_percent,
            Series::Memory => self.mem_percent,
            Series::Disk => self.disk_percent,
            Series::Network => self.net_bytes_cumulative,
        }
    }

    pub fn set(&mut self, series: Series, value: f64) {
        match series {
            Series::Cpu => self.cpu_percent = value,
            Series::Memory => self.mem_percent = value,
            Series::Disk => self.disk_percent = value,
            Series::Network => self.net_bytes_cumulative = value,
        }
    }
}

/// One pass over the system counters.
///
/// Counters are read independently: a counter that could not be read is
/// `None` and the cause is listed in `errors`, while the others still carry
/// fresh values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsReading {
    pub cpu_percent: Option<f64>,
    pub mem_percent: Option<f64>,
    pub disk_percent: Option<f64>,
    pub net_bytes_cumulative: Option<f64>,
    pub errors: Vec<SourceError>,
}

impl MetricsReading {
    pub fn complete(metrics: SystemMetrics) -> Self {
        Self {
            cpu_percent: Some(metrics.cpu_percent),
            mem_percent: Some(metrics.mem_percent),
            disk_percent: Some(metrics.disk_percent),
            net_bytes_cumulative: Some(metrics.net_bytes_cumulative),
            errors: Vec::new(),
        }
    }

    /// A reading in which no counter was available.
    pub fn failed(error: SourceError) -> Self {
        Self {
            errors: vec![error],
            ..Default::default()
        }
    }

    pub fn get(&self, series: Series) -> Option<f64> {
        match series {
            Series::Cpu => self.cpu_percent,
            Series::Memory => self.mem_percent,
            Series::Disk => self.disk_percent,
            Series::Network => self.net_bytes_cumulative,
        }
    }

    /// Stores `value`, or records `error` and leaves the counter empty.
    pub fn put(&mut self, series: Series, value: Result<f64, SourceError>) {
        let slot = match series {
            Series::Cpu => &mut self.cpu_percent,
            Series::Memory => &mut self.mem_percent,
            Series::Disk => &mut self.disk_percent,
            Series::Network => &mut self.net_bytes_cumulative,
        };
        match value {
            Ok(value) => *slot = Some(value),
            Err(err) => {
                *slot = None;
                self.errors.push(err);
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        Series::ALL.iter().all(|series| self.get(*series).is_some())
    }
}

/// Static description of the host.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemInfo {
    pub os_name: String,
    pub host_name: String,
    pub kernel_version: String,
    pub os_version: String,
    pub arch: String,
    /// `None` when the platform does not report it.
    pub physical_cores: Option<usize>,
    pub logical_cpus: usize,
    pub total_memory_bytes: u64,
    pub disk_usage_percent: Option<f64>,
}

impl SystemInfo {
    /// Label/value pairs in display order.
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("System", self.os_name.clone()),
            ("Node Name", self.host_name.clone()),
            ("Release", self.kernel_version.clone()),
            ("Version", self.os_version.clone()),
            ("Machine", self.arch.clone()),
            (
                "CPU Cores",
                self.physical_cores
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "unknown".to_string()),
            ),
            ("Logical CPUs", self.logical_cpus.to_string()),
            (
                "Total Memory",
                format!("{} GB", self.total_memory_bytes / (1024 * 1024 * 1024)),
            ),
            (
                "Disk Usage",
                self.disk_usage_percent
                    .map(|p| format!("{p:.1}%"))
                    .unwrap_or_else(|| "unknown".to_string()),
            ),
        ]
    }
}

/// Result of reading a single process during enumeration.
pub type ProcessRead = Result<ProcessRecord, SourceError>;

/// Access to the operating system's metrics and process controls.
///
/// Reads take `&mut self` because most backends keep the previous counters to
/// compute deltas.
pub trait MetricSource: Send {
    /// Reads every system counter. Failures are reported per counter so one
    /// unreadable counter does not discard the others.
    fn read_system_metrics(&mut self) -> MetricsReading;

    /// Enumerates processes. Per-process failures are returned inline so the
    /// caller can skip them without losing the rest of the listing.
    fn list_processes(&mut self) -> Vec<ProcessRead>;

    fn terminate(&mut self, pid: Pid) -> Result<(), SourceError>;

    /// Implementations clamp `nice` with [`clamp_priority`] before the OS call
    /// and return the value actually applied.
    fn set_priority(&mut self, pid: Pid, nice: i32) -> Result<i32, SourceError>;

    fn system_info(&mut self) -> SystemInfo {
        SystemInfo::default()
    }
}

/// Priority conventions that need different clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Posix,
    Windows,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Posix
        }
    }

    /// Inclusive niceness bounds.
    pub fn priority_range(&self) -> (i32, i32) {
        match self {
            Platform::Posix => (-20, 19),
            Platform::Windows => (-20, 20),
        }
    }
}

pub fn clamp_priority(value: i32, platform: Platform) -> i32 {
    let (min, max) = platform.priority_range();
    value.clamp(min, max)
}
