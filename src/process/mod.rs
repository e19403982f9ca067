mod table;

pub use table::*;

use sysinfo::Pid;

/// Placeholder for an owner that could not be resolved.
pub const UNKNOWN_USER: &str = "N/A";

/// A single process as seen during one sampling cycle.
///
/// PIDs are only unique within one cycle; compare `start_time` as well before
/// treating two records from different snapshots as the same process.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessRecord {
    pub pid: Pid,
    pub name: String,
    pub user: String,
    /// CPU used since the previous process refresh, summed over cores.
    pub cpu_percent: f32,
    /// Resident set size in whole megabytes.
    pub memory_mb: u64,
    /// Scheduling niceness.
    pub priority: i32,
    pub threads: usize,
    /// Seconds since the Unix epoch.
    pub start_time: u64,
    pub status: String,
}

impl ProcessRecord {
    pub fn new(pid: u32, name: impl Into<String>) -> Self {
        Self {
            pid: Pid::from_u32(pid),
            name: name.into(),
            user: UNKNOWN_USER.to_string(),
            cpu_percent: 0.0,
            memory_mb: 0,
            priority: 0,
            threads: 1,
            start_time: 0,
            status: String::new(),
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn with_cpu(mut self, cpu_percent: f32) -> Self {
        self.cpu_percent = cpu_percent;
        self
    }

    pub fn with_memory_mb(mut self, memory_mb: u64) -> Self {
        self.memory_mb = memory_mb;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Multi-line description used by the details view.
    pub fn details(&self) -> String {
        let started = chrono::DateTime::from_timestamp(self.start_time as i64, 0)
            .map(|t| {
                t.with_timezone(&chrono::Local)
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string()
            })
            .unwrap_or_else(|| "unknown".to_string());
        format!(
            "PID: {}\nName: {}\nStatus: {}\nCPU %: {:.1}\nMemory: {} MB\nPriority: {}\nThreads: {}\nCreated: {}\nUser: {}",
            self.pid,
            self.name,
            self.status,
            self.cpu_percent,
            self.memory_mb,
            self.priority,
            self.threads,
            started,
            self.user,
        )
    }
}

/// Converts a byte count into whole megabytes, rounding down.
pub fn bytes_to_mb(bytes: u64) -> u64 {
    bytes / (1024 * 1024)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_is_whole_megabytes() {
        assert_eq!(bytes_to_mb(0), 0);
        assert_eq!(bytes_to_mb(1024 * 1024 - 1), 0);
        assert_eq!(bytes_to_mb(10 * 1024 * 1024 + 5), 10);
    }

    #[test]
    fn details_lists_every_field() {
        let record = ProcessRecord::new(42, "sshd")
            .with_user("root")
            .with_cpu(1.26)
            .with_memory_mb(12)
            .with_threads(3);
        let details = record.details();
        assert!(details.starts_with("PID: 42\nName: sshd"));
        assert!(details.contains("CPU %: 1.3"));
        assert!(details.contains("Memory: 12 MB"));
        assert!(details.contains("Threads: 3"));
        assert!(details.ends_with("User: root"));
    }
}
