use super::source::{
    clamp_priority, MetricSource, MetricsReading, Platform, ProcessRead, Series, SystemInfo,
};
use crate::error::SourceError;
use crate::process::{bytes_to_mb, ProcessRecord, UNKNOWN_USER};
use log::debug;
use std::path::{Path, PathBuf};
use sysinfo::{
    Disks, Networks, Pid, Process, ProcessRefreshKind, ProcessesToUpdate, Signal, System,
    UpdateKind, Users,
};

/// [`MetricSource`] backed by `sysinfo`, with `libc` for niceness on Unix.
pub struct SysinfoSource {
    system: System,
    users: Users,
    disk_mount: PathBuf,
}

impl SysinfoSource {
    pub fn new(disk_mount: impl Into<PathBuf>) -> Self {
        let mut system = System::new();
        // Baseline so the first CPU readings are deltas rather than zero.
        system.refresh_cpu_usage();
        system.refresh_memory();
        system.refresh_processes_specifics(ProcessesToUpdate::All, true, Self::process_refresh_kind());
        Self {
            system,
            users: Users::new_with_refreshed_list(),
            disk_mount: disk_mount.into(),
        }
    }

    fn process_refresh_kind() -> ProcessRefreshKind {
        ProcessRefreshKind::nothing()
            .with_cpu()
            .with_memory()
            .with_user(UpdateKind::OnlyIfNotSet)
    }

    fn disk_usage(&self) -> Result<f64, SourceError> {
        let disks = Disks::new_with_refreshed_list();
        let disk = disks
            .list()
            .iter()
            .filter(|disk| self.disk_mount.starts_with(disk.mount_point()))
            .max_by_key(|disk| disk.mount_point().as_os_str().len())
            .ok_or_else(|| {
                SourceError::MetricUnavailable(format!("disk ({})", self.disk_mount.display()))
            })?;
        let total = disk.total_space();
        if total == 0 {
            return Err(SourceError::MetricUnavailable(format!(
                "disk ({})",
                self.disk_mount.display()
            )));
        }
        let used = total.saturating_sub(disk.available_space());
        Ok(used as f64 / total as f64 * 100.0)
    }

    fn collect_process_info(&self, process: &Process) -> ProcessRead {
        let pid = process.pid();
        let (priority, threads) = read_sched(pid)?;
        let user = process
            .user_id()
            .and_then(|uid| self.users.get_user_by_id(uid))
            .map(|user| user.name().to_string())
            .unwrap_or_else(|| UNKNOWN_USER.to_string());
        Ok(ProcessRecord {
            pid,
            name: process.name().to_string_lossy().into_owned(),
            user,
            cpu_percent: process.cpu_usage(),
            memory_mb: bytes_to_mb(process.memory()),
            priority,
            threads: threads.or_else(|| process.tasks().map(|t| t.len())).unwrap_or(1),
            start_time: process.start_time(),
            status: process.status().to_string(),
        })
    }
}

impl Default for SysinfoSource {
    fn default() -> Self {
        Self::new("/")
    }
}

impl MetricSource for SysinfoSource {
    fn read_system_metrics(&mut self) -> MetricsReading {
        self.system.refresh_cpu_usage();
        self.system.refresh_memory();
        let mut reading = MetricsReading::default();

        let cpu = if self.system.cpus().is_empty() {
            Err(SourceError::MetricUnavailable("cpu".to_string()))
        } else {
            Ok(self.system.global_cpu_usage() as f64)
        };
        reading.put(Series::Cpu, cpu);

        let total_memory = self.system.total_memory();
        let memory = if total_memory == 0 {
            Err(SourceError::MetricUnavailable("memory".to_string()))
        } else {
            Ok(self.system.used_memory() as f64 / total_memory as f64 * 100.0)
        };
        reading.put(Series::Memory, memory);

        reading.put(Series::Disk, self.disk_usage());

        let networks = Networks::new_with_refreshed_list();
        let net_bytes: u64 = networks
            .list()
            .values()
            .map(|data| data.total_received() + data.total_transmitted())
            .sum();
        reading.put(Series::Network, Ok(net_bytes as f64));

        reading
    }

    fn list_processes(&mut self) -> Vec<ProcessRead> {
        self.system
            .refresh_processes_specifics(ProcessesToUpdate::All, true, Self::process_refresh_kind());
        self.users = Users::new_with_refreshed_list();

        let mut processes: Vec<&Process> = self
            .system
            .processes()
            .values()
            .filter(|p| p.thread_kind().is_none())
            .collect();
        processes.sort_by_key(|p| p.pid());
        debug!("enumerated {} processes", processes.len());

        processes
            .into_iter()
            .map(|process| self.collect_process_info(process))
            .collect()
    }

    fn terminate(&mut self, pid: Pid) -> Result<(), SourceError> {
        self.system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        let process = self.system.process(pid).ok_or(SourceError::NoSuchProcess(pid))?;
        let sent = process.kill_with(Signal::Term).unwrap_or_else(|| process.kill());
        if sent {
            Ok(())
        } else {
            Err(os_error(pid, std::io::Error::last_os_error().raw_os_error()))
        }
    }

    fn set_priority(&mut self, pid: Pid, nice: i32) -> Result<i32, SourceError> {
        let applied = clamp_priority(nice, Platform::current());
        apply_priority(pid, applied)?;
        Ok(applied)
    }

    fn system_info(&mut self) -> SystemInfo {
        SystemInfo {
            os_name: System::name().unwrap_or_default(),
            host_name: System::host_name().unwrap_or_default(),
            kernel_version: System::kernel_version().unwrap_or_default(),
            os_version: System::os_version().unwrap_or_default(),
            arch: std::env::consts::ARCH.to_string(),
            physical_cores: self.system.physical_core_count(),
            logical_cpus: self.system.cpus().len(),
            total_memory_bytes: self.system.total_memory(),
            disk_usage_percent: self.disk_usage().ok(),
        }
    }
}

/// Niceness and thread count for a process.
#[cfg(target_os = "linux")]
fn read_sched(pid: Pid) -> Result<(i32, Option<usize>), SourceError> {
    let path = Path::new("/proc").join(pid.to_string()).join("stat");
    let stat = std::fs::read_to_string(&path).map_err(|err| match err.kind() {
        std::io::ErrorKind::NotFound => SourceError::ProcessGone(pid),
        _ => SourceError::AccessDenied(pid),
    })?;
    parse_stat(&stat).ok_or(SourceError::AccessDenied(pid))
}

#[cfg(all(unix, not(target_os = "linux")))]
fn read_sched(pid: Pid) -> Result<(i32, Option<usize>), SourceError> {
    // getpriority cannot tell -1 from failure without errno; a vanished
    // process is caught by the next enumeration.
    let nice = unsafe { libc::getpriority(libc::PRIO_PROCESS, pid.as_u32() as libc::id_t) };
    Ok((nice, None))
}

#[cfg(not(unix))]
fn read_sched(_pid: Pid) -> Result<(i32, Option<usize>), SourceError> {
    Ok((0, None))
}

/// Extracts `(nice, num_threads)` from the contents of `/proc/<pid>/stat`.
///
/// The command name sits in parentheses and may contain spaces, so fields are
/// counted from the last `)`.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_stat(stat: &str) -> Option<(i32, Option<usize>)> {
    let rest = &stat[stat.rfind(')')? + 1..];
    let fields: Vec<&str> = rest.split_whitespace().collect();
    // fields[0] is field 3 (state); nice is field 19, num_threads field 20.
    let nice = fields.get(16)?.parse().ok()?;
    let threads = fields.get(17).and_then(|t| t.parse().ok());
    Some((nice, threads))
}

#[cfg(unix)]
fn apply_priority(pid: Pid, nice: i32) -> Result<(), SourceError> {
    let rc = unsafe { libc::setpriority(libc::PRIO_PROCESS, pid.as_u32() as libc::id_t, nice) };
    if rc == 0 {
        return Ok(());
    }
    Err(os_error(pid, std::io::Error::last_os_error().raw_os_error()))
}

/// Maps the errno of a failed signal or priority call. A process that exited
/// in the meantime is reported as gone, anything else as refused.
#[cfg(unix)]
fn os_error(pid: Pid, errno: Option<i32>) -> SourceError {
    match errno {
        Some(libc::ESRCH) => SourceError::NoSuchProcess(pid),
        _ => SourceError::PermissionDenied(pid),
    }
}

#[cfg(not(unix))]
fn os_error(pid: Pid, _errno: Option<i32>) -> SourceError {
    SourceError::PermissionDenied(pid)
}

#[cfg(not(unix))]
fn apply_priority(_pid: Pid, _nice: i32) -> Result<(), SourceError> {
    Err(SourceError::Unsupported("set_priority"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_stat_handles_spaces_in_name() {
        let stat = "1234 (Web Content (x)) S 1 1234 1234 0 -1 4194560 100 0 0 0 5 3 0 0 20 -5 27 0 12345 1000 200";
        assert_eq!(parse_stat(stat), Some((-5, Some(27))));
    }

    #[test]
    fn parse_stat_rejects_truncated_input() {
        assert_eq!(parse_stat("1 (init) S 0 1"), None);
        assert_eq!(parse_stat("garbage"), None);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn reads_own_process() {
        let mut source = SysinfoSource::default();
        let own = Pid::from_u32(std::process::id());
        let records: Vec<_> = source.list_processes().into_iter().filter_map(Result::ok).collect();
        let me = records.iter().find(|r| r.pid == own).expect("own process listed");
        assert!(me.threads >= 1);
        let reading = source.read_system_metrics();
        assert!(reading.mem_percent.map_or(true, |m| m > 0.0));
    }

    #[cfg(unix)]
    #[test]
    fn exited_process_maps_to_no_such_process() {
        let pid = Pid::from_u32(4242);
        assert_eq!(os_error(pid, Some(libc::ESRCH)), SourceError::NoSuchProcess(pid));
        assert_eq!(os_error(pid, Some(libc::EPERM)), SourceError::PermissionDenied(pid));
        assert_eq!(os_error(pid, None), SourceError::PermissionDenied(pid));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn unresolvable_disk_mount_keeps_other_counters() {
        let mut source = SysinfoSource::new("not-a-mount");
        let reading = source.read_system_metrics();
        assert_eq!(reading.disk_percent, None);
        assert!(matches!(
            reading.errors.as_slice(),
            [SourceError::MetricUnavailable(counter)] if counter.starts_with("disk")
        ));
        assert!(reading.net_bytes_cumulative.is_some());
        assert!(reading.cpu_percent.is_some());
        assert!(reading.mem_percent.is_some());
    }

    #[test]
    fn system_info_reports_core_counts() {
        let mut source = SysinfoSource::default();
        let info = source.system_info();
        assert!(info.logical_cpus >= 1);
        if let Some(physical) = info.physical_cores {
            assert!(physical >= 1);
        }
    }
}
