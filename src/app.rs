use crate::alerts::ThresholdSet;
use crate::error::{ControlError, SourceError};
use crate::event_log::EventLog;
use crate::export::export_to_path;
use crate::metrics::{clamp_priority, Platform, Sampler, SamplerState, Snapshot, SysinfoSource, SystemInfo};
use crate::process::{ProcessFilter, ProcessRecord};
use crate::settings::Settings;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use sysinfo::Pid;

const READY: &str = "Ready. Monitoring processes...";

/// Single entry point for commands from a display surface.
///
/// Every command returns the user-facing status message, or an error whose
/// `Display` is that message. The outcome is also kept as the current status
/// line and appended to the event log.
pub struct Controller {
    sampler: Sampler,
    filter: Mutex<ProcessFilter>,
    status: Arc<Mutex<String>>,
    log: Arc<EventLog>,
}

impl Controller {
    pub fn new(sampler: Sampler) -> Self {
        let status = Arc::new(Mutex::new(READY.to_string()));
        let alert_status = Arc::clone(&status);
        sampler.subscribe(move |snapshot: &Arc<Snapshot>| {
            if let Some(event) = snapshot.events.last() {
                *alert_status.lock().unwrap_or_else(PoisonError::into_inner) = event.to_string();
            }
        });
        let log = Arc::clone(sampler.event_log());
        Self {
            sampler,
            filter: Mutex::new(ProcessFilter::default()),
            status,
            log,
        }
    }

    /// Opens the event log and starts sampling the local host.
    pub fn start(settings: &Settings) -> std::io::Result<Self> {
        let log = Arc::new(EventLog::open(&settings.log_file)?);
        let source = SysinfoSource::new(settings.disk_mount.clone());
        let sampler = Sampler::spawn(Box::new(source), settings, log)?;
        Ok(Self::new(sampler))
    }

    /// Builds a controller without a background thread and takes one full
    /// refresh. Waits out sysinfo's minimum CPU interval first so the CPU
    /// figures cover a meaningful window.
    pub fn one_shot(settings: &Settings) -> std::io::Result<Self> {
        let log = Arc::new(EventLog::open(&settings.log_file)?);
        let source = SysinfoSource::new(settings.disk_mount.clone());
        let controller = Self::new(Sampler::manual(Box::new(source), settings, log));
        std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
        controller.sampler().refresh_now();
        Ok(controller)
    }

    pub fn sampler(&self) -> &Sampler {
        &self.sampler
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.sampler.snapshot()
    }

    pub fn state(&self) -> SamplerState {
        self.sampler.state()
    }

    /// Current status line.
    pub fn status(&self) -> String {
        lock(&self.status).clone()
    }

    fn set_status(&self, message: &str) {
        *lock(&self.status) = message.to_string();
    }

    /// Records a successful command.
    fn announce(&self, message: String) -> String {
        self.set_status(&message);
        self.log.record(&message);
        message
    }

    /// Records a failed command with `message` as its status.
    fn fail(&self, message: String, err: ControlError) -> ControlError {
        self.set_status(&message);
        self.log.record(&message);
        err
    }

    /// Clamps both values into `[1, 100]` and returns what was applied.
    pub fn update_thresholds(&self, cpu: f64, memory: f64) -> ThresholdSet {
        let applied = self.sampler.thresholds().with_adjustable(cpu, memory);
        self.sampler.set_thresholds(applied);
        self.announce(format!(
            "Alert thresholds updated (CPU {}%, Memory {}%)",
            applied.cpu, applied.memory
        ));
        applied
    }

    /// Returns whether alerts are now muted.
    pub fn toggle_mute(&self) -> bool {
        let muted = self.sampler.toggle_muted();
        self.announce(if muted { "Alerts muted" } else { "Alerts enabled" }.to_string());
        muted
    }

    /// Returns whether sampling is now paused.
    pub fn toggle_global_pause(&self) -> bool {
        let paused = self.sampler.toggle_paused();
        self.announce(if paused { "Updates paused" } else { "Resumed updates" }.to_string());
        paused
    }

    /// Looks `pid` up in the latest table.
    fn record(&self, pid: Pid) -> Option<ProcessRecord> {
        self.snapshot().processes.lookup(pid).cloned()
    }

    fn require_record(&self, pid: Pid, action: &str) -> Result<ProcessRecord, ControlError> {
        self.record(pid).ok_or_else(|| {
            let err = SourceError::NoSuchProcess(pid);
            self.fail(format!("Failed to {action} process {pid}: {err}"), err.into())
        })
    }

    /// Sends a termination request to a process from the latest table.
    pub fn kill_process(&self, pid: Pid) -> Result<String, ControlError> {
        let record = self.require_record(pid, "terminate")?;
        match self.sampler.with_source(|source| source.terminate(pid)) {
            Ok(()) => Ok(self.announce(format!("Process {pid} ({}) terminated", record.name))),
            Err(err) => Err(self.fail(
                format!("Failed to terminate process {pid}: {err}"),
                err.into(),
            )),
        }
    }

    /// Shifts a process's niceness by `delta` relative to the latest table.
    pub fn renice(&self, pid: Pid, delta: i32) -> Result<String, ControlError> {
        let record = self.require_record(pid, "change priority of")?;
        self.apply_priority(&record, record.priority.saturating_add(delta))
    }

    /// Sets an absolute niceness, clamped for the current platform.
    pub fn set_priority(&self, pid: Pid, value: i32) -> Result<String, ControlError> {
        let record = self.require_record(pid, "change priority of")?;
        self.apply_priority(&record, value)
    }

    fn apply_priority(&self, record: &ProcessRecord, value: i32) -> Result<String, ControlError> {
        let pid = record.pid;
        let value = clamp_priority(value, Platform::current());
        match self.sampler.with_source(|source| source.set_priority(pid, value)) {
            Ok(applied) => Ok(self.announce(format!(
                "Process {pid} ({}) priority changed to {applied}",
                record.name
            ))),
            Err(err) => Err(self.fail(
                format!("Failed to change priority for process {pid}: {err}"),
                err.into(),
            )),
        }
    }

    pub fn set_filter(&self, filter: ProcessFilter) {
        *lock(&self.filter) = filter;
    }

    pub fn filter(&self) -> ProcessFilter {
        lock(&self.filter).clone()
    }

    /// Rows of the latest table that pass the current filter.
    pub fn visible_processes(&self) -> Vec<ProcessRecord> {
        let filter = self.filter();
        self.snapshot().processes.filter(&filter)
    }

    pub fn process_details(&self, pid: Pid) -> Result<String, ControlError> {
        self.record(pid)
            .map(|record| record.details())
            .ok_or_else(|| {
                let err = SourceError::NoSuchProcess(pid);
                self.fail(format!("Error getting process details: {err}"), err.into())
            })
    }

    pub fn system_info(&self) -> SystemInfo {
        self.sampler.with_source(|source| source.system_info())
    }

    /// Writes the visible rows of the latest table to `path`.
    pub fn export_current_table(&self, path: &Path) -> Result<String, ControlError> {
        let rows = self.visible_processes();
        match export_to_path(path, &rows) {
            Ok(count) => Ok(self.announce(format!(
                "Process list exported to {} ({count} rows)",
                path.display()
            ))),
            Err(source) => {
                let err = ControlError::ExportFailure {
                    path: path.to_path_buf(),
                    source,
                };
                Err(self.fail(format!("Export failed: {err}"), err))
            }
        }
    }

    /// Stops the sampler; see [`Sampler::stop`].
    pub fn shutdown(&mut self) -> bool {
        self.sampler.stop()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::scripted::{Action, ScriptedSource};
    use crate::metrics::{Cadence, Series};

    fn controller(source: &ScriptedSource) -> Controller {
        let sampler = Sampler::manual(
            Box::new(source.clone()),
            &Settings::default(),
            Arc::new(EventLog::memory()),
        );
        Controller::new(sampler)
    }

    fn populated() -> (ScriptedSource, Controller) {
        let source = ScriptedSource::new();
        source.push_usage(20.0, 30.0);
        source.set_processes(vec![
            ProcessRecord::new(100, "init").with_user("root").with_cpu(0.5).with_memory_mb(10),
            ProcessRecord::new(200, "shell")
                .with_user("alice")
                .with_cpu(1.2)
                .with_memory_mb(5)
                .with_priority(5)
                .with_threads(2),
        ]);
        let controller = controller(&source);
        controller.sampler().refresh_now();
        (source, controller)
    }

    #[test]
    fn kill_unknown_pid_touches_nothing() {
        let (source, controller) = populated();
        let before = controller.snapshot();

        let err = controller.kill_process(Pid::from_u32(999)).unwrap_err();
        assert!(err.is_no_such_process());
        assert!(source.actions().is_empty());

        let after = controller.snapshot();
        assert_eq!(after.sequence, before.sequence);
        assert_eq!(
            after.history.get(Series::Cpu).values(),
            before.history.get(Series::Cpu).values()
        );
        assert!(controller.status().starts_with("Failed to terminate process 999"));
    }

    #[test]
    fn kill_known_pid_delegates_and_reports() {
        let (source, controller) = populated();
        let message = controller.kill_process(Pid::from_u32(200)).unwrap();
        assert_eq!(message, "Process 200 (shell) terminated");
        assert_eq!(source.actions(), vec![Action::Terminate(Pid::from_u32(200))]);
        assert_eq!(controller.status(), message);
        assert!(controller.sampler().event_log().recent().last().unwrap().ends_with(&message));
    }

    #[test]
    fn permission_denied_is_surfaced() {
        let (source, controller) = populated();
        source.protect(Pid::from_u32(100));
        let err = controller.kill_process(Pid::from_u32(100)).unwrap_err();
        assert!(matches!(err, ControlError::Process(SourceError::PermissionDenied(_))));
        assert!(controller.status().contains("permission denied"));
    }

    #[test]
    fn renice_is_relative_and_clamped() {
        let (source, controller) = populated();
        let pid = Pid::from_u32(200);
        controller.renice(pid, 10).unwrap();
        controller.renice(pid, -9999).unwrap();
        let max = Platform::current().priority_range().1;
        assert_eq!(
            source.actions(),
            vec![Action::SetPriority(pid, 15), Action::SetPriority(pid, -20)]
        );
        let message = controller.set_priority(pid, 9999).unwrap();
        assert!(message.ends_with(&format!("priority changed to {max}")));
    }

    #[test]
    fn thresholds_are_clamped_and_keep_disk() {
        let (_, controller) = populated();
        let applied = controller.update_thresholds(0.0, 250.0);
        assert_eq!(applied, ThresholdSet::new(1.0, 100.0, 90.0));
        assert_eq!(controller.sampler().thresholds(), applied);
        assert_eq!(controller.status(), "Alert thresholds updated (CPU 1%, Memory 100%)");
    }

    #[test]
    fn toggles_flip_sampler_flags() {
        let (_, controller) = populated();
        assert!(controller.toggle_global_pause());
        assert_eq!(controller.state(), SamplerState::Paused);
        assert_eq!(controller.status(), "Updates paused");
        assert!(!controller.toggle_global_pause());
        assert!(controller.toggle_mute());
        assert_eq!(controller.status(), "Alerts muted");
        assert!(controller.sampler().is_muted());
    }

    #[test]
    fn alert_events_update_status() {
        let (source, controller) = populated();
        assert_eq!(controller.status(), READY);
        source.push_usage(95.0, 30.0);
        controller.sampler().tick(Cadence::Series);
        assert_eq!(controller.status(), "High CPU Usage: 95.0% (Threshold: 80%)");
    }

    #[test]
    fn export_uses_filtered_rows() {
        let (_, controller) = populated();
        controller.set_filter(ProcessFilter::parse("user:ali"));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let message = controller.export_current_table(&path).unwrap();
        assert!(message.ends_with("(1 rows)"));
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().collect::<Vec<_>>()[1], "200,shell,alice,1.2,5,5,2");
    }

    #[test]
    fn export_failure_is_reported() {
        let (_, controller) = populated();
        let dir = tempfile::tempdir().unwrap();
        let err = controller
            .export_current_table(&dir.path().join("nope").join("out.csv"))
            .unwrap_err();
        assert!(matches!(err, ControlError::ExportFailure { .. }));
        assert!(controller.status().starts_with("Export failed"));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn one_shot_waits_for_a_cpu_window_before_sampling() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            log_file: dir.path().join("events.log"),
            ..Settings::default()
        };
        let started = std::time::Instant::now();
        let mut controller = Controller::one_shot(&settings).unwrap();
        assert!(started.elapsed() >= sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.sequence, 2);
        assert_eq!(snapshot.history.get(Series::Cpu).len(), 1);
        assert!(!snapshot.processes.is_empty());
        assert_eq!(controller.state(), SamplerState::Running);
        assert!(controller.shutdown());
    }

    #[test]
    fn details_and_system_info() {
        let (_, controller) = populated();
        let details = controller.process_details(Pid::from_u32(100)).unwrap();
        assert!(details.contains("Name: init"));
        assert!(controller.process_details(Pid::from_u32(5)).is_err());
        assert_eq!(controller.system_info().os_name, "Scripted");
    }
}
