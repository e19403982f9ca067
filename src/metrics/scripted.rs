use super::source::{
    clamp_priority, MetricSource, MetricsReading, Platform, ProcessRead, Series, SystemInfo,
    SystemMetrics,
};
use crate::error::SourceError;
use crate::process::ProcessRecord;
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use sysinfo::Pid;

/// A process action recorded by [`ScriptedSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Terminate(Pid),
    SetPriority(Pid, i32),
}

#[derive(Default)]
struct Script {
    metrics: VecDeque<MetricsReading>,
    last_metrics: SystemMetrics,
    processes: Vec<ProcessRead>,
    protected: HashSet<Pid>,
    actions: Vec<Action>,
    metric_reads: usize,
    process_reads: usize,
    delay: Option<Duration>,
}

/// In-memory [`MetricSource`] that replays scripted readings.
///
/// Clones share the same script, so a test can keep a handle after moving the
/// source into a sampler. Once the metric queue is drained the last complete
/// reading repeats.
#[derive(Clone, Default)]
pub struct ScriptedSource {
    script: Arc<Mutex<Script>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn push_metrics(&self, metrics: SystemMetrics) -> &Self {
        self.push_reading(MetricsReading::complete(metrics))
    }

    /// Queues a raw reading, possibly with some counters missing.
    pub fn push_reading(&self, reading: MetricsReading) -> &Self {
        self.lock().metrics.push_back(reading);
        self
    }

    /// Queues a reading with only CPU and memory set.
    pub fn push_usage(&self, cpu_percent: f64, mem_percent: f64) -> &Self {
        self.push_metrics(SystemMetrics {
            cpu_percent,
            mem_percent,
            ..Default::default()
        })
    }

    /// Queues a reading in which every counter failed with `error`.
    pub fn push_failure(&self, error: SourceError) -> &Self {
        self.push_reading(MetricsReading::failed(error))
    }

    pub fn set_processes(&self, records: Vec<ProcessRecord>) {
        self.lock().processes = records.into_iter().map(Ok).collect();
    }

    /// Sets the raw listing, including per-process failures.
    pub fn set_listing(&self, listing: Vec<ProcessRead>) {
        self.lock().processes = listing;
    }

    /// Actions against `pid` fail with `PermissionDenied`.
    pub fn protect(&self, pid: Pid) {
        self.lock().protected.insert(pid);
    }

    /// Every read sleeps for `delay` first.
    pub fn set_delay(&self, delay: Duration) {
        self.lock().delay = Some(delay);
    }

    pub fn actions(&self) -> Vec<Action> {
        self.lock().actions.clone()
    }

    pub fn metric_reads(&self) -> usize {
        self.lock().metric_reads
    }

    pub fn process_reads(&self) -> usize {
        self.lock().process_reads
    }

    fn pause(&self) {
        let delay = self.lock().delay;
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
    }

    fn listed(script: &Script, pid: Pid) -> bool {
        script
            .processes
            .iter()
            .any(|read| matches!(read, Ok(record) if record.pid == pid))
    }
}

impl MetricSource for ScriptedSource {
    fn read_system_metrics(&mut self) -> MetricsReading {
        self.pause();
        let mut script = self.lock();
        script.metric_reads += 1;
        match script.metrics.pop_front() {
            Some(reading) => {
                if reading.is_complete() {
                    let mut last = SystemMetrics::default();
                    for series in Series::ALL {
                        last.set(series, reading.get(series).unwrap_or_default());
                    }
                    script.last_metrics = last;
                }
                reading
            }
            None => MetricsReading::complete(script.last_metrics),
        }
    }

    fn list_processes(&mut self) -> Vec<ProcessRead> {
        self.pause();
        let mut script = self.lock();
        script.process_reads += 1;
        script.processes.clone()
    }

    fn terminate(&mut self, pid: Pid) -> Result<(), SourceError> {
        let mut script = self.lock();
        if !Self::listed(&script, pid) {
            return Err(SourceError::NoSuchProcess(pid));
        }
        if script.protected.contains(&pid) {
            return Err(SourceError::PermissionDenied(pid));
        }
        script.actions.push(Action::Terminate(pid));
        script
            .processes
            .retain(|read| !matches!(read, Ok(record) if record.pid == pid));
        Ok(())
    }

    fn set_priority(&mut self, pid: Pid, nice: i32) -> Result<i32, SourceError> {
        let applied = clamp_priority(nice, Platform::current());
        let mut script = self.lock();
        if !Self::listed(&script, pid) {
            return Err(SourceError::NoSuchProcess(pid));
        }
        if script.protected.contains(&pid) {
            return Err(SourceError::PermissionDenied(pid));
        }
        script.actions.push(Action::SetPriority(pid, applied));
        for record in script.processes.iter_mut().flatten() {
            if record.pid == pid {
                record.priority = applied;
            }
        }
        Ok(applied)
    }

    fn system_info(&mut self) -> SystemInfo {
        SystemInfo {
            os_name: "Scripted".to_string(),
            host_name: "localhost".to_string(),
            arch: std::env::consts::ARCH.to_string(),
            logical_cpus: 1,
            ..Default::default()
        }
    }
}
