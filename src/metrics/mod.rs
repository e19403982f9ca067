//! Background sampling engine.
//!
//! A [`Sampler`] owns one thread that runs two independent cadences: the
//! series cadence reads system-wide counters into the history buffers and
//! evaluates alerts, the process cadence rebuilds the process table. After
//! every tick a new immutable [`Snapshot`] is swapped in; readers clone the
//! `Arc` and never observe a half-built state.

mod history;
mod monitor;
pub mod scripted;
mod source;
mod ticker;

pub use history::*;
pub use monitor::*;
pub use source::*;
pub use ticker::*;

use crate::alerts::{AlertEvaluator, AlertEvent, AlertState, ThresholdSet};
use crate::error::SourceError;
use crate::event_log::EventLog;
use crate::process::ProcessTable;
use crate::settings::Settings;
use chrono::{DateTime, Local};
use log::{debug, error, info, warn};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, TryLockError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Everything a consumer may read, published atomically.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Increases by one with every publication.
    pub sequence: u64,
    pub taken_at: DateTime<Local>,
    pub history: SeriesHistory,
    /// Most recent reading used for the history, stale if the last read failed.
    pub latest: Option<SystemMetrics>,
    pub processes: Arc<ProcessTable>,
    pub alerts: AlertState,
    /// Alerts emitted by the tick that produced this snapshot.
    pub events: Vec<AlertEvent>,
}

impl Snapshot {
    fn empty(history_len: usize) -> Self {
        Self {
            sequence: 0,
            taken_at: Local::now(),
            history: SeriesHistory::new(history_len),
            latest: None,
            processes: Arc::new(ProcessTable::default()),
            alerts: AlertState::default(),
            events: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerState {
    Running,
    Paused,
    Stopped,
}

/// The two sampling schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// System-wide series and alerts.
    Series,
    /// Process table.
    Processes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A snapshot with this sequence number was published.
    Sampled(u64),
    Paused,
    /// Another tick or command held the engine; this one was dropped.
    Busy,
    Stopped,
}

type Subscriber = Box<dyn Fn(&Arc<Snapshot>) + Send + Sync>;

/// Mutable sampling state. Only touched with the engine lock held.
struct Engine {
    source: Box<dyn MetricSource>,
    history: SeriesHistory,
    latest: Option<SystemMetrics>,
    table: Arc<ProcessTable>,
    alerts: AlertState,
    evaluator: AlertEvaluator,
    sequence: u64,
    /// Counter failures seen on the previous series tick.
    failing: Vec<SourceError>,
}

impl Engine {
    fn sample_series(&mut self, shared: &Shared) -> Vec<AlertEvent> {
        let reading = self.source.read_system_metrics();
        self.report_failures(&reading.errors, shared);

        let taken_at = Local::now();
        let mut metrics = self.latest.unwrap_or_default();
        let mut recorded = false;
        for series in Series::ALL {
            // An unreadable counter falls back to its own last recorded value.
            let value = reading
                .get(series)
                .or_else(|| self.history.get(series).latest().map(|sample| sample.value));
            if let Some(value) = value {
                metrics.set(series, value);
                self.history.push(series, Sample { value, taken_at });
                recorded = true;
            }
        }
        if !recorded {
            return Vec::new();
        }
        self.latest = Some(metrics);

        let thresholds = *shared.thresholds.read().unwrap_or_else(PoisonError::into_inner);
        let muted = shared.muted.load(Ordering::SeqCst);
        let (alerts, events) = self
            .evaluator
            .evaluate(&metrics, &thresholds, &self.alerts, muted);
        self.alerts = alerts;

        for event in &events {
            shared.log.record(format!("Alert: {event}"));
        }
        events
    }

    /// Writes a counter failure to the event log when it starts; repeats of
    /// the same failure on later ticks only reach the debug log.
    fn report_failures(&mut self, errors: &[SourceError], shared: &Shared) {
        for err in errors {
            if self.failing.contains(err) {
                debug!("still failing: {err}");
            } else {
                warn!("system metrics read failed: {err}");
                shared.log.record(format!("Sampling error: {err}"));
            }
        }
        self.failing = errors.to_vec();
    }

    fn sample_processes(&mut self) {
        let mut records = Vec::new();
        let mut skipped = 0usize;
        for read in self.source.list_processes() {
            match read {
                Ok(record) => records.push(record),
                Err(err) => {
                    skipped += 1;
                    debug!("Process skipped: {err}");
                }
            }
        }
        debug!("process table rebuilt: {} records, {skipped} skipped", records.len());
        self.table = Arc::new(ProcessTable::build(records));
    }

    fn snapshot(&mut self, events: Vec<AlertEvent>) -> Snapshot {
        self.sequence += 1;
        Snapshot {
            sequence: self.sequence,
            taken_at: Local::now(),
            history: self.history.clone(),
            latest: self.latest,
            processes: Arc::clone(&self.table),
            alerts: self.alerts.clone(),
            events,
        }
    }
}

/// State shared between the sampler thread and the foreground.
struct Shared {
    engine: Mutex<Engine>,
    snapshot: RwLock<Arc<Snapshot>>,
    thresholds: RwLock<ThresholdSet>,
    paused: AtomicBool,
    muted: AtomicBool,
    stopped: AtomicBool,
    subscribers: Mutex<Vec<Subscriber>>,
    log: Arc<EventLog>,
}

impl Shared {
    fn tick(&self, cadence: Cadence) -> TickOutcome {
        if self.stopped.load(Ordering::SeqCst) {
            return TickOutcome::Stopped;
        }
        let mut engine = match self.engine.try_lock() {
            Ok(engine) => engine,
            Err(TryLockError::WouldBlock) => {
                debug!("{cadence:?} tick dropped: engine busy");
                return TickOutcome::Busy;
            }
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };
        if self.paused.load(Ordering::SeqCst) {
            return TickOutcome::Paused;
        }

        let events = match cadence {
            Cadence::Series => engine.sample_series(self),
            Cadence::Processes => {
                engine.sample_processes();
                Vec::new()
            }
        };
        let snapshot = Arc::new(engine.snapshot(events));
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&snapshot);
        drop(engine);

        for subscriber in self.subscribers().iter() {
            if panic::catch_unwind(AssertUnwindSafe(|| subscriber(&snapshot))).is_err() {
                error!("snapshot subscriber panicked on sequence {}", snapshot.sequence);
            }
        }
        TickOutcome::Sampled(snapshot.sequence)
    }

    fn subscribers(&self) -> MutexGuard<'_, Vec<Subscriber>> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct Worker {
    stop_tx: Sender<()>,
    done_rx: Receiver<()>,
    handle: JoinHandle<()>,
}

/// Handle to the sampling engine. Dropping it stops the background thread.
pub struct Sampler {
    shared: Arc<Shared>,
    worker: Option<Worker>,
    series_interval: Duration,
    process_interval: Duration,
    shutdown_timeout: Duration,
}

impl Sampler {
    /// Builds a sampler without a background thread; the caller drives it
    /// with [`Sampler::tick`].
    pub fn manual(source: Box<dyn MetricSource>, settings: &Settings, log: Arc<EventLog>) -> Self {
        let settings = settings.clone().normalized();
        let engine = Engine {
            source,
            history: SeriesHistory::new(settings.history_length),
            latest: None,
            table: Arc::new(ProcessTable::default()),
            alerts: AlertState::default(),
            evaluator: AlertEvaluator::new(settings.escalation_step),
            sequence: 0,
            failing: Vec::new(),
        };
        let shared = Shared {
            engine: Mutex::new(engine),
            snapshot: RwLock::new(Arc::new(Snapshot::empty(settings.history_length))),
            thresholds: RwLock::new(ThresholdSet::new(
                settings.cpu_threshold,
                settings.memory_threshold,
                settings.disk_threshold,
            )),
            paused: AtomicBool::new(false),
            muted: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            subscribers: Mutex::new(Vec::new()),
            log,
        };
        Self {
            shared: Arc::new(shared),
            worker: None,
            series_interval: settings.series_interval(),
            process_interval: settings.process_interval(),
            shutdown_timeout: settings.shutdown_timeout(),
        }
    }

    /// Builds a sampler and starts its background thread.
    pub fn spawn(
        source: Box<dyn MetricSource>,
        settings: &Settings,
        log: Arc<EventLog>,
    ) -> std::io::Result<Self> {
        let mut sampler = Self::manual(source, settings, log);
        sampler.start()?;
        Ok(sampler)
    }

    fn start(&mut self) -> std::io::Result<()> {
        let (stop_tx, stop_rx) = mpsc::channel();
        let (done_tx, done_rx) = mpsc::channel();
        let shared = Arc::clone(&self.shared);
        let intervals = (self.series_interval, self.process_interval);
        let handle = thread::Builder::new()
            .name("procwatch-sampler".into())
            .spawn(move || {
                run_loop(&shared, &stop_rx, intervals.0, intervals.1);
                let _ = done_tx.send(());
            })?;
        info!(
            "sampler started (series every {:?}, processes every {:?})",
            self.series_interval, self.process_interval
        );
        self.worker = Some(Worker {
            stop_tx,
            done_rx,
            handle,
        });
        Ok(())
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.shared.snapshot.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Registers a callback invoked on the sampler thread after every
    /// publication. Callbacks must not call `subscribe` themselves. A panic in
    /// a callback is logged and does not stop sampling.
    pub fn subscribe<F>(&self, callback: F)
    where
        F: Fn(&Arc<Snapshot>) + Send + Sync + 'static,
    {
        self.shared.subscribers().push(Box::new(callback));
    }

    /// Runs one tick on the caller's thread.
    pub fn tick(&self, cadence: Cadence) -> TickOutcome {
        self.shared.tick(cadence)
    }

    /// Runs both cadences immediately.
    pub fn refresh_now(&self) -> (TickOutcome, TickOutcome) {
        (self.tick(Cadence::Series), self.tick(Cadence::Processes))
    }

    pub fn state(&self) -> SamplerState {
        if self.shared.stopped.load(Ordering::SeqCst) {
            SamplerState::Stopped
        } else if self.is_paused() {
            SamplerState::Paused
        } else {
            SamplerState::Running
        }
    }

    pub fn pause(&self) {
        self.set_paused(true);
    }

    pub fn resume(&self) {
        self.set_paused(false);
    }

    pub fn set_paused(&self, paused: bool) {
        self.shared.paused.store(paused, Ordering::SeqCst);
    }

    /// Flips the pause flag and returns the new value.
    pub fn toggle_paused(&self) -> bool {
        !self.shared.paused.fetch_xor(true, Ordering::SeqCst)
    }

    pub fn is_paused(&self) -> bool {
        self.shared.paused.load(Ordering::SeqCst)
    }

    pub fn set_muted(&self, muted: bool) {
        self.shared.muted.store(muted, Ordering::SeqCst);
    }

    /// Flips the mute flag and returns the new value.
    pub fn toggle_muted(&self) -> bool {
        !self.shared.muted.fetch_xor(true, Ordering::SeqCst)
    }

    pub fn is_muted(&self) -> bool {
        self.shared.muted.load(Ordering::SeqCst)
    }

    pub fn thresholds(&self) -> ThresholdSet {
        *self.shared.thresholds.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_thresholds(&self, thresholds: ThresholdSet) {
        *self.shared.thresholds.write().unwrap_or_else(PoisonError::into_inner) = thresholds;
    }

    pub fn event_log(&self) -> &Arc<EventLog> {
        &self.shared.log
    }

    /// Gives `f` exclusive access to the metric source. Blocks while a tick
    /// is in flight.
    pub fn with_source<R>(&self, f: impl FnOnce(&mut dyn MetricSource) -> R) -> R {
        let mut engine = self.shared.engine.lock().unwrap_or_else(PoisonError::into_inner);
        f(engine.source.as_mut())
    }

    /// Stops sampling. A tick already in flight completes; nothing runs after
    /// it. Returns `false` if the thread did not exit within the shutdown
    /// timeout, in which case it is left detached.
    pub fn stop(&mut self) -> bool {
        self.shared.stopped.store(true, Ordering::SeqCst);
        let Some(worker) = self.worker.take() else {
            return true;
        };
        let _ = worker.stop_tx.send(());
        match worker.done_rx.recv_timeout(self.shutdown_timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if worker.handle.join().is_err() {
                    error!("sampler thread panicked");
                }
                info!("sampler stopped");
                true
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    "sampler did not stop within {:?}, detaching",
                    self.shutdown_timeout
                );
                false
            }
        }
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_loop(shared: &Shared, stop_rx: &Receiver<()>, series_interval: Duration, process_interval: Duration) {
    let start = Instant::now();
    let mut series = Ticker::new(series_interval, start);
    let mut processes = Ticker::new(process_interval, start);

    loop {
        match stop_rx.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => break,
            Err(TryRecvError::Empty) => {}
        }

        for (cadence, ticker) in [(Cadence::Series, &mut series), (Cadence::Processes, &mut processes)] {
            if !ticker.is_due(Instant::now()) {
                continue;
            }
            if shared.tick(cadence) == TickOutcome::Stopped {
                return;
            }
            let skipped = ticker.advance(Instant::now());
            if skipped > 0 {
                debug!("{cadence:?} tick overran, coalesced {skipped} missed deadline(s)");
            }
        }

        let next = series.next_deadline().min(processes.next_deadline());
        let wait = next.saturating_duration_since(Instant::now());
        match stop_rx.recv_timeout(wait) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::scripted::ScriptedSource;
    use super::*;
    use crate::process::ProcessRecord;

    fn manual(source: &ScriptedSource) -> Sampler {
        Sampler::manual(
            Box::new(source.clone()),
            &Settings::default(),
            Arc::new(EventLog::memory()),
        )
    }

    #[test]
    fn series_tick_records_and_publishes() {
        let source = ScriptedSource::new();
        source.push_usage(12.0, 34.0);
        let sampler = manual(&source);

        assert_eq!(sampler.snapshot().sequence, 0);
        assert_eq!(sampler.tick(Cadence::Series), TickOutcome::Sampled(1));
        let snapshot = sampler.snapshot();
        assert_eq!(snapshot.history.get(Series::Cpu).values(), vec![12.0]);
        assert_eq!(snapshot.history.get(Series::Memory).values(), vec![34.0]);
        assert!(snapshot.processes.is_empty());
        assert_eq!(source.process_reads(), 0);
    }

    #[test]
    fn process_tick_rebuilds_table_and_skips_failed_reads() {
        let source = ScriptedSource::new();
        source.set_listing(vec![
            Ok(ProcessRecord::new(1, "init")),
            Err(SourceError::ProcessGone(sysinfo::Pid::from_u32(2))),
            Err(SourceError::AccessDenied(sysinfo::Pid::from_u32(3))),
            Ok(ProcessRecord::new(4, "shell")),
        ]);
        let sampler = manual(&source);

        sampler.tick(Cadence::Processes);
        let snapshot = sampler.snapshot();
        let pids: Vec<u32> = snapshot.processes.iter().map(|r| r.pid.as_u32()).collect();
        assert_eq!(pids, vec![1, 4]);
        assert!(snapshot.history.is_empty());
        // Skipped processes stay out of the user-facing log.
        assert!(sampler.event_log().recent().is_empty());
    }

    #[test]
    fn failed_read_reuses_last_known_value() {
        let source = ScriptedSource::new();
        source
            .push_usage(40.0, 50.0)
            .push_failure(SourceError::MetricUnavailable("cpu".into()))
            .push_usage(42.0, 51.0);
        let sampler = manual(&source);

        for _ in 0..3 {
            sampler.tick(Cadence::Series);
        }
        let snapshot = sampler.snapshot();
        assert_eq!(snapshot.history.get(Series::Cpu).values(), vec![40.0, 40.0, 42.0]);
        let log = sampler.event_log().recent();
        assert_eq!(log.len(), 1);
        assert!(log[0].ends_with("Sampling error: metric unavailable: cpu"));
    }

    #[test]
    fn failed_first_read_records_nothing() {
        let source = ScriptedSource::new();
        source.push_failure(SourceError::MetricUnavailable("memory".into()));
        let sampler = manual(&source);
        assert!(matches!(sampler.tick(Cadence::Series), TickOutcome::Sampled(_)));
        assert!(sampler.snapshot().history.is_empty());
    }

    fn without_disk(cpu: f64) -> MetricsReading {
        let mut reading = MetricsReading::default();
        reading.put(Series::Cpu, Ok(cpu));
        reading.put(Series::Memory, Ok(10.0));
        reading.put(
            Series::Disk,
            Err(SourceError::MetricUnavailable("disk (not-a-mount)".into())),
        );
        reading.put(Series::Network, Ok(0.0));
        reading
    }

    #[test]
    fn unreadable_disk_does_not_block_cpu_alerts() {
        let source = ScriptedSource::new();
        source
            .push_reading(without_disk(20.0))
            .push_reading(without_disk(85.0))
            .push_reading(without_disk(86.0));
        let sampler = manual(&source);

        let mut fired = Vec::new();
        for _ in 0..3 {
            sampler.tick(Cadence::Series);
            fired.extend(sampler.snapshot().events.iter().map(|e| e.series));
        }
        let snapshot = sampler.snapshot();
        assert_eq!(fired, vec![Series::Cpu]);
        assert_eq!(snapshot.history.get(Series::Cpu).values(), vec![20.0, 85.0, 86.0]);
        assert_eq!(snapshot.history.get(Series::Memory).len(), 3);
        assert!(snapshot.history.get(Series::Disk).is_empty());

        // The failure is logged once, not on every tick.
        let errors: Vec<_> = sampler
            .event_log()
            .recent()
            .into_iter()
            .filter(|line| line.contains("Sampling error"))
            .collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].ends_with("metric unavailable: disk (not-a-mount)"));
    }

    #[test]
    fn unreadable_counter_reuses_only_its_own_last_value() {
        let source = ScriptedSource::new();
        source
            .push_metrics(SystemMetrics {
                cpu_percent: 5.0,
                mem_percent: 10.0,
                disk_percent: 50.0,
                net_bytes_cumulative: 100.0,
            })
            .push_reading(without_disk(30.0));
        let sampler = manual(&source);
        sampler.tick(Cadence::Series);
        sampler.tick(Cadence::Series);

        let snapshot = sampler.snapshot();
        assert_eq!(snapshot.history.get(Series::Cpu).values(), vec![5.0, 30.0]);
        assert_eq!(snapshot.history.get(Series::Disk).values(), vec![50.0, 50.0]);
        assert_eq!(snapshot.latest.map(|m| m.disk_percent), Some(50.0));
        assert_eq!(snapshot.latest.map(|m| m.cpu_percent), Some(30.0));
    }

    #[test]
    fn recovered_counter_is_logged_again_on_next_failure() {
        let source = ScriptedSource::new();
        let failure = || SourceError::MetricUnavailable("cpu".into());
        source
            .push_failure(failure())
            .push_failure(failure())
            .push_usage(1.0, 1.0)
            .push_failure(failure());
        let sampler = manual(&source);
        for _ in 0..4 {
            sampler.tick(Cadence::Series);
        }
        assert_eq!(sampler.event_log().recent().len(), 2);
    }

    #[test]
    fn panicking_subscriber_does_not_stop_sampling() {
        let sampler = manual(&ScriptedSource::new());
        sampler.subscribe(|_| panic!("subscriber failure"));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        sampler.subscribe(move |snapshot| sink.lock().unwrap().push(snapshot.sequence));

        assert_eq!(sampler.tick(Cadence::Series), TickOutcome::Sampled(1));
        assert_eq!(sampler.tick(Cadence::Processes), TickOutcome::Sampled(2));
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn paused_ticks_do_nothing_until_resumed() {
        let source = ScriptedSource::new();
        source.push_usage(1.0, 1.0);
        let sampler = manual(&source);
        sampler.tick(Cadence::Series);

        sampler.pause();
        assert_eq!(sampler.state(), SamplerState::Paused);
        for _ in 0..5 {
            assert_eq!(sampler.tick(Cadence::Series), TickOutcome::Paused);
            assert_eq!(sampler.tick(Cadence::Processes), TickOutcome::Paused);
        }
        assert_eq!(sampler.snapshot().history.len(), 1);
        assert_eq!(source.metric_reads(), 1);

        sampler.resume();
        assert_eq!(sampler.tick(Cadence::Series), TickOutcome::Sampled(2));
        assert_eq!(sampler.snapshot().history.len(), 2);
    }

    #[test]
    fn tick_is_dropped_while_engine_is_busy() {
        let source = ScriptedSource::new();
        let sampler = manual(&source);
        let outcome = sampler.with_source(|_| sampler.tick(Cadence::Series));
        assert_eq!(outcome, TickOutcome::Busy);
        assert_eq!(source.metric_reads(), 0);
    }

    #[test]
    fn alerts_fire_on_edges_and_reach_the_log() {
        let source = ScriptedSource::new();
        for cpu in [10.0, 50.0, 85.0, 90.0, 70.0] {
            source.push_usage(cpu, 10.0);
        }
        let sampler = manual(&source);
        let mut fired = Vec::new();
        for i in 0..5 {
            sampler.tick(Cadence::Series);
            if !sampler.snapshot().events.is_empty() {
                fired.push(i);
            }
        }
        assert_eq!(fired, vec![2]);
        assert!(!sampler.snapshot().alerts.is_alerting(Series::Cpu));
        let log = sampler.event_log().recent();
        assert_eq!(log.len(), 1);
        assert!(log[0].contains("Alert: High CPU Usage: 85.0%"));
    }

    #[test]
    fn threshold_updates_apply_on_next_tick() {
        let source = ScriptedSource::new();
        source.push_usage(60.0, 10.0);
        let sampler = manual(&source);
        sampler.tick(Cadence::Series);
        assert!(sampler.snapshot().events.is_empty());

        sampler.set_thresholds(sampler.thresholds().with_adjustable(50.0, 80.0));
        sampler.tick(Cadence::Series);
        assert_eq!(sampler.snapshot().events.len(), 1);
    }

    #[test]
    fn subscribers_see_every_publication() {
        let source = ScriptedSource::new();
        let sampler = manual(&source);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        sampler.subscribe(move |snapshot| sink.lock().unwrap().push(snapshot.sequence));

        sampler.refresh_now();
        sampler.tick(Cadence::Series);
        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn toggles_report_new_value() {
        let sampler = manual(&ScriptedSource::new());
        assert!(sampler.toggle_muted());
        assert!(sampler.is_muted());
        assert!(!sampler.toggle_muted());
        assert!(sampler.toggle_paused());
        assert!(!sampler.toggle_paused());
        assert_eq!(sampler.state(), SamplerState::Running);
    }

    #[test]
    fn stopped_sampler_refuses_ticks() {
        let mut sampler = manual(&ScriptedSource::new());
        assert!(sampler.stop());
        assert_eq!(sampler.state(), SamplerState::Stopped);
        assert_eq!(sampler.tick(Cadence::Series), TickOutcome::Stopped);
    }
}
