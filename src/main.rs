use anyhow::Context;
use clap::Parser;
use procwatch::metrics::{Series, Snapshot};
use procwatch::process::{ProcessFilter, ProcessTable};
use procwatch::{Controller, Settings};
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Samples host and process metrics and raises threshold alerts.
#[derive(Parser, Debug)]
#[command(name = "procwatch", version)]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Event log destination
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Samples kept per series
    #[arg(long)]
    history: Option<usize>,

    #[arg(long)]
    series_interval_ms: Option<u64>,

    #[arg(long)]
    process_interval_ms: Option<u64>,

    /// CPU alert threshold in percent
    #[arg(long)]
    cpu_threshold: Option<f64>,

    /// Memory alert threshold in percent
    #[arg(long)]
    memory_threshold: Option<f64>,

    /// Process filter, e.g. `ssh`, `pid:42` or `user:root`
    #[arg(long)]
    filter: Option<String>,

    /// Rows shown in the process report
    #[arg(long, default_value_t = 10)]
    top: usize,

    /// Stop after this many seconds
    #[arg(long)]
    duration: Option<u64>,

    /// Take one sample, print a report and exit
    #[arg(long)]
    once: bool,

    /// Write the filtered process table as CSV before exiting
    #[arg(long)]
    export: Option<PathBuf>,
}

impl Args {
    fn settings(&self) -> anyhow::Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => Settings::load(path)?,
            None => Settings::default(),
        };
        if let Some(path) = &self.log_file {
            settings.log_file = path.clone();
        }
        if let Some(len) = self.history {
            settings.history_length = len;
        }
        if let Some(ms) = self.series_interval_ms {
            settings.series_interval_ms = ms;
        }
        if let Some(ms) = self.process_interval_ms {
            settings.process_interval_ms = ms;
        }
        if let Some(value) = self.cpu_threshold {
            settings.cpu_threshold = value;
        }
        if let Some(value) = self.memory_threshold {
            settings.memory_threshold = value;
        }
        Ok(settings.normalized())
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let settings = args.settings()?;

    let mut controller = if args.once {
        Controller::one_shot(&settings)
            .with_context(|| format!("opening event log {}", settings.log_file.display()))?
    } else {
        Controller::start(&settings).context("starting sampler")?
    };
    if let Some(filter) = &args.filter {
        controller.set_filter(ProcessFilter::parse(filter));
    }

    if args.once {
        for (label, value) in controller.system_info().rows() {
            println!("{label:<14} {value}");
        }
        println!();
    } else {
        watch(&controller, &settings, args.duration.map(Duration::from_secs), args.top)?;
    }

    print_summary(&controller.snapshot());
    print_top(&controller, args.top);

    if let Some(path) = &args.export {
        let message = controller.export_current_table(path)?;
        println!("{message}");
    }
    if !controller.shutdown() {
        log::warn!("sampler thread left running at exit");
    }
    Ok(())
}

/// Prints a status line for every new snapshot, and the top processes
/// whenever the table is rebuilt, until Ctrl-C or `duration`.
fn watch(
    controller: &Controller,
    settings: &Settings,
    duration: Option<Duration>,
    top: usize,
) -> anyhow::Result<()> {
    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })
    .context("installing Ctrl-C handler")?;

    let deadline = duration.map(|d| Instant::now() + d);
    let mut last_seen = 0;
    let mut last_table: Option<Arc<ProcessTable>> = None;
    loop {
        let mut wait = settings.series_interval();
        if let Some(deadline) = deadline {
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                break;
            }
            wait = wait.min(left);
        }
        match rx.recv_timeout(wait) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }

        let snapshot = controller.snapshot();
        if snapshot.sequence != last_seen {
            last_seen = snapshot.sequence;
            print_summary(&snapshot);
        }
        let table_changed = last_table
            .as_ref()
            .map_or(true, |table| !Arc::ptr_eq(table, &snapshot.processes));
        if table_changed && !snapshot.processes.is_empty() {
            last_table = Some(Arc::clone(&snapshot.processes));
            print_top(controller, top);
        }
    }
    Ok(())
}

fn print_summary(snapshot: &Snapshot) {
    let Some(metrics) = snapshot.latest else {
        println!("no samples yet");
        return;
    };
    let alerting: Vec<_> = snapshot
        .alerts
        .alerting()
        .iter()
        .map(Series::to_string)
        .collect();
    println!(
        "[{}] CPU {:5.1}% | Memory {:5.1}% | Disk {:5.1}% | Net {:.1} MB | {} processes{}",
        snapshot.taken_at.format("%H:%M:%S"),
        metrics.cpu_percent,
        metrics.mem_percent,
        metrics.disk_percent,
        metrics.net_bytes_cumulative as f64 / (1024.0 * 1024.0),
        snapshot.processes.len(),
        if alerting.is_empty() {
            String::new()
        } else {
            format!(" | ALERT: {}", alerting.join(", "))
        }
    );
}

fn print_top(controller: &Controller, n: usize) {
    let mut rows = controller.visible_processes();
    rows.sort_by(|a, b| b.cpu_percent.total_cmp(&a.cpu_percent));
    println!(
        "{:>7}  {:<24} {:<12} {:>6} {:>10} {:>8} {:>7}",
        "PID", "Name", "User", "CPU%", "Memory MB", "Priority", "Threads"
    );
    for record in rows.iter().take(n) {
        println!(
            "{:>7}  {:<24} {:<12} {:>6.1} {:>10} {:>8} {:>7}",
            record.pid,
            truncate(&record.name, 24),
            truncate(&record.user, 12),
            record.cpu_percent,
            record.memory_mb,
            record.priority,
            record.threads,
        );
    }
}

fn truncate(text: &str, width: usize) -> &str {
    match text.char_indices().nth(width) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
