use chrono::Local;
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

const RECENT_LINES: usize = 100;

/// Append-only audit log of user-visible events.
///
/// Each line is `[YYYY-MM-DD HH:MM:SS] message` in local time. Lines are also
/// forwarded to the `log` facade and the most recent ones are kept in memory.
pub struct EventLog {
    path: Option<PathBuf>,
    inner: Mutex<Inner>,
}

struct Inner {
    file: Option<File>,
    recent: VecDeque<String>,
}

impl EventLog {
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self::with_file(Some(path), Some(file)))
    }

    /// Keeps lines in memory and in the `log` facade only.
    pub fn memory() -> Self {
        Self::with_file(None, None)
    }

    fn with_file(path: Option<PathBuf>, file: Option<File>) -> Self {
        Self {
            path,
            inner: Mutex::new(Inner {
                file,
                recent: VecDeque::with_capacity(RECENT_LINES),
            }),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn record(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        log::info!("{message}");
        let line = format_line(message);

        let mut inner = self.lock();
        if let Some(file) = inner.file.as_mut() {
            if let Err(err) = writeln!(file, "{line}") {
                log::error!("failed to write event log: {err}");
            }
        }
        if inner.recent.len() == RECENT_LINES {
            inner.recent.pop_front();
        }
        inner.recent.push_back(line);
    }

    /// Most recent lines, oldest first.
    pub fn recent(&self) -> Vec<String> {
        self.lock().recent.iter().cloned().collect()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::memory()
    }
}

fn format_line(message: &str) -> String {
    format!("[{}] {message}", Local::now().format("%Y-%m-%d %H:%M:%S"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_line_shape(line: &str, message: &str) {
        // "[YYYY-MM-DD HH:MM:SS] " is 22 characters.
        assert_eq!(line.len(), 22 + message.len(), "{line}");
        assert!(line.starts_with('['));
        assert_eq!(&line[20..22], "] ");
        assert_eq!(&line[5..6], "-");
        assert_eq!(&line[11..12], " ");
        assert!(line.ends_with(message));
    }

    #[test]
    fn appends_timestamped_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.log");
        let log = EventLog::open(&path).unwrap();
        log.record("Process 42 (sleep) terminated");
        log.record("Alerts muted");
        drop(log);

        // Reopening appends rather than truncating.
        EventLog::open(&path).unwrap().record("third");

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_line_shape(lines[0], "Process 42 (sleep) terminated");
        assert_line_shape(lines[2], "third");
    }

    #[test]
    fn memory_log_keeps_bounded_recent_lines() {
        let log = EventLog::memory();
        for i in 0..(RECENT_LINES + 5) {
            log.record(format!("event {i}"));
        }
        let recent = log.recent();
        assert_eq!(recent.len(), RECENT_LINES);
        assert!(recent[0].ends_with("event 5"));
        assert!(log.path().is_none());
    }
}
