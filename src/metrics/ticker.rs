use std::time::{Duration, Instant};

/// Fixed-period schedule that never queues missed deadlines.
///
/// If a tick overruns one or more periods, the skipped deadlines are dropped
/// and the ticker resumes on the next deadline still in the future, keeping
/// the original phase.
#[derive(Debug, Clone)]
pub struct Ticker {
    interval: Duration,
    next: Instant,
}

impl Ticker {
    /// The first deadline is `start` itself.
    pub fn new(interval: Duration, start: Instant) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            next: start,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn next_deadline(&self) -> Instant {
        self.next
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.next
    }

    /// Moves to the first deadline after `now`. Returns how many deadlines
    /// were coalesced away.
    pub fn advance(&mut self, now: Instant) -> u64 {
        self.next += self.interval;
        if self.next > now {
            return 0;
        }
        let behind = now.duration_since(self.next).as_nanos();
        let skipped = (behind / self.interval.as_nanos()) as u64 + 1;
        let jump = u32::try_from(skipped).unwrap_or(u32::MAX);
        self.next += self.interval * jump;
        skipped
    }
}
