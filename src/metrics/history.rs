use super::{Series, SystemMetrics};
use chrono::{DateTime, Local};
use std::fmt;

/// One recorded value of a series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub value: f64,
    pub taken_at: DateTime<Local>,
}

/// A fixed-capacity ring of samples, oldest first.
#[derive(Clone)]
pub struct HistoryBuffer {
    buffer: Vec<Sample>,
    write_pos: usize,
    capacity: usize,
}

impl HistoryBuffer {
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: Vec::with_capacity(capacity),
            write_pos: 0,
            capacity,
        }
    }

    pub fn push(&mut self, sample: Sample) {
        if self.buffer.len() < self.capacity {
            self.buffer.push(sample);
        } else {
            self.buffer[self.write_pos] = sample;
        }
        self.write_pos = (self.write_pos + 1) % self.capacity;
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        let head = if self.buffer.len() < self.capacity {
            0
        } else {
            self.write_pos
        };

        self.buffer[head..].iter().chain(&self.buffer[..head])
    }

    pub fn samples(&self) -> Vec<Sample> {
        self.iter().copied().collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.iter().map(|s| s.value).collect()
    }

    pub fn latest(&self) -> Option<Sample> {
        if self.buffer.is_empty() {
            return None;
        }
        let last = (self.write_pos + self.capacity - 1) % self.capacity;
        self.buffer.get(last).copied()
    }

    pub fn peak(&self) -> Option<f64> {
        self.iter().map(|s| s.value).reduce(f64::max)
    }

    pub fn mean(&self) -> Option<f64> {
        if self.buffer.is_empty() {
            return None;
        }
        Some(self.iter().map(|s| s.value).sum::<f64>() / self.buffer.len() as f64)
    }
}

impl fmt::Debug for HistoryBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter().map(|s| s.value)).finish()
    }
}

/// One history buffer per [`Series`].
#[derive(Debug, Clone)]
pub struct SeriesHistory {
    cpu: HistoryBuffer,
    memory: HistoryBuffer,
    disk: HistoryBuffer,
    network: HistoryBuffer,
}

impl SeriesHistory {
    pub fn new(history_len: usize) -> Self {
        Self {
            cpu: HistoryBuffer::new(history_len),
            memory: HistoryBuffer::new(history_len),
            disk: HistoryBuffer::new(history_len),
            network: HistoryBuffer::new(history_len),
        }
    }

    /// Appends one sample to every series, all stamped with `taken_at`.
    pub fn record(&mut self, metrics: &SystemMetrics, taken_at: DateTime<Local>) {
        for series in Series::ALL {
            let value = metrics.value(series);
            self.get_mut(series).push(Sample { value, taken_at });
        }
    }

    /// Appends to a single series.
    pub fn push(&mut self, series: Series, sample: Sample) {
        self.get_mut(series).push(sample);
    }

    pub fn get(&self, series: Series) -> &HistoryBuffer {
        match series {
            Series::Cpu => &self.cpu,
            Series::Memory => &self.memory,
            Series::Disk => &self.disk,
            Series::Network => &self.network,
        }
    }

    fn get_mut(&mut self, series: Series) -> &mut HistoryBuffer {
        match series {
            Series::Cpu => &mut self.cpu,
            Series::Memory => &mut self.memory,
            Series::Disk => &mut self.disk,
            Series::Network => &mut self.network,
        }
    }

    /// Number of recorded sample sets, counted on the CPU buffer. A counter
    /// that has never been readable has a shorter buffer.
    pub fn len(&self) -> usize {
        self.cpu.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cpu.is_empty()
    }
}
