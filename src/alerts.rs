//! Edge-triggered threshold alerts.
//!
//! A series raises an alert when it crosses above its threshold. While it
//! stays above, it only fires again if it climbs by at least the escalation
//! step over the value it last fired at, or if its threshold was changed.
//! Dropping back below resets the series silently.

use crate::metrics::{Series, SystemMetrics};
use crate::settings::clamp_threshold;
use chrono::{DateTime, Local};
use log::info;
use std::fmt;

/// Alert thresholds in percent. `cpu` and `memory` are user-adjustable,
/// `disk` only comes from configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdSet {
    pub cpu: f64,
    pub memory: f64,
    pub disk: f64,
}

impl Default for ThresholdSet {
    fn default() -> Self {
        Self {
            cpu: 80.0,
            memory: 80.0,
            disk: 90.0,
        }
    }
}

impl ThresholdSet {
    pub fn new(cpu: f64, memory: f64, disk: f64) -> Self {
        Self {
            cpu: clamp_threshold(cpu),
            memory: clamp_threshold(memory),
            disk: clamp_threshold(disk),
        }
    }

    /// Replaces the adjustable thresholds, keeping `disk`.
    pub fn with_adjustable(&self, cpu: f64, memory: f64) -> Self {
        Self::new(cpu, memory, self.disk)
    }

    /// `None` for series without an alert rule.
    pub fn for_series(&self, series: Series) -> Option<f64> {
        match series {
            Series::Cpu => Some(self.cpu),
            Series::Memory => Some(self.memory),
            Series::Disk => Some(self.disk),
            Series::Network => None,
        }
    }
}

/// Alert tracking for one series.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SeriesAlert {
    pub alerting: bool,
    /// Value at which the series last fired (or would have, while muted).
    pub fired_value: Option<f64>,
    pub fired_threshold: Option<f64>,
    pub last_value: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertState {
    pub cpu: SeriesAlert,
    pub memory: SeriesAlert,
    pub disk: SeriesAlert,
    pub muted: bool,
}

impl AlertState {
    pub fn get(&self, series: Series) -> Option<&SeriesAlert> {
        match series {
            Series::Cpu => Some(&self.cpu),
            Series::Memory => Some(&self.memory),
            Series::Disk => Some(&self.disk),
            Series::Network => None,
        }
    }

    fn get_mut(&mut self, series: Series) -> Option<&mut SeriesAlert> {
        match series {
            Series::Cpu => Some(&mut self.cpu),
            Series::Memory => Some(&mut self.memory),
            Series::Disk => Some(&mut self.disk),
            Series::Network => None,
        }
    }

    pub fn is_alerting(&self, series: Series) -> bool {
        self.get(series).is_some_and(|s| s.alerting)
    }

    pub fn alerting(&self) -> Vec<Series> {
        Series::ALL
            .into_iter()
            .filter(|s| self.is_alerting(*s))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    /// The series crossed above its threshold.
    Raised,
    /// The series kept climbing while already above its threshold.
    Escalated,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertEvent {
    pub series: Series,
    pub kind: AlertKind,
    pub value: f64,
    pub threshold: f64,
    pub at: DateTime<Local>,
}

impl fmt::Display for AlertEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.series {
            Series::Cpu => "CPU",
            Series::Memory => "Memory",
            Series::Disk => "Disk",
            Series::Network => "Network",
        };
        let verb = match self.kind {
            AlertKind::Raised => "High",
            AlertKind::Escalated => "Rising",
        };
        write!(
            f,
            "{verb} {label} Usage: {:.1}% (Threshold: {}%)",
            self.value, self.threshold
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AlertEvaluator {
    escalation_step: f64,
}

impl Default for AlertEvaluator {
    fn default() -> Self {
        Self::new(10.0)
    }
}

impl AlertEvaluator {
    pub fn new(escalation_step: f64) -> Self {
        Self { escalation_step }
    }

    pub fn escalation_step(&self) -> f64 {
        self.escalation_step
    }

    /// Compares `metrics` against `thresholds`. The returned state always
    /// reflects the comparison; events are withheld while `muted`.
    pub fn evaluate(
        &self,
        metrics: &SystemMetrics,
        thresholds: &ThresholdSet,
        previous: &AlertState,
        muted: bool,
    ) -> (AlertState, Vec<AlertEvent>) {
        let mut next = previous.clone();
        next.muted = muted;
        let mut events = Vec::new();
        let now = Local::now();

        for series in Series::ALL {
            let Some(threshold) = thresholds.for_series(series) else {
                continue;
            };
            let Some(slot) = next.get_mut(series) else {
                continue;
            };
            let prev = *slot;
            let value = metrics.value(series);

            if value <= threshold {
                if prev.alerting {
                    info!("{series} back below threshold ({value:.1}% <= {threshold}%)");
                }
                *slot = SeriesAlert {
                    last_value: Some(value),
                    ..Default::default()
                };
                continue;
            }

            let kind = if !prev.alerting || prev.fired_threshold != Some(threshold) {
                Some(AlertKind::Raised)
            } else if prev
                .fired_value
                .map_or(true, |fired| value >= fired + self.escalation_step)
            {
                Some(AlertKind::Escalated)
            } else {
                None
            };

            *slot = SeriesAlert {
                alerting: true,
                fired_value: if kind.is_some() { Some(value) } else { prev.fired_value },
                fired_threshold: Some(threshold),
                last_value: Some(value),
            };

            if let Some(kind) = kind {
                if !muted {
                    events.push(AlertEvent {
                        series,
                        kind,
                        value,
                        threshold,
                        at: now,
                    });
                }
            }
        }

        (next, events)
    }
}
