//! Warning thresholds used to highlight values in the report.
//!
//! Percentages and absolute counts are fixed. Counters that accumulate over a
//! refresh interval (new threads) are configured per second and rescaled
//! whenever the interval changes.

/// Highlight level of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Normal,
    Warning,
    Critical,
}

/// A `(warn, critical)` boundary pair. Boundaries are inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Threshold {
    pub warn: f64,
    pub critical: f64,
}

impl Threshold {
    pub const fn new(warn: f64, critical: f64) -> Self {
        Self { warn, critical }
    }

    pub fn severity(&self, value: f64) -> Severity {
        if value >= self.critical {
            Severity::Critical
        } else if value >= self.warn {
            Severity::Warning
        } else {
            Severity::Normal
        }
    }

    fn scaled(&self, factor: f64) -> Self {
        Self::new(self.warn * factor, self.critical * factor)
    }
}

/// Per-thread CPU% of one core during an interval.
const CPU: Threshold = Threshold::new(50.0, 70.0);
/// Per-thread kernel CPU% of one core during an interval.
const SYSCPU: Threshold = Threshold::new(10.0, 20.0);
/// Live threads in the process.
const THREAD: Threshold = Threshold::new(1000.0, 3000.0);
/// Threads created per second.
const NEW_THREAD_PER_SEC: Threshold = Threshold::new(1.0, 10.0);

/// Process-wide warning configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct WarningThresholds {
    pub cpu: Threshold,
    pub syscpu: Threshold,
    pub thread: Threshold,
    /// Threads created during one interval; derived from `new_thread_per_sec`.
    pub new_thread: Threshold,
    new_thread_per_sec: Threshold,
    interval_secs: u64,
}

impl WarningThresholds {
    pub fn new(interval_secs: u64) -> Self {
        let mut thresholds = Self {
            cpu: CPU,
            syscpu: SYSCPU,
            thread: THREAD,
            new_thread: NEW_THREAD_PER_SEC,
            new_thread_per_sec: NEW_THREAD_PER_SEC,
            interval_secs: 1,
        };
        thresholds.update_interval(interval_secs);
        thresholds
    }

    /// Rescales the interval-relative thresholds.
    pub fn update_interval(&mut self, interval_secs: u64) {
        self.interval_secs = interval_secs;
        self.new_thread = self.new_thread_per_sec.scaled(interval_secs as f64);
    }

    pub fn interval_secs(&self) -> u64 {
        self.interval_secs
    }
}

impl Default for WarningThresholds {
    fn default() -> Self {
        Self::new(1)
    }
}
