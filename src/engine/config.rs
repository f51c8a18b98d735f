//! Live-mutable engine settings.
//!
//! An [`EngineConfig`] is shared (`Arc`) between the poll loop and whatever
//! path handles reconfiguration. Scalar fields are independent atomics: there
//! is no lock spanning several fields, and the poll loop copies them once per
//! tick with [`EngineConfig::snapshot`], so a change lands on the next tick.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use tracing::info;

use crate::engine::filter::NoiseFloor;
use crate::engine::mode::DetailMode;
use crate::engine::warning::WarningThresholds;

pub const DEFAULT_WIDTH: usize = 100;
pub const MIN_WIDTH: usize = 80;
pub const DEFAULT_LIMIT: usize = 10;

/// Columns taken by everything but the thread name in a table row.
const FIXED_COLUMNS: usize = 48;

/// Rejected configuration values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    ZeroInterval,
    ZeroLimit,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroInterval => write!(f, "interval must be at least 1 second"),
            ConfigError::ZeroLimit => write!(f, "thread limit must be at least 1"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Settings as seen by one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickSettings {
    pub mode: DetailMode,
    pub limit: usize,
    pub interval_secs: u64,
    pub noise_floor: NoiseFloor,
    pub warning: WarningThresholds,
    pub width: usize,
    pub command_hints: bool,
}

impl TickSettings {
    /// Width available for the thread name column.
    pub fn name_width(&self) -> usize {
        self.width.saturating_sub(FIXED_COLUMNS)
    }
}

#[derive(Debug)]
pub struct EngineConfig {
    mode: AtomicU8,
    limit: AtomicUsize,
    interval_secs: AtomicU64,
    min_delta_cpu: AtomicU64,
    min_delta_memory: AtomicU64,
    command_hints: AtomicBool,
    width: usize,
    warning: RwLock<WarningThresholds>,
}

impl EngineConfig {
    /// Creates a config with the default thread limit.
    ///
    /// `width` of `None` means [`DEFAULT_WIDTH`]; smaller than [`MIN_WIDTH`]
    /// is raised to it.
    pub fn new(
        mode: DetailMode,
        width: Option<usize>,
        interval_secs: u64,
    ) -> Result<Self, ConfigError> {
        if interval_secs == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        let floor = NoiseFloor::for_interval(interval_secs);
        Ok(Self {
            mode: AtomicU8::new(mode.index()),
            limit: AtomicUsize::new(DEFAULT_LIMIT),
            interval_secs: AtomicU64::new(interval_secs),
            min_delta_cpu: AtomicU64::new(floor.cpu_nanos),
            min_delta_memory: AtomicU64::new(floor.memory_bytes),
            command_hints: AtomicBool::new(false),
            width: width.unwrap_or(DEFAULT_WIDTH).max(MIN_WIDTH),
            warning: RwLock::new(WarningThresholds::new(interval_secs)),
        })
    }

    pub fn mode(&self) -> DetailMode {
        DetailMode::from_index(self.mode.load(Ordering::Relaxed))
    }

    pub fn set_mode(&self, mode: DetailMode) {
        self.mode.store(mode.index(), Ordering::Relaxed);
        info!(%mode, "mode changed");
    }

    pub fn limit(&self) -> usize {
        self.limit.load(Ordering::Relaxed)
    }

    pub fn set_limit(&self, limit: usize) -> Result<(), ConfigError> {
        if limit == 0 {
            return Err(ConfigError::ZeroLimit);
        }
        self.limit.store(limit, Ordering::Relaxed);
        info!(limit, "thread limit changed");
        Ok(())
    }

    pub fn interval_secs(&self) -> u64 {
        self.interval_secs.load(Ordering::Relaxed)
    }

    /// Changes the refresh interval, recomputing the noise floor and
    /// rescaling the warning thresholds.
    pub fn set_interval(&self, interval_secs: u64) -> Result<(), ConfigError> {
        if interval_secs == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        self.override_noise_floor(NoiseFloor::for_interval(interval_secs));
        self.interval_secs.store(interval_secs, Ordering::Relaxed);
        self.warning
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .update_interval(interval_secs);
        info!(interval_secs, "interval changed");
        Ok(())
    }

    pub fn noise_floor(&self) -> NoiseFloor {
        NoiseFloor {
            cpu_nanos: self.min_delta_cpu.load(Ordering::Relaxed),
            memory_bytes: self.min_delta_memory.load(Ordering::Relaxed),
        }
    }

    /// Replaces the noise floor until the next interval change.
    pub fn override_noise_floor(&self, floor: NoiseFloor) {
        self.min_delta_cpu.store(floor.cpu_nanos, Ordering::Relaxed);
        self.min_delta_memory
            .store(floor.memory_bytes, Ordering::Relaxed);
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn warning(&self) -> WarningThresholds {
        self.warning
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn command_hints(&self) -> bool {
        self.command_hints.load(Ordering::Relaxed)
    }

    /// Appends the command prompt to every report.
    pub fn set_command_hints(&self, enabled: bool) {
        self.command_hints.store(enabled, Ordering::Relaxed);
    }

    /// Copies every field for one tick. Fields are read one by one.
    pub fn snapshot(&self) -> TickSettings {
        TickSettings {
            mode: self.mode(),
            limit: self.limit(),
            interval_secs: self.interval_secs(),
            noise_floor: self.noise_floor(),
            warning: self.warning(),
            width: self.width,
            command_hints: self.command_hints(),
        }
    }
}
