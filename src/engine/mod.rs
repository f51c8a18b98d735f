//! Per-thread ranking engine.
//!
//! ```text
//!  EngineConfig ──snapshot──► ThreadMonitor::tick
//!                               │
//!        TelemetrySource ──► CounterSample[]
//!                               │
//!   SampleHistory ──► compute_deltas ──► retain_above (noise floor)
//!                               │
//!                        MetricTables::select(mode)
//!                               │
//!                          top_threads ──► Renderer ──► Report
//! ```

pub mod config;
pub mod delta;
pub mod filter;
pub mod history;
pub mod mode;
pub mod monitor;
pub mod rank;
pub mod render;
pub mod warning;

pub use config::{ConfigError, EngineConfig, TickSettings};
pub use filter::NoiseFloor;
pub use mode::{DetailMode, UnknownMode};
pub use monitor::{RankedRow, Report, ReportKind, ThreadMonitor};
pub use warning::{Severity, Threshold, WarningThresholds};
