//! Telemetry collection for the monitored process.
//!
//! ```text
//!   ThreadMonitor ──► TelemetrySource (trait)
//!                        │
//!          ┌─────────────┴──────────────┐
//!   ProcfsSource<F: FileSystem>    ScriptedSource
//!          │                        (frames, tests/demo)
//!   ┌──────┴──────┐
//!  RealFs       MockFs
//! ```
//!
//! # Usage
//!
//! ```
//! use threadtop::collector::{MockFs, ProcfsSource, TelemetrySource, stat_line};
//!
//! let mut fs = MockFs::new();
//! fs.add_file("/proc/uptime", "100.00 200.00\n");
//! fs.add_process(7, &stat_line(7, "app", 'S', 10, 5, 1, 0), "app\0");
//! fs.add_thread(7, 7, &stat_line(7, "app", 'S', 10, 5, 1, 0));
//!
//! let mut source = ProcfsSource::new(fs, "/proc", 7);
//! source.update();
//! assert_eq!(source.thread_ids().unwrap(), vec![7]);
//! ```

pub mod mock;
pub mod procfs;
pub mod source;
pub mod traits;

pub use mock::{Frame, MockFs, ScriptedSource, ScriptedThread, stat_line};
pub use procfs::ProcfsSource;
pub use source::{
    Capabilities, ProcessSample, SourceError, SourceState, TelemetrySource, ThreadId, ThreadInfo,
    ThreadState,
};
pub use traits::{FileSystem, RealFs};
