//! Telemetry source abstraction.
//!
//! A [`TelemetrySource`] is the engine's only view of the monitored process.
//! It hands out cumulative per-thread counters as aligned arrays (one value per
//! requested id, in request order) and descriptive thread metadata. All batch
//! fetches are independent reads; nothing guarantees that the CPU-time and
//! user-time arrays of one tick were read at the same instant.

use std::fmt;

/// Identifier of a thread inside the monitored process.
pub type ThreadId = u64;

/// Attach/update health of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    /// Last refresh succeeded.
    Attached,
    /// The process is still known, but the last refresh failed.
    UpdateFailed,
    /// The process is gone or was never reachable.
    Detached,
}

/// Which optional counters a source can provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// Per-thread cumulative CPU and user time.
    pub thread_cpu_time: bool,
    /// Per-thread cumulative allocated bytes.
    pub thread_allocated_bytes: bool,
    /// OS-level process metrics (thread count, RSS, ...).
    pub extended_os_metrics: bool,
    /// Process disk I/O counters.
    pub io_counters: bool,
    /// Low-level performance counters.
    pub perf_counters: bool,
}

/// Process-level values refreshed by [`TelemetrySource::update`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessSample {
    pub pid: u32,
    /// Milliseconds since the process started.
    pub uptime_millis: u64,
    /// Cumulative CPU time of the whole process.
    pub cpu_time_nanos: u64,
    /// Number of online processors.
    pub processors: u32,
    pub thread_count: u32,
    /// Launch arguments, space separated.
    pub command_line: String,
}

/// Scheduler state of a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    Running,
    Sleeping,
    DiskSleep,
    Stopped,
    Zombie,
    Idle,
    Unknown,
}

impl ThreadState {
    /// Maps the one-letter state used by `/proc/<pid>/stat`.
    pub fn from_proc_char(c: char) -> Self {
        match c {
            'R' => ThreadState::Running,
            'S' => ThreadState::Sleeping,
            'D' => ThreadState::DiskSleep,
            'T' | 't' => ThreadState::Stopped,
            'Z' | 'X' => ThreadState::Zombie,
            'I' => ThreadState::Idle,
            _ => ThreadState::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ThreadState::Running => "RUNNING",
            ThreadState::Sleeping => "SLEEPING",
            ThreadState::DiskSleep => "DISK_SLEEP",
            ThreadState::Stopped => "STOPPED",
            ThreadState::Zombie => "ZOMBIE",
            ThreadState::Idle => "IDLE",
            ThreadState::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ThreadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptive metadata of one thread.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadInfo {
    pub id: ThreadId,
    pub name: String,
    pub state: ThreadState,
    /// Innermost frame first; empty when stacks were not requested or are unreadable.
    pub stack: Vec<String>,
}

/// Errors returned by batch fetches.
#[derive(Debug)]
pub enum SourceError {
    /// The requested counter family is not available on this source.
    Unsupported(&'static str),
    /// The source could not be read.
    Io(std::io::Error),
    /// The source returned malformed data.
    Parse(String),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Unsupported(what) => write!(f, "{} not supported", what),
            SourceError::Io(e) => write!(f, "I/O error: {}", e),
            SourceError::Parse(msg) => write!(f, "parse error: {}", msg),
        }
    }
}

impl std::error::Error for SourceError {}

impl From<std::io::Error> for SourceError {
    fn from(e: std::io::Error) -> Self {
        SourceError::Io(e)
    }
}

/// Supplier of per-tick counters for one monitored process.
pub trait TelemetrySource {
    /// Refreshes process-level data and reports the resulting health.
    fn update(&mut self) -> SourceState;

    /// Health as of the last [`update`](Self::update).
    fn state(&self) -> SourceState;

    fn capabilities(&self) -> Capabilities;

    /// Process-level values from the last successful update.
    fn process(&self) -> &ProcessSample;

    /// Live thread ids, ascending.
    fn thread_ids(&self) -> Result<Vec<ThreadId>, SourceError>;

    /// Cumulative CPU time per thread, aligned with `ids`. Threads that
    /// vanished are `None`.
    fn thread_cpu_times(&self, ids: &[ThreadId]) -> Result<Vec<Option<u64>>, SourceError>;

    /// Cumulative user-mode CPU time per thread, aligned with `ids`.
    fn thread_user_times(&self, ids: &[ThreadId]) -> Result<Vec<Option<u64>>, SourceError>;

    /// Cumulative allocated bytes per thread, aligned with `ids`.
    fn thread_allocated_bytes(&self, ids: &[ThreadId]) -> Result<Vec<Option<u64>>, SourceError>;

    /// Metadata per thread, aligned with `ids`. Threads that vanished are `None`.
    /// At most `max_depth` stack frames are returned per thread.
    fn thread_info(
        &self,
        ids: &[ThreadId],
        max_depth: usize,
    ) -> Result<Vec<Option<ThreadInfo>>, SourceError>;
}
