//! Frame-by-frame scripted telemetry.
//!
//! Each call to [`TelemetrySource::update`] consumes the next queued
//! [`Frame`]; when the queue runs dry the last frame is replayed, like a
//! process whose counters stopped moving.

use std::collections::VecDeque;

use crate::collector::source::{
    Capabilities, ProcessSample, SourceError, SourceState, TelemetrySource, ThreadId, ThreadInfo,
    ThreadState,
};

/// One thread inside a [`Frame`].
#[derive(Debug, Clone)]
pub struct ScriptedThread {
    pub id: ThreadId,
    pub name: String,
    pub state: ThreadState,
    pub cpu_nanos: u64,
    pub user_nanos: u64,
    pub allocated_bytes: u64,
    pub stack: Vec<String>,
}

impl ScriptedThread {
    pub fn new(id: ThreadId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            state: ThreadState::Running,
            cpu_nanos: 0,
            user_nanos: 0,
            allocated_bytes: 0,
            stack: Vec::new(),
        }
    }

    /// Sets cumulative total and user CPU time.
    pub fn cpu(mut self, total_nanos: u64, user_nanos: u64) -> Self {
        self.cpu_nanos = total_nanos;
        self.user_nanos = user_nanos;
        self
    }

    pub fn allocated(mut self, bytes: u64) -> Self {
        self.allocated_bytes = bytes;
        self
    }

    pub fn state(mut self, state: ThreadState) -> Self {
        self.state = state;
        self
    }

    pub fn stack(mut self, frames: &[&str]) -> Self {
        self.stack = frames.iter().map(|f| f.to_string()).collect();
        self
    }
}

/// State of the scripted process at one tick.
#[derive(Debug, Clone)]
pub struct Frame {
    pub state: SourceState,
    pub uptime_millis: u64,
    pub process_cpu_nanos: u64,
    pub threads: Vec<ScriptedThread>,
}

impl Frame {
    /// An attached frame at the given process uptime.
    pub fn new(uptime_millis: u64) -> Self {
        Self {
            state: SourceState::Attached,
            uptime_millis,
            process_cpu_nanos: 0,
            threads: Vec::new(),
        }
    }

    /// A frame reporting `state` without any data.
    pub fn failed(state: SourceState) -> Self {
        Self {
            state,
            ..Self::new(0)
        }
    }

    pub fn thread(mut self, thread: ScriptedThread) -> Self {
        self.threads.push(thread);
        self
    }

    pub fn process_cpu(mut self, nanos: u64) -> Self {
        self.process_cpu_nanos = nanos;
        self
    }
}

/// [`TelemetrySource`] replaying queued [`Frame`]s.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    frames: VecDeque<Frame>,
    current: Frame,
    state: SourceState,
    process: ProcessSample,
    capabilities: Capabilities,
}

impl ScriptedSource {
    pub fn new(frames: impl IntoIterator<Item = Frame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
            current: Frame::failed(SourceState::Detached),
            state: SourceState::Detached,
            process: ProcessSample {
                pid: 1,
                processors: 4,
                command_line: "scripted --demo".to_string(),
                ..ProcessSample::default()
            },
            capabilities: Capabilities {
                thread_cpu_time: true,
                thread_allocated_bytes: true,
                extended_os_metrics: true,
                io_counters: true,
                perf_counters: true,
            },
        }
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_processors(mut self, processors: u32) -> Self {
        self.process.processors = processors;
        self
    }

    fn find(&self, id: ThreadId) -> Option<&ScriptedThread> {
        self.current.threads.iter().find(|t| t.id == id)
    }

    fn aligned(
        &self,
        ids: &[ThreadId],
        value: impl Fn(&ScriptedThread) -> u64,
    ) -> Vec<Option<u64>> {
        ids.iter().map(|&id| self.find(id).map(&value)).collect()
    }
}

impl TelemetrySource for ScriptedSource {
    fn update(&mut self) -> SourceState {
        if let Some(frame) = self.frames.pop_front() {
            self.current = frame;
        }
        self.state = self.current.state;
        if self.state == SourceState::Attached {
            self.process.uptime_millis = self.current.uptime_millis;
            self.process.cpu_time_nanos = self.current.process_cpu_nanos;
            self.process.thread_count = self.current.threads.len() as u32;
        }
        self.state
    }

    fn state(&self) -> SourceState {
        self.state
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn process(&self) -> &ProcessSample {
        &self.process
    }

    fn thread_ids(&self) -> Result<Vec<ThreadId>, SourceError> {
        let mut ids: Vec<ThreadId> = self.current.threads.iter().map(|t| t.id).collect();
        ids.sort_unstable();
        Ok(ids)
    }

    fn thread_cpu_times(&self, ids: &[ThreadId]) -> Result<Vec<Option<u64>>, SourceError> {
        if !self.capabilities.thread_cpu_time {
            return Err(SourceError::Unsupported("thread cpu time"));
        }
        Ok(self.aligned(ids, |t| t.cpu_nanos))
    }

    fn thread_user_times(&self, ids: &[ThreadId]) -> Result<Vec<Option<u64>>, SourceError> {
        if !self.capabilities.thread_cpu_time {
            return Err(SourceError::Unsupported("thread user time"));
        }
        Ok(self.aligned(ids, |t| t.user_nanos))
    }

    fn thread_allocated_bytes(&self, ids: &[ThreadId]) -> Result<Vec<Option<u64>>, SourceError> {
        if !self.capabilities.thread_allocated_bytes {
            return Err(SourceError::Unsupported("thread allocated bytes"));
        }
        Ok(self.aligned(ids, |t| t.allocated_bytes))
    }

    fn thread_info(
        &self,
        ids: &[ThreadId],
        max_depth: usize,
    ) -> Result<Vec<Option<ThreadInfo>>, SourceError> {
        Ok(ids
            .iter()
            .map(|&id| {
                self.find(id).map(|t| ThreadInfo {
                    id: t.id,
                    name: t.name.clone(),
                    state: t.state,
                    stack: t.stack.iter().take(max_depth).cloned().collect(),
                })
            })
            .collect())
    }
}
