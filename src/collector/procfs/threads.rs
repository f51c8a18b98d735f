//! Per-thread telemetry read from `/proc/<pid>/task/*`.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::collector::procfs::parser::{
    TaskStat, count_processors, parse_cmdline, parse_kernel_stack, parse_task_stat, parse_uptime,
};
use crate::collector::source::{
    Capabilities, ProcessSample, SourceError, SourceState, TelemetrySource, ThreadId, ThreadInfo,
    ThreadState,
};
use crate::collector::traits::FileSystem;

/// Clock ticks per second (USER_HZ). Standard value for Linux.
const CLK_TCK: u64 = 100;
const NANOS_PER_TICK: u64 = 1_000_000_000 / CLK_TCK;
const MILLIS_PER_TICK: u64 = 1_000 / CLK_TCK;

/// [`TelemetrySource`] for one Linux process.
///
/// CPU times come from the `utime`/`stime` fields of each task's `stat` file,
/// so their resolution is one clock tick (10ms). Per-thread allocation
/// counters do not exist in procfs and are reported as unsupported.
pub struct ProcfsSource<F: FileSystem> {
    fs: F,
    proc_path: PathBuf,
    pid: u32,
    state: SourceState,
    process: ProcessSample,
    capabilities: Capabilities,
}

impl<F: FileSystem> ProcfsSource<F> {
    /// Creates a source for `pid` under `proc_path` (usually `/proc`).
    ///
    /// Capabilities are detected once here. The source starts `Detached`
    /// until the first [`update`](TelemetrySource::update).
    pub fn new(fs: F, proc_path: impl Into<PathBuf>, pid: u32) -> Self {
        let proc_path = proc_path.into();
        let pid_dir = proc_path.join(pid.to_string());
        let capabilities = Capabilities {
            thread_cpu_time: true,
            thread_allocated_bytes: false,
            extended_os_metrics: true,
            io_counters: fs.read_to_string(&pid_dir.join("io")).is_ok(),
            perf_counters: false,
        };
        debug!(pid, ?capabilities, "procfs source created");

        Self {
            fs,
            proc_path,
            pid,
            state: SourceState::Detached,
            process: ProcessSample {
                pid,
                ..ProcessSample::default()
            },
            capabilities,
        }
    }

    fn pid_dir(&self) -> PathBuf {
        self.proc_path.join(self.pid.to_string())
    }

    fn task_dir(&self) -> PathBuf {
        self.pid_dir().join("task")
    }

    fn read(&self, path: &Path) -> Result<String, SourceError> {
        Ok(self.fs.read_to_string(path)?)
    }

    fn read_process(&self) -> Result<ProcessSample, SourceError> {
        let pid_dir = self.pid_dir();
        let stat = parse_task_stat(&self.read(&pid_dir.join("stat"))?)
            .map_err(|e| SourceError::Parse(e.message))?;
        let uptime_secs = parse_uptime(&self.read(&self.proc_path.join("uptime"))?)
            .map_err(|e| SourceError::Parse(e.message))?;

        let processors = self
            .fs
            .read_to_string(&self.proc_path.join("stat"))
            .map(|s| count_processors(&s))
            .unwrap_or(0)
            .max(1);
        let command_line = self
            .fs
            .read_to_string(&pid_dir.join("cmdline"))
            .map(|s| parse_cmdline(&s))
            .unwrap_or_default();

        let boot_millis = (uptime_secs * 1000.0) as u64;
        Ok(ProcessSample {
            pid: self.pid,
            uptime_millis: boot_millis.saturating_sub(stat.starttime * MILLIS_PER_TICK),
            cpu_time_nanos: (stat.utime + stat.stime) * NANOS_PER_TICK,
            processors,
            thread_count: stat.num_threads,
            command_line,
        })
    }

    /// Reads one task's stat; `None` if the thread has exited meanwhile.
    fn task_stat(&self, tid: ThreadId) -> Option<TaskStat> {
        let path = self.task_dir().join(tid.to_string()).join("stat");
        let content = self.fs.read_to_string(&path).ok()?;
        parse_task_stat(&content).ok()
    }

    fn task_stack(&self, tid: ThreadId, max_depth: usize) -> Vec<String> {
        if max_depth == 0 {
            return Vec::new();
        }
        let path = self.task_dir().join(tid.to_string()).join("stack");
        self.fs
            .read_to_string(&path)
            .map(|s| parse_kernel_stack(&s, max_depth))
            .unwrap_or_default()
    }
}

impl<F: FileSystem> TelemetrySource for ProcfsSource<F> {
    fn update(&mut self) -> SourceState {
        if !self.fs.exists(&self.pid_dir()) {
            if self.state != SourceState::Detached {
                warn!(pid = self.pid, "process directory disappeared");
            }
            self.state = SourceState::Detached;
            return self.state;
        }

        self.state = match self.read_process() {
            Ok(process) => {
                self.process = process;
                SourceState::Attached
            }
            Err(e) => {
                warn!(pid = self.pid, error = %e, "failed to refresh process stats");
                SourceState::UpdateFailed
            }
        };
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
        Ok(self.fs.read_numeric_dir(&self.task_dir())?)
    }

    fn thread_cpu_times(&self, ids: &[ThreadId]) -> Result<Vec<Option<u64>>, SourceError> {
        Ok(ids
            .iter()
            .map(|&id| self.task_stat(id).map(|s| (s.utime + s.stime) * NANOS_PER_TICK))
            .collect())
    }

    fn thread_user_times(&self, ids: &[ThreadId]) -> Result<Vec<Option<u64>>, SourceError> {
        Ok(ids
            .iter()
            .map(|&id| self.task_stat(id).map(|s| s.utime * NANOS_PER_TICK))
            .collect())
    }

    fn thread_allocated_bytes(&self, _ids: &[ThreadId]) -> Result<Vec<Option<u64>>, SourceError> {
        Err(SourceError::Unsupported("thread allocated bytes"))
    }

    fn thread_info(
        &self,
        ids: &[ThreadId],
        max_depth: usize,
    ) -> Result<Vec<Option<ThreadInfo>>, SourceError> {
        Ok(ids
            .iter()
            .map(|&id| {
                self.task_stat(id).map(|s| ThreadInfo {
                    id,
                    name: s.comm,
                    state: ThreadState::from_proc_char(s.state),
                    stack: self.task_stack(id, max_depth),
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::{MockFs, stat_line};

    fn sample_fs() -> MockFs {
        let mut fs = MockFs::new();
        fs.add_file("/proc/uptime", "1000.50 3000.00\n");
        fs.add_file("/proc/stat", "cpu  1 2 3\ncpu0 1 1 1\ncpu1 1 1 1\n");
        fs.add_process(500, &stat_line(500, "server", 'S', 300, 100, 2, 5_000), "server\0-d\0");
        fs.add_thread(500, 500, &stat_line(500, "server", 'S', 120, 30, 2, 5_000));
        fs.add_thread(500, 501, &stat_line(501, "GC worker", 'R', 180, 70, 2, 5_010));
        fs.add_file(
            "/proc/500/task/501/stack",
            "[<0>] futex_wait+0x1/0x2\n[<0>] do_futex+0x3/0x4\n",
        );
        fs
    }

    #[test]
    fn test_update_reads_process_sample() {
        let mut source = ProcfsSource::new(sample_fs(), "/proc", 500);
        assert_eq!(source.state(), SourceState::Detached);
        assert_eq!(source.update(), SourceState::Attached);

        let p = source.process();
        assert_eq!(p.pid, 500);
        assert_eq!(p.cpu_time_nanos, 400 * NANOS_PER_TICK);
        assert_eq!(p.processors, 2);
        assert_eq!(p.thread_count, 2);
        assert_eq!(p.command_line, "server -d");
        // 1000.5s since boot, started 50s after boot.
        assert_eq!(p.uptime_millis, 1_000_500 - 50_000);
    }

    #[test]
    fn test_thread_counters_aligned_with_ids() {
        let mut source = ProcfsSource::new(sample_fs(), "/proc", 500);
        source.update();

        let ids = source.thread_ids().unwrap();
        assert_eq!(ids, vec![500, 501]);

        // 999 does not exist: its slot is empty, not zero.
        let query = [501, 999, 500];
        assert_eq!(
            source.thread_cpu_times(&query).unwrap(),
            vec![Some(250 * NANOS_PER_TICK), None, Some(150 * NANOS_PER_TICK)]
        );
        assert_eq!(
            source.thread_user_times(&query).unwrap(),
            vec![Some(180 * NANOS_PER_TICK), None, Some(120 * NANOS_PER_TICK)]
        );
    }

    #[test]
    fn test_allocated_bytes_unsupported() {
        let source = ProcfsSource::new(sample_fs(), "/proc", 500);
        assert!(!source.capabilities().thread_allocated_bytes);
        assert!(matches!(
            source.thread_allocated_bytes(&[500]),
            Err(SourceError::Unsupported(_))
        ));
    }

    #[test]
    fn test_thread_info_with_stack() {
        let source = ProcfsSource::new(sample_fs(), "/proc", 500);
        let infos = source.thread_info(&[501, 777], 20).unwrap();
        let info = infos[0].as_ref().unwrap();
        assert_eq!(info.name, "GC worker");
        assert_eq!(info.state, ThreadState::Running);
        assert_eq!(info.stack, vec!["futex_wait+0x1/0x2", "do_futex+0x3/0x4"]);
        assert!(infos[1].is_none());

        let shallow = source.thread_info(&[501], 0).unwrap();
        assert!(shallow[0].as_ref().unwrap().stack.is_empty());
    }

    #[test]
    fn test_missing_process_is_detached() {
        let mut source = ProcfsSource::new(sample_fs(), "/proc", 4242);
        assert_eq!(source.update(), SourceState::Detached);
    }

    #[test]
    fn test_corrupt_stat_is_update_failure() {
        let mut fs = sample_fs();
        fs.add_file("/proc/500/stat", "corrupted");
        let mut source = ProcfsSource::new(fs, "/proc", 500);
        assert_eq!(source.update(), SourceState::UpdateFailed);
    }

    #[test]
    fn test_io_capability_detection() {
        let mut fs = sample_fs();
        assert!(!ProcfsSource::new(fs.clone(), "/proc", 500).capabilities().io_counters);
        fs.add_file("/proc/500/io", "rchar: 1\n");
        assert!(ProcfsSource::new(fs, "/proc", 500).capabilities().io_counters);
    }
}
