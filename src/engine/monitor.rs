//! Tick driver.
//!
//! [`ThreadMonitor::tick`] runs one sample → delta → filter → rank → render
//! cycle against a [`TelemetrySource`]. Every tick captures all counter
//! families the source supports, so switching between CPU and memory modes
//! does not need a fresh baseline. The next [`SampleHistory`] is built in full
//! and only swapped in after the report is rendered.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::collector::{
    Capabilities, ProcessSample, SourceError, SourceState, TelemetrySource, ThreadId,
};
use crate::engine::config::{EngineConfig, TickSettings};
use crate::engine::delta::{CounterSample, CpuTimes, compute_deltas};
use crate::engine::filter::retain_above;
use crate::engine::history::SampleHistory;
use crate::engine::rank::{MetricTables, top_threads};
use crate::engine::render::{
    ATTACH_FAILED, CpuRow, CpuSummary, FETCH_FAILED, MemoryRow, MemorySummary, ProcessSummary,
    Renderer, aggregate_load, finish, rate_per_second, share_percent, thread_cpu_utilization,
};

/// Stack depth used by [`ThreadMonitor::render_stack`].
pub const STACK_DEPTH: usize = 20;

/// What a tick produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    /// A ranked thread table.
    Table,
    /// Baseline tick: notice only.
    Collecting,
    /// The active mode's counters are not available.
    CapabilityGap,
    /// The source could not be refreshed; the loop may continue.
    UpdateFailed,
    /// The process is gone; the monitor requested exit.
    Detached,
}

/// One ranked thread with its value under the active mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankedRow {
    pub id: ThreadId,
    pub value: u64,
}

#[derive(Debug, Clone)]
pub struct Report {
    pub kind: ReportKind,
    /// Rows in display order. Empty unless `kind` is [`ReportKind::Table`].
    pub rows: Vec<RankedRow>,
    pub text: String,
}

pub struct ThreadMonitor<S: TelemetrySource> {
    source: S,
    config: Arc<EngineConfig>,
    renderer: Renderer,
    history: SampleHistory,
    prev_uptime_millis: Option<u64>,
    prev_process_cpu_nanos: u64,
    /// Show the launch notice on the next baseline tick.
    first_time: bool,
    gap_reported: bool,
    should_exit: bool,
}

impl<S: TelemetrySource> ThreadMonitor<S> {
    pub fn new(source: S, config: Arc<EngineConfig>) -> Self {
        Self {
            source,
            config,
            renderer: Renderer::new(false),
            history: SampleHistory::default(),
            prev_uptime_millis: None,
            prev_process_cpu_nanos: 0,
            first_time: true,
            gap_reported: false,
            should_exit: false,
        }
    }

    /// Enables ANSI colors for values above their warning threshold.
    pub fn with_color(mut self, color: bool) -> Self {
        self.renderer = Renderer::new(color);
        self
    }

    pub fn history(&self) -> &SampleHistory {
        &self.history
    }

    pub fn should_exit(&self) -> bool {
        self.should_exit
    }

    /// Asks the host to stop the loop.
    pub fn exit(&mut self) {
        self.should_exit = true;
    }

    /// Drops all baselines. The next tick behaves like the first one.
    pub fn reset(&mut self) {
        self.history.reset();
        self.prev_uptime_millis = None;
        self.prev_process_cpu_nanos = 0;
        self.first_time = true;
        info!("thread history reset");
    }

    /// Runs one tick with the settings current at its start.
    pub fn tick(&mut self) -> Report {
        let started = Instant::now();
        let settings = self.config.snapshot();

        match self.source.update() {
            SourceState::Attached => {}
            SourceState::UpdateFailed => {
                warn!("failed to refresh process data");
                return self.error_report(ReportKind::UpdateFailed, FETCH_FAILED, &settings);
            }
            SourceState::Detached => {
                warn!("monitored process is not reachable, stopping");
                self.exit();
                return self.error_report(ReportKind::Detached, ATTACH_FAILED, &settings);
            }
        }

        let process = self.source.process().clone();
        let capabilities = self.source.capabilities();
        let samples = match self.capture(&capabilities) {
            Ok(samples) => samples,
            Err(e) => {
                warn!(error = %e, "failed to read thread counters");
                return self.error_report(ReportKind::UpdateFailed, FETCH_FAILED, &settings);
            }
        };

        let elapsed_millis = self
            .prev_uptime_millis
            .map(|prev| process.uptime_millis.saturating_sub(prev))
            .unwrap_or(0);
        let process_cpu_delta = process
            .cpu_time_nanos
            .saturating_sub(self.prev_process_cpu_nanos);

        let mut lines = Vec::new();
        self.renderer.process_header(
            &mut lines,
            &self.process_summary(&process, &samples, elapsed_millis, process_cpu_delta),
            &settings.warning,
        );

        let next_history = SampleHistory::from_samples(&samples);
        let cpu_mode = settings.mode.is_cpu();
        let supported = if cpu_mode {
            capabilities.thread_cpu_time
        } else {
            capabilities.thread_allocated_bytes
        };

        let (kind, rows) = if !supported {
            if !self.gap_reported {
                warn!(mode = %settings.mode, "thread counters for this mode are not available");
                self.gap_reported = true;
            }
            self.renderer.capability_gap(&mut lines, cpu_mode);
            (ReportKind::CapabilityGap, Vec::new())
        } else if self.history.family_is_empty(cpu_mode) {
            if self.first_time {
                self.renderer.welcome(
                    &mut lines,
                    process.pid,
                    &capabilities,
                    &process.command_line,
                );
                self.first_time = false;
            }
            self.renderer.collecting(&mut lines);
            (ReportKind::Collecting, Vec::new())
        } else {
            let tables = self.metric_tables(&samples, &next_history, &settings);
            match self.render_table(&mut lines, &settings, &tables, &process, elapsed_millis) {
                Ok(rows) => (ReportKind::Table, rows),
                Err(e) => {
                    warn!(error = %e, "failed to read thread metadata");
                    return self.error_report(ReportKind::UpdateFailed, FETCH_FAILED, &settings);
                }
            }
        };

        self.history.replace(next_history);
        self.prev_uptime_millis = Some(process.uptime_millis);
        self.prev_process_cpu_nanos = process.cpu_time_nanos;

        debug!(
            mode = %settings.mode,
            threads = samples.len(),
            rows = rows.len(),
            elapsed_ms = elapsed_millis,
            cost_us = started.elapsed().as_micros() as u64,
            "tick"
        );

        Report {
            kind,
            rows,
            text: finish(lines, settings.command_hints),
        }
    }

    /// Metadata and call stack of one thread. Does not touch the history.
    pub fn render_stack(&self, tid: ThreadId) -> String {
        let mut lines = Vec::new();
        match self.source.thread_info(&[tid], STACK_DEPTH) {
            Ok(infos) => {
                let info = infos.into_iter().next().flatten();
                self.renderer.stack(&mut lines, tid, info.as_ref());
            }
            Err(e) => {
                warn!(tid, error = %e, "failed to read thread stack");
                lines.push(FETCH_FAILED.to_string());
            }
        }
        finish(lines, false)
    }

    /// `id : name` of every live thread.
    pub fn render_all_threads(&self) -> String {
        let mut lines = Vec::new();
        let listing = self
            .source
            .thread_ids()
            .and_then(|ids| self.source.thread_info(&ids, 0));
        match listing {
            Ok(infos) => {
                let infos: Vec<_> = infos.into_iter().flatten().collect();
                self.renderer.thread_list(&mut lines, &infos);
            }
            Err(e) => {
                warn!(error = %e, "failed to list threads");
                lines.push(FETCH_FAILED.to_string());
            }
        }
        finish(lines, false)
    }

    fn error_report(&self, kind: ReportKind, line: &str, settings: &TickSettings) -> Report {
        Report {
            kind,
            rows: Vec::new(),
            text: finish(vec![line.to_string()], settings.command_hints),
        }
    }

    /// Reads every supported counter family. A thread whose counters could
    /// not all be read exited mid-capture and yields no sample.
    fn capture(&self, capabilities: &Capabilities) -> Result<Vec<CounterSample>, SourceError> {
        let ids = self.source.thread_ids()?;
        let cpu = if capabilities.thread_cpu_time {
            Some((
                self.source.thread_cpu_times(&ids)?,
                self.source.thread_user_times(&ids)?,
            ))
        } else {
            None
        };
        let memory = if capabilities.thread_allocated_bytes {
            Some(self.source.thread_allocated_bytes(&ids)?)
        } else {
            None
        };

        let mut samples = Vec::with_capacity(ids.len());
        for (i, &id) in ids.iter().enumerate() {
            let cpu = match &cpu {
                Some((total, user)) => {
                    let (Some(total_nanos), Some(user_nanos)) = (slot(total, i), slot(user, i))
                    else {
                        continue;
                    };
                    Some(CpuTimes {
                        total_nanos,
                        user_nanos,
                    })
                }
                None => None,
            };
            let memory_allocated_bytes = match &memory {
                Some(bytes) => {
                    let Some(allocated) = slot(bytes, i) else {
                        continue;
                    };
                    Some(allocated)
                }
                None => None,
            };
            samples.push(CounterSample {
                id,
                cpu,
                memory_allocated_bytes,
            });
        }

        if samples.len() < ids.len() {
            debug!(vanished = ids.len() - samples.len(), "threads exited while sampling");
        }
        Ok(samples)
    }

    fn process_summary(
        &self,
        process: &ProcessSample,
        samples: &[CounterSample],
        elapsed_millis: u64,
        cpu_delta_nanos: u64,
    ) -> ProcessSummary {
        let single_core_load = aggregate_load(cpu_delta_nanos, elapsed_millis, process.processors);
        let load = if process.processors > 0 {
            single_core_load / process.processors as f64
        } else {
            0.0
        };
        let new_threads = if self.history.is_empty() {
            0
        } else {
            samples
                .iter()
                .filter(|s| !self.history.contains(s.id))
                .count() as u64
        };
        ProcessSummary {
            pid: process.pid,
            clock: chrono::Local::now().format("%H:%M:%S").to_string(),
            uptime_millis: process.uptime_millis,
            single_core_load,
            load,
            processors: process.processors,
            threads: process.thread_count,
            new_threads,
        }
    }

    fn metric_tables(
        &self,
        samples: &[CounterSample],
        next_history: &SampleHistory,
        settings: &TickSettings,
    ) -> MetricTables {
        let deltas = compute_deltas(samples, &self.history);
        let floor = settings.noise_floor;
        MetricTables {
            cpu: retain_above(&deltas.cpu, floor.cpu_nanos),
            sys: retain_above(&deltas.sys, floor.cpu_nanos),
            memory: retain_above(&deltas.memory, floor.memory_bytes),
            cpu_total: next_history.cpu_total.clone(),
            sys_total: next_history.cpu_sys.clone(),
            memory_total: next_history.memory_total.clone(),
        }
    }

    fn render_table(
        &self,
        lines: &mut Vec<String>,
        settings: &TickSettings,
        tables: &MetricTables,
        process: &ProcessSample,
        elapsed_millis: u64,
    ) -> Result<Vec<RankedRow>, SourceError> {
        let selected = tables.select(settings.mode);
        let top = top_threads(selected, settings.limit);
        let ids: Vec<ThreadId> = top.iter().map(|&(id, _)| id).collect();
        let infos = self.source.thread_info(&ids, 0)?;

        let mut rows = Vec::with_capacity(top.len());
        let mut cpu_rows = Vec::new();
        let mut memory_rows = Vec::new();
        let memory_grand_total: u64 = tables.memory_total.values().sum();

        for (&(id, value), info) in top.iter().zip(infos) {
            // Exited between sampling and metadata lookup.
            let Some(info) = info else { continue };
            rows.push(RankedRow { id, value });
            if settings.mode.is_cpu() {
                cpu_rows.push(CpuRow {
                    id,
                    name: info.name,
                    state: info.state,
                    cpu: thread_cpu_utilization(tables.cpu.get(id), elapsed_millis),
                    sys: thread_cpu_utilization(tables.sys.get(id), elapsed_millis),
                    total_share: share_percent(
                        lookup(&tables.cpu_total, id),
                        process.cpu_time_nanos,
                    ),
                    sys_share: share_percent(
                        lookup(&tables.sys_total, id),
                        process.cpu_time_nanos,
                    ),
                });
            } else {
                let delta = tables.memory.get(id);
                memory_rows.push(MemoryRow {
                    id,
                    name: info.name,
                    state: info.state,
                    bytes_per_sec: rate_per_second(delta.unwrap_or(0), elapsed_millis),
                    rate_share: share_percent(delta, tables.memory.total),
                    total_bytes: lookup(&tables.memory_total, id).unwrap_or(0),
                    total_share: share_percent(
                        lookup(&tables.memory_total, id),
                        memory_grand_total,
                    ),
                });
            }
        }

        if settings.mode.is_cpu() {
            let summary = CpuSummary {
                load: aggregate_load(tables.cpu.total, elapsed_millis, process.processors),
                sys_load: aggregate_load(tables.sys.total, elapsed_millis, process.processors),
                threads_with_value: selected.len(),
            };
            self.renderer.cpu_table(lines, settings, &cpu_rows, &summary);
        } else {
            let summary = MemorySummary {
                bytes_per_sec: rate_per_second(tables.memory.total, elapsed_millis),
                threads_with_value: selected.len(),
            };
            self.renderer.memory_table(lines, settings, &memory_rows, &summary);
        }
        Ok(rows)
    }
}

fn lookup(map: &HashMap<ThreadId, u64>, id: ThreadId) -> Option<u64> {
    map.get(&id).copied()
}

fn slot(values: &[Option<u64>], i: usize) -> Option<u64> {
    values.get(i).copied().flatten()
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::collector::mock::{Frame, MockFs, ScriptedSource, ScriptedThread, stat_line};
    use crate::collector::{FileSystem, ProcfsSource, ThreadState};
    use crate::engine::filter::NoiseFloor;
    use crate::engine::mode::DetailMode;
    use crate::engine::render::{COLLECTING, CPU_GAP, MEMORY_GAP};

    fn config(mode: DetailMode) -> Arc<EngineConfig> {
        let config = EngineConfig::new(mode, None, 1).unwrap();
        config.override_noise_floor(NoiseFloor::NONE);
        Arc::new(config)
    }

    fn t(id: ThreadId, cpu: u64) -> ScriptedThread {
        ScriptedThread::new(id, format!("worker-{}", id)).cpu(cpu, cpu)
    }

    fn two_ticks() -> Vec<Frame> {
        vec![
            Frame::new(1_000).thread(t(1, 100)).thread(t(2, 50)),
            Frame::new(2_000).thread(t(1, 220)).thread(t(2, 90)),
        ]
    }

    fn row(id: ThreadId, value: u64) -> RankedRow {
        RankedRow { id, value }
    }

    #[test]
    fn test_first_tick_is_bootstrap() {
        let mut monitor =
            ThreadMonitor::new(ScriptedSource::new(two_ticks()), config(DetailMode::Cpu));
        let report = monitor.tick();

        assert_eq!(report.kind, ReportKind::Collecting);
        assert!(report.rows.is_empty());
        assert!(report.text.contains(COLLECTING));
        assert!(report.text.contains(" ARGS: scripted --demo"));
        assert!(!report.text.contains("TID"));
        assert_eq!(monitor.history().cpu_total[&1], 100);
        assert_eq!(monitor.history().cpu_total[&2], 50);
    }

    #[test]
    fn test_second_tick_ranks_deltas_with_limit() {
        let config = config(DetailMode::Cpu);
        let mut monitor = ThreadMonitor::new(ScriptedSource::new(two_ticks()), Arc::clone(&config));
        monitor.tick();
        config.set_limit(1).unwrap();

        let report = monitor.tick();
        assert_eq!(report.kind, ReportKind::Table);
        assert_eq!(report.rows, vec![row(1, 120)]);
        assert!(report.text.contains("worker-1"));
        assert!(!report.text.contains("worker-2 "));
        assert!(report.text.contains("2 threads have min value"));
    }

    #[test]
    fn test_noise_floor_excludes_small_deltas() {
        let config = config(DetailMode::Cpu);
        config.override_noise_floor(NoiseFloor {
            cpu_nanos: 50,
            memory_bytes: 0,
        });
        let mut monitor = ThreadMonitor::new(ScriptedSource::new(two_ticks()), Arc::clone(&config));
        monitor.tick();

        let report = monitor.tick();
        assert_eq!(report.rows, vec![row(1, 120)]);
        assert!(report.text.contains("1 threads have min value"));

        // Cumulative totals are not filtered.
        let mut monitor = ThreadMonitor::new(ScriptedSource::new(two_ticks()), Arc::clone(&config));
        config.set_mode(DetailMode::TotalCpu);
        monitor.tick();
        let report = monitor.tick();
        assert_eq!(report.rows, vec![row(1, 220), row(2, 90)]);
    }

    #[test]
    fn test_memory_rate_per_second() {
        let frames = vec![
            Frame::new(10_000).thread(ScriptedThread::new(3, "alloc").allocated(1_000)),
            Frame::new(10_500).thread(ScriptedThread::new(3, "alloc").allocated(3_048)),
        ];
        let mut monitor =
            ThreadMonitor::new(ScriptedSource::new(frames), config(DetailMode::Memory));
        monitor.tick();

        let report = monitor.tick();
        assert_eq!(report.kind, ReportKind::Table);
        assert_eq!(report.rows, vec![row(3, 2048)]);
        // 2048 bytes in 500ms.
        assert!(report.text.contains(" 4.0K/s(100.00%)"));
        assert!(report.text.contains("Total memory allocate:  4.0K/s"));
    }

    #[test]
    fn test_detached_requests_exit() {
        let mut frames = two_ticks();
        frames.push(Frame::failed(SourceState::Detached));
        let mut monitor = ThreadMonitor::new(ScriptedSource::new(frames), config(DetailMode::Cpu));
        monitor.tick();
        monitor.tick();
        assert!(!monitor.should_exit());

        let report = monitor.tick();
        assert_eq!(report.kind, ReportKind::Detached);
        assert!(report.rows.is_empty());
        assert_eq!(report.text, format!("{}\n", ATTACH_FAILED));
        assert!(monitor.should_exit());
    }

    #[test]
    fn test_update_failure_keeps_running() {
        let frames = vec![
            Frame::new(1_000).thread(t(1, 100)),
            Frame::failed(SourceState::UpdateFailed),
            Frame::new(3_000).thread(t(1, 400)),
        ];
        let mut monitor = ThreadMonitor::new(ScriptedSource::new(frames), config(DetailMode::Cpu));
        monitor.tick();

        let report = monitor.tick();
        assert_eq!(report.kind, ReportKind::UpdateFailed);
        assert!(report.text.contains(FETCH_FAILED));
        assert!(!monitor.should_exit());

        // The baseline from before the failure is still used.
        let report = monitor.tick();
        assert_eq!(report.rows, vec![row(1, 300)]);
    }

    #[test]
    fn test_reset_returns_to_bootstrap() {
        let frames = vec![
            Frame::new(1_000).thread(t(1, 100).stack(&["run", "main"])),
            Frame::new(2_000).thread(t(1, 200).stack(&["run", "main"])),
            Frame::new(3_000).thread(t(1, 300).stack(&["run", "main"])),
            Frame::new(4_000).thread(t(1, 400).stack(&["run", "main"])),
        ];
        let mut monitor = ThreadMonitor::new(ScriptedSource::new(frames), config(DetailMode::Cpu));
        monitor.tick();
        assert_eq!(monitor.tick().kind, ReportKind::Table);

        monitor.reset();
        monitor.reset();
        assert!(monitor.history().is_empty());

        let report = monitor.tick();
        assert_eq!(report.kind, ReportKind::Collecting);
        assert!(report.rows.is_empty());
        // The one-time notice is shown again, as on a fresh monitor.
        assert!(report.text.contains(" ARGS: "));
        assert_eq!(monitor.history().cpu_total[&1], 300);

        // Diagnostics bypass the history.
        assert_eq!(monitor.render_stack(1), " 1:worker-1\n\tat run\n\tat main\n");
        assert_eq!(monitor.render_stack(99), " TID not exist:99\n");
        assert_eq!(monitor.render_all_threads(), " 1\t:worker-1\n");

        assert_eq!(monitor.tick().rows, vec![row(1, 100)]);
    }

    #[test]
    fn test_notice_shown_once() {
        let frames = vec![Frame::new(1_000), Frame::new(2_000)];
        let mut monitor = ThreadMonitor::new(ScriptedSource::new(frames), config(DetailMode::Cpu));
        // No threads: the baseline stays empty and the monitor keeps collecting.
        assert!(monitor.tick().text.contains(" ARGS: "));
        let report = monitor.tick();
        assert_eq!(report.kind, ReportKind::Collecting);
        assert!(!report.text.contains(" ARGS: "));
    }

    #[test]
    fn test_config_changes_apply_next_tick() {
        let frames = vec![
            Frame::new(1_000).thread(t(1, 100)).thread(t(2, 50)),
            Frame::new(2_000).thread(t(1, 200)).thread(t(2, 350)),
            Frame::new(3_000).thread(t(1, 300)).thread(t(2, 650)),
        ];
        let config = config(DetailMode::Cpu);
        let mut monitor = ThreadMonitor::new(ScriptedSource::new(frames), Arc::clone(&config));
        monitor.tick();
        let report = monitor.tick();
        assert_eq!(report.rows, vec![row(2, 300), row(1, 100)]);

        config.set_mode(DetailMode::TotalCpu);
        config.set_limit(1).unwrap();
        let report = monitor.tick();
        assert_eq!(report.rows, vec![row(2, 650)]);
        assert!(report.text.contains("order by TOTALCPU"));
    }

    #[test]
    fn test_interval_change_restores_floor() {
        let frames = vec![
            Frame::new(1_000).thread(t(1, 0)),
            Frame::new(2_000).thread(t(1, 500_000)),
        ];
        let config = config(DetailMode::Cpu);
        let mut monitor = ThreadMonitor::new(ScriptedSource::new(frames), Arc::clone(&config));
        monitor.tick();
        // 1ms floor: a 0.5ms delta is noise.
        config.set_interval(1).unwrap();
        let report = monitor.tick();
        assert!(report.rows.is_empty());
        assert!(report.text.contains("0 threads have min value"));
        assert!(report.text.contains("flush every 1s"));
    }

    #[test]
    fn test_ties_rank_by_id() {
        let frames = vec![
            Frame::new(1_000).thread(t(5, 0)).thread(t(3, 0)).thread(t(4, 0)),
            Frame::new(2_000).thread(t(5, 10)).thread(t(3, 10)).thread(t(4, 10)),
        ];
        let mut monitor = ThreadMonitor::new(ScriptedSource::new(frames), config(DetailMode::Cpu));
        monitor.tick();
        assert_eq!(monitor.tick().rows, vec![row(3, 10), row(4, 10), row(5, 10)]);
    }

    #[test]
    fn test_sys_mode_clamps_torn_reads() {
        let frames = vec![
            Frame::new(1_000).thread(ScriptedThread::new(1, "a").cpu(1_000, 200)),
            // user read after total: sys appears to shrink.
            Frame::new(2_000).thread(ScriptedThread::new(1, "a").cpu(1_100, 1_150)),
        ];
        let mut monitor =
            ThreadMonitor::new(ScriptedSource::new(frames), config(DetailMode::SysCpu));
        monitor.tick();
        let report = monitor.tick();
        assert_eq!(report.kind, ReportKind::Table);
        // A zero delta never passes the floor.
        assert!(report.rows.is_empty());
        assert!(report.text.contains("sys= 0.00%"));
    }

    #[test]
    fn test_capability_gap_skips_table() {
        let caps = Capabilities {
            thread_cpu_time: true,
            ..Capabilities::default()
        };
        let source = ScriptedSource::new(two_ticks()).with_capabilities(caps);
        let config = config(DetailMode::Memory);
        let mut monitor = ThreadMonitor::new(source, Arc::clone(&config));

        let report = monitor.tick();
        assert_eq!(report.kind, ReportKind::CapabilityGap);
        assert!(report.text.contains(MEMORY_GAP));
        assert!(!report.text.contains(CPU_GAP));

        // CPU baseline was still captured.
        config.set_mode(DetailMode::Cpu);
        assert_eq!(monitor.tick().kind, ReportKind::Table);
    }

    #[test]
    fn test_zero_elapsed_gives_zero_percentages() {
        let frames = vec![
            Frame::new(1_000).thread(t(1, 0)),
            Frame::new(1_000).thread(t(1, 5_000_000)),
        ];
        let mut monitor = ThreadMonitor::new(ScriptedSource::new(frames), config(DetailMode::Cpu));
        monitor.tick();
        let report = monitor.tick();
        assert_eq!(report.rows, vec![row(1, 5_000_000)]);
        assert!(report.text.contains("Total cpu:  0.00%(user= 0.00%, sys= 0.00%)"));
    }

    #[test]
    fn test_process_header_counts_new_threads() {
        let frames = vec![
            Frame::new(1_000).thread(t(1, 0)),
            Frame::new(2_000)
                .process_cpu(500_000_000)
                .thread(t(1, 0))
                .thread(t(2, 0))
                .thread(t(3, 0)),
        ];
        let source = ScriptedSource::new(frames).with_processors(2);
        let mut monitor = ThreadMonitor::new(source, config(DetailMode::Cpu));
        let report = monitor.tick();
        assert!(report.text.starts_with(" PID: 1 - "));
        assert!(report.text.contains(", 1 thread, 0 new"));

        let report = monitor.tick();
        assert!(report.text.contains(" PROCESS: 50.00% cpu(25.00% of 2 core), 3 thread, 2 new"));
    }

    #[test]
    fn test_total_sys_cpu_shares_of_process_time() {
        let frames = vec![
            Frame::new(1_000)
                .process_cpu(4_000)
                .thread(ScriptedThread::new(1, "worker-1").cpu(1_000, 600))
                .thread(ScriptedThread::new(2, "worker-2").cpu(2_000, 1_900)),
            Frame::new(2_000)
                .process_cpu(10_000)
                .thread(ScriptedThread::new(1, "worker-1").cpu(2_000, 1_000))
                .thread(
                    ScriptedThread::new(2, "worker-2")
                        .cpu(3_000, 2_500)
                        .state(ThreadState::Sleeping),
                ),
        ];
        let mut monitor =
            ThreadMonitor::new(ScriptedSource::new(frames), config(DetailMode::TotalSysCpu));
        assert_eq!(monitor.tick().kind, ReportKind::Collecting);

        let report = monitor.tick();
        assert_eq!(report.kind, ReportKind::Table);
        // Cumulative sys time: 2000-1000 and 3000-2500.
        assert_eq!(report.rows, vec![row(1, 1_000), row(2, 500)]);
        // TOTAL and TOLSYS are shares of the process CPU time (10000ns).
        assert!(report.text.contains("   RUNNING  0.00%  0.00% 20.00% 10.00%"));
        assert!(report.text.contains("  SLEEPING  0.00%  0.00% 30.00%  5.00%"));
        assert!(report.text.contains("2 threads have min value"));
        assert!(report.text.contains("order by TOTALSYSCPU"));
    }

    #[test]
    fn test_total_memory_shares_of_grand_total() {
        const MIB: u64 = 1024 * 1024;
        let frames = vec![
            Frame::new(1_000)
                .thread(ScriptedThread::new(3, "alloc-3"))
                .thread(ScriptedThread::new(4, "alloc-4"))
                .thread(ScriptedThread::new(5, "idle-5").allocated(4 * MIB)),
            Frame::new(2_000)
                .thread(ScriptedThread::new(3, "alloc-3").allocated(3 * MIB))
                .thread(
                    ScriptedThread::new(4, "alloc-4")
                        .allocated(MIB)
                        .state(ThreadState::Sleeping),
                )
                .thread(ScriptedThread::new(5, "idle-5").allocated(4 * MIB)),
        ];
        let mut monitor =
            ThreadMonitor::new(ScriptedSource::new(frames), config(DetailMode::TotalMemory));
        assert_eq!(monitor.tick().kind, ReportKind::Collecting);

        let report = monitor.tick();
        assert_eq!(report.kind, ReportKind::Table);
        assert_eq!(report.rows, vec![row(5, 4 * MIB), row(3, 3 * MIB), row(4, MIB)]);
        // Rate shares are of the 4M allocated this interval; totals are of all 8M.
        assert!(report.text.contains("   RUNNING    0B/s( 0.00%)       4.0M(50.00%)"));
        assert!(report.text.contains("   RUNNING  3.0M/s(75.00%)       3.0M(37.50%)"));
        assert!(report.text.contains("  SLEEPING  1.0M/s(25.00%)       1.0M(12.50%)"));
        assert!(report.text.contains("Total memory allocate:  4.0M/s, 3 threads have min value"));
        assert!(report.text.contains("order by TOTALMEMORY"));
    }

    /// Serves `inner`, except that `path` stops being readable after
    /// `reads_left` reads, like a thread exiting between two counter reads.
    struct ExitingTaskFs {
        inner: MockFs,
        path: PathBuf,
        reads_left: AtomicUsize,
    }

    impl FileSystem for ExitingTaskFs {
        fn read_to_string(&self, path: &Path) -> io::Result<String> {
            if path == self.path {
                let left = self.reads_left.load(Ordering::SeqCst);
                if left == 0 {
                    return Err(io::Error::new(io::ErrorKind::NotFound, "task exited"));
                }
                self.reads_left.store(left - 1, Ordering::SeqCst);
            }
            self.inner.read_to_string(path)
        }

        fn exists(&self, path: &Path) -> bool {
            self.inner.exists(path)
        }

        fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
            self.inner.read_dir(path)
        }
    }

    #[test]
    fn test_thread_exiting_between_reads_is_not_sys_time() {
        let mut inner = MockFs::new();
        inner.add_file("/proc/uptime", "1000.00 3000.00\n");
        inner.add_process(500, &stat_line(500, "server", 'S', 100_120, 40, 2, 0), "server\0");
        inner.add_thread(500, 500, &stat_line(500, "server", 'S', 120, 30, 2, 0));
        inner.add_thread(500, 501, &stat_line(501, "busy", 'R', 100_000, 10, 2, 0));
        // Tick 1 reads 501 twice (total, user); tick 2 only gets the total.
        let fs = ExitingTaskFs {
            inner,
            path: PathBuf::from("/proc/500/task/501/stat"),
            reads_left: AtomicUsize::new(3),
        };
        let source = ProcfsSource::new(fs, "/proc", 500);
        let mut monitor = ThreadMonitor::new(source, config(DetailMode::SysCpu));
        assert_eq!(monitor.tick().kind, ReportKind::Collecting);
        assert!(monitor.history().cpu_sys.contains_key(&501));

        let report = monitor.tick();
        assert_eq!(report.kind, ReportKind::Table);
        assert!(report.rows.is_empty());
        assert!(report.text.contains("0 threads have min value"));
        assert!(!monitor.history().cpu_sys.contains_key(&501));
        assert!(!monitor.history().cpu_total.contains_key(&501));
        assert!(monitor.history().cpu_sys.contains_key(&500));
    }

    #[test]
    fn test_command_hints_appended() {
        let config = config(DetailMode::Cpu);
        config.set_command_hints(true);
        let mut monitor = ThreadMonitor::new(ScriptedSource::new(two_ticks()), config);
        assert!(monitor.tick().text.ends_with(" Input command (h for help):"));
    }
}
