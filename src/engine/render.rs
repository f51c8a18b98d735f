//! Fixed-width text report.
//!
//! The renderer only formats: every number it prints is computed by the
//! monitor or by the helpers at the top of this module. Each method appends
//! whole lines to a `Vec<String>`; [`finish`] joins them into the report text.

use crossterm::style::{Color, Stylize, style};

use crate::collector::{Capabilities, ThreadId, ThreadInfo, ThreadState};
use crate::engine::config::TickSettings;
use crate::engine::filter::NANOS_PER_MILLI;
use crate::engine::warning::{Severity, Threshold, WarningThresholds};
use crate::fmt::{format_bytes, format_uptime, left_str, short_name};

/// Name characters kept at the end when eliding, per table.
const CPU_NAME_TAIL: usize = 20;
const MEMORY_NAME_TAIL: usize = 12;
const STATE_WIDTH: usize = 10;

pub const COLLECTING: &str = " Collecting data, please wait ......";
pub const FETCH_FAILED: &str = " ERROR: Could not fetch data - Process terminated?";
pub const ATTACH_FAILED: &str = " ERROR: Could not attach to process.";
pub const CPU_GAP: &str =
    " -Thread CPU telemetries are not available on the monitored process/platform-";
pub const MEMORY_GAP: &str =
    " -Thread Memory Allocated telemetries are not available on the monitored process/platform-";
pub const COMMAND_HINTS: &str = " Input command (h for help):";

// ============================================================
// Arithmetic
// ============================================================

/// Share of one core used during the interval, in percent.
pub fn thread_cpu_utilization(delta_nanos: Option<u64>, elapsed_millis: u64) -> f64 {
    match delta_nanos {
        Some(delta) if elapsed_millis > 0 => {
            delta as f64 * 100.0 / NANOS_PER_MILLI as f64 / elapsed_millis as f64
        }
        _ => 0.0,
    }
}

/// `part * 100 / total`, or 0 when either side is missing.
pub fn share_percent(part: Option<u64>, total: u64) -> f64 {
    match part {
        Some(part) if total > 0 => part as f64 * 100.0 / total as f64,
        _ => 0.0,
    }
}

/// CPU load of a set of deltas, clamped to what `processors` cores can do.
pub fn aggregate_load(sum_nanos: u64, elapsed_millis: u64, processors: u32) -> f64 {
    let load = thread_cpu_utilization(Some(sum_nanos), elapsed_millis);
    load.clamp(0.0, 100.0 * processors.max(1) as f64)
}

/// Bytes per second over the interval.
pub fn rate_per_second(bytes: u64, elapsed_millis: u64) -> u64 {
    if elapsed_millis == 0 {
        return 0;
    }
    (bytes as u128 * 1000 / elapsed_millis as u128) as u64
}

// ============================================================
// Rows
// ============================================================

/// Process-wide lines shown above every table.
#[derive(Debug, Clone)]
pub struct ProcessSummary {
    pub pid: u32,
    /// Wall clock, `HH:MM:SS`.
    pub clock: String,
    pub uptime_millis: u64,
    pub single_core_load: f64,
    pub load: f64,
    pub processors: u32,
    pub threads: u32,
    pub new_threads: u64,
}

#[derive(Debug, Clone)]
pub struct CpuRow {
    pub id: ThreadId,
    pub name: String,
    pub state: ThreadState,
    pub cpu: f64,
    pub sys: f64,
    pub total_share: f64,
    pub sys_share: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct CpuSummary {
    pub load: f64,
    pub sys_load: f64,
    pub threads_with_value: usize,
}

#[derive(Debug, Clone)]
pub struct MemoryRow {
    pub id: ThreadId,
    pub name: String,
    pub state: ThreadState,
    pub bytes_per_sec: u64,
    pub rate_share: f64,
    pub total_bytes: u64,
    pub total_share: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct MemorySummary {
    pub bytes_per_sec: u64,
    pub threads_with_value: usize,
}

// ============================================================
// Renderer
// ============================================================

#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn paint(&self, text: String, severity: Severity) -> String {
        if !self.color {
            return text;
        }
        match severity {
            Severity::Normal => text,
            Severity::Warning => style(text).with(Color::Yellow).to_string(),
            Severity::Critical => style(text).with(Color::Red).to_string(),
        }
    }

    fn paint_value(&self, text: String, value: f64, threshold: &Threshold) -> String {
        self.paint(text, threshold.severity(value))
    }

    pub fn process_header(
        &self,
        lines: &mut Vec<String>,
        summary: &ProcessSummary,
        warning: &WarningThresholds,
    ) {
        lines.push(format!(
            " PID: {} - {} UPTIME: {}",
            summary.pid,
            summary.clock,
            format_uptime(summary.uptime_millis)
        ));
        let load = self.paint_value(format!("{:5.2}%", summary.load), summary.load, &warning.cpu);
        let threads = self.paint_value(
            summary.threads.to_string(),
            summary.threads as f64,
            &warning.thread,
        );
        let new_threads = self.paint_value(
            summary.new_threads.to_string(),
            summary.new_threads as f64,
            &warning.new_thread,
        );
        lines.push(format!(
            " PROCESS: {:5.2}% cpu({} of {} core), {} thread, {} new",
            summary.single_core_load, load, summary.processors, threads, new_threads
        ));
    }

    /// One-time notice: missing capabilities and launch arguments.
    pub fn welcome(
        &self,
        lines: &mut Vec<String>,
        pid: u32,
        capabilities: &Capabilities,
        command_line: &str,
    ) {
        let mut gap = |text: String| {
            lines.push(String::new());
            lines.push(text);
        };
        if !capabilities.thread_cpu_time {
            gap(" Thread CPU time isn't supported, CPU modes will be skipped.".to_string());
        }
        if !capabilities.thread_allocated_bytes {
            gap(" Thread allocation counters aren't supported, MEMORY modes will be skipped."
                .to_string());
        }
        if !capabilities.extended_os_metrics {
            gap(" Extended OS metrics aren't available.".to_string());
        }
        if !capabilities.io_counters {
            gap(format!(" Process I/O counters aren't readable (/proc/{}/io).", pid));
        }
        if !capabilities.perf_counters {
            gap(" Perf counters aren't supported.".to_string());
        }
        lines.push(String::new());
        lines.push(format!(" ARGS: {}", command_line));
    }

    pub fn collecting(&self, lines: &mut Vec<String>) {
        lines.push(String::new());
        lines.push(COLLECTING.to_string());
        lines.push(String::new());
    }

    pub fn capability_gap(&self, lines: &mut Vec<String>, cpu: bool) {
        lines.push(String::new());
        lines.push(if cpu { CPU_GAP } else { MEMORY_GAP }.to_string());
    }

    pub fn cpu_table(
        &self,
        lines: &mut Vec<String>,
        settings: &TickSettings,
        rows: &[CpuRow],
        summary: &CpuSummary,
    ) {
        let nw = settings.name_width();
        lines.push(String::new());
        lines.push(format!(
            " {:>6} {:<nw$} {:>10} {:>6} {:>6} {:>6} {:>6}",
            "TID", "NAME  ", "STATE", "CPU", "SYSCPU", " TOTAL", "TOLSYS"
        ));
        for row in rows {
            let cpu = self.paint_value(format!("{:5.2}%", row.cpu), row.cpu, &settings.warning.cpu);
            let sys = self.paint_value(
                format!("{:5.2}%", row.sys),
                row.sys,
                &settings.warning.syscpu,
            );
            lines.push(format!(
                " {:>6} {:<nw$} {:>10} {} {} {:5.2}% {:5.2}%",
                row.id,
                short_name(&row.name, nw, CPU_NAME_TAIL),
                left_str(row.state.as_str(), STATE_WIDTH),
                cpu,
                sys,
                row.total_share,
                row.sys_share,
            ));
        }
        let user_load = (summary.load - summary.sys_load).max(0.0);
        lines.push(String::new());
        lines.push(format!(
            " Total cpu: {:5.2}%(user={:5.2}%, sys={:5.2}%), {} threads have min value",
            summary.load, user_load, summary.sys_load, summary.threads_with_value
        ));
        self.settings_line(lines, settings);
    }

    pub fn memory_table(
        &self,
        lines: &mut Vec<String>,
        settings: &TickSettings,
        rows: &[MemoryRow],
        summary: &MemorySummary,
    ) {
        let nw = settings.name_width();
        lines.push(String::new());
        lines.push(format!(
            " {:>6} {:<nw$} {:>10} {:>14} {:>18}",
            "TID", "NAME  ", "STATE", "MEMORY", "TOTAL-ALLOCATED"
        ));
        for row in rows {
            lines.push(format!(
                " {:>6} {:<nw$} {:>10} {:>5}/s({:5.2}%) {:>10}({:5.2}%)",
                row.id,
                short_name(&row.name, nw, MEMORY_NAME_TAIL),
                left_str(row.state.as_str(), STATE_WIDTH),
                format_bytes(row.bytes_per_sec),
                row.rate_share,
                format_bytes(row.total_bytes),
                row.total_share,
            ));
        }
        lines.push(String::new());
        lines.push(format!(
            " Total memory allocate: {:>5}/s, {} threads have min value",
            format_bytes(summary.bytes_per_sec),
            summary.threads_with_value
        ));
        self.settings_line(lines, settings);
    }

    fn settings_line(&self, lines: &mut Vec<String>, settings: &TickSettings) {
        lines.push(format!(
            " Setting  : top {} threads order by {}, flush every {}s",
            settings.limit, settings.mode, settings.interval_secs
        ));
    }

    pub fn stack(&self, lines: &mut Vec<String>, tid: ThreadId, info: Option<&ThreadInfo>) {
        match info {
            Some(info) => {
                lines.push(format!(" {}:{}", info.id, info.name));
                lines.extend(info.stack.iter().map(|frame| format!("\tat {}", frame)));
            }
            None => lines.push(format!(" TID not exist:{}", tid)),
        }
    }

    pub fn thread_list(&self, lines: &mut Vec<String>, threads: &[ThreadInfo]) {
        lines.extend(
            threads
                .iter()
                .map(|info| format!(" {}\t:{}", info.id, info.name)),
        );
    }
}

/// Joins rendered lines; with `command_hints` the prompt is left open at the end.
pub fn finish(lines: Vec<String>, command_hints: bool) -> String {
    let mut text = lines.join("\n");
    text.push('\n');
    if command_hints {
        text.push_str(COMMAND_HINTS);
    }
    text
}
