//! Top-N selection over the active metric.

use std::collections::HashMap;

use crate::collector::ThreadId;
use crate::engine::filter::FilteredDeltas;
use crate::engine::mode::DetailMode;

/// Every rankable value of one tick.
///
/// Delta maps hold only values that passed the noise floor; cumulative maps
/// hold every thread sampled this tick.
#[derive(Debug, Clone, Default)]
pub struct MetricTables {
    pub cpu: FilteredDeltas,
    pub sys: FilteredDeltas,
    pub memory: FilteredDeltas,
    pub cpu_total: HashMap<ThreadId, u64>,
    pub sys_total: HashMap<ThreadId, u64>,
    pub memory_total: HashMap<ThreadId, u64>,
}

impl MetricTables {
    /// The map ranked by `mode`.
    pub fn select(&self, mode: DetailMode) -> &HashMap<ThreadId, u64> {
        match mode {
            DetailMode::Cpu => &self.cpu.values,
            DetailMode::SysCpu => &self.sys.values,
            DetailMode::TotalCpu => &self.cpu_total,
            DetailMode::TotalSysCpu => &self.sys_total,
            DetailMode::Memory => &self.memory.values,
            DetailMode::TotalMemory => &self.memory_total,
        }
    }
}

/// Highest `limit` entries by value; equal values order by ascending id.
pub fn top_threads(values: &HashMap<ThreadId, u64>, limit: usize) -> Vec<(ThreadId, u64)> {
    let mut ranked: Vec<(ThreadId, u64)> = values.iter().map(|(&id, &v)| (id, v)).collect();
    ranked.sort_unstable_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.truncate(limit);
    ranked
}
