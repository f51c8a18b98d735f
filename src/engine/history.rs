//! Previous tick's cumulative counters.

use std::collections::HashMap;

use crate::collector::ThreadId;
use crate::engine::delta::CounterSample;

/// Last seen cumulative value per thread, one map per metric family.
///
/// Never merged: the monitor builds the next history from the current tick
/// and swaps it in with [`replace`](Self::replace) once rendering is done.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleHistory {
    pub cpu_total: HashMap<ThreadId, u64>,
    pub cpu_sys: HashMap<ThreadId, u64>,
    pub memory_total: HashMap<ThreadId, u64>,
}

impl SampleHistory {
    /// Builds a history holding exactly the given samples.
    pub fn from_samples(samples: &[CounterSample]) -> Self {
        let mut history = Self::default();
        for s in samples {
            if let Some(cpu) = s.cpu {
                history.cpu_total.insert(s.id, cpu.total_nanos);
                history.cpu_sys.insert(s.id, s.cpu_sys_nanos());
            }
            if let Some(bytes) = s.memory_allocated_bytes {
                history.memory_total.insert(s.id, bytes);
            }
        }
        history
    }

    /// Publishes `next` as the new baseline. Ids missing from it are dropped.
    pub fn replace(&mut self, next: SampleHistory) {
        *self = next;
    }

    /// Forgets every baseline.
    pub fn reset(&mut self) {
        self.cpu_total.clear();
        self.cpu_sys.clear();
        self.memory_total.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.cpu_total.is_empty() && self.cpu_sys.is_empty() && self.memory_total.is_empty()
    }

    /// `true` if the family used by CPU (`cpu == true`) or memory modes has no baseline.
    pub fn family_is_empty(&self, cpu: bool) -> bool {
        if cpu {
            self.cpu_total.is_empty()
        } else {
            self.memory_total.is_empty()
        }
    }

    /// `true` if the thread was seen on the previous tick.
    pub fn contains(&self, id: ThreadId) -> bool {
        self.cpu_total.contains_key(&id) || self.memory_total.contains_key(&id)
    }
}
