//! Noise floor applied to interval deltas.

use std::collections::HashMap;

use crate::collector::ThreadId;
use crate::engine::delta::DeltaRecord;

pub const NANOS_PER_MILLI: u64 = 1_000_000;
pub const BYTES_PER_KIB: u64 = 1024;

/// Minimum delta a thread must exceed to count for ranking and aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoiseFloor {
    pub cpu_nanos: u64,
    pub memory_bytes: u64,
}

impl NoiseFloor {
    /// Keeps every strictly positive delta.
    pub const NONE: NoiseFloor = NoiseFloor {
        cpu_nanos: 0,
        memory_bytes: 0,
    };

    /// One millisecond of CPU and one KiB of allocation per second of interval.
    pub fn for_interval(interval_secs: u64) -> Self {
        Self {
            cpu_nanos: interval_secs.saturating_mul(NANOS_PER_MILLI),
            memory_bytes: interval_secs.saturating_mul(BYTES_PER_KIB),
        }
    }
}

/// Deltas that passed the floor, with their sum.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilteredDeltas {
    pub values: HashMap<ThreadId, u64>,
    pub total: u64,
}

impl FilteredDeltas {
    pub fn get(&self, id: ThreadId) -> Option<u64> {
        self.values.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Keeps records whose delta is strictly greater than `min`.
pub fn retain_above(records: &[DeltaRecord], min: u64) -> FilteredDeltas {
    let mut filtered = FilteredDeltas::default();
    for r in records.iter().filter(|r| r.delta > min) {
        filtered.values.insert(r.id, r.delta);
        filtered.total = filtered.total.saturating_add(r.delta);
    }
    filtered
}
