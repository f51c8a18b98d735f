//! Interval deltas from cumulative counters.
//!
//! CPU total and user time come from two separate reads, so `total - user`
//! can briefly go negative; derived sys time saturates at zero instead. A
//! regression of the total counters themselves (id reuse, a restarted
//! counter) produces no record for that thread this tick.

use crate::collector::ThreadId;
use crate::engine::history::SampleHistory;

/// Cumulative CPU time of one thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuTimes {
    pub total_nanos: u64,
    pub user_nanos: u64,
}

/// Cumulative counters of one thread at one tick. `None` marks a family the
/// source cannot provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterSample {
    pub id: ThreadId,
    pub cpu: Option<CpuTimes>,
    pub memory_allocated_bytes: Option<u64>,
}

impl CounterSample {
    /// Kernel-mode time, `max(0, total - user)`.
    pub fn cpu_sys_nanos(&self) -> u64 {
        self.cpu
            .map(|c| c.total_nanos.saturating_sub(c.user_nanos))
            .unwrap_or(0)
    }
}

/// Change of one counter over the last interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeltaRecord {
    pub id: ThreadId,
    pub delta: u64,
    /// Cumulative value at this tick.
    pub total: u64,
}

/// All deltas of one tick, in sample order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickDeltas {
    pub cpu: Vec<DeltaRecord>,
    pub sys: Vec<DeltaRecord>,
    pub memory: Vec<DeltaRecord>,
}

/// Computes deltas for ids present in both `samples` and `history`.
pub fn compute_deltas(samples: &[CounterSample], history: &SampleHistory) -> TickDeltas {
    let mut deltas = TickDeltas::default();
    for s in samples {
        if let Some(cpu) = s.cpu {
            if let Some(&prev) = history.cpu_total.get(&s.id) {
                if let Some(delta) = cpu.total_nanos.checked_sub(prev) {
                    deltas.cpu.push(DeltaRecord {
                        id: s.id,
                        delta,
                        total: cpu.total_nanos,
                    });
                }
            }
            if let Some(&prev) = history.cpu_sys.get(&s.id) {
                let sys = s.cpu_sys_nanos();
                deltas.sys.push(DeltaRecord {
                    id: s.id,
                    delta: sys.saturating_sub(prev),
                    total: sys,
                });
            }
        }
        if let (Some(bytes), Some(&prev)) =
            (s.memory_allocated_bytes, history.memory_total.get(&s.id))
        {
            if let Some(delta) = bytes.checked_sub(prev) {
                deltas.memory.push(DeltaRecord {
                    id: s.id,
                    delta,
                    total: bytes,
                });
            }
        }
    }
    deltas
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cpu(id: ThreadId, total: u64, user: u64) -> CounterSample {
        CounterSample {
            id,
            cpu: Some(CpuTimes {
                total_nanos: total,
                user_nanos: user,
            }),
            memory_allocated_bytes: None,
        }
    }

    fn mem(id: ThreadId, bytes: u64) -> CounterSample {
        CounterSample {
            id,
            cpu: None,
            memory_allocated_bytes: Some(bytes),
        }
    }

    #[test]
    fn test_empty_history_yields_nothing() {
        let d = compute_deltas(&[cpu(1, 100, 0)], &SampleHistory::default());
        assert_eq!(d, TickDeltas::default());
    }

    #[test]
    fn test_cpu_deltas() {
        let history = SampleHistory::from_samples(&[cpu(1, 100, 80), cpu(2, 50, 50)]);
        let d = compute_deltas(&[cpu(1, 220, 150), cpu(2, 90, 70), cpu(3, 10, 0)], &history);

        assert_eq!(
            d.cpu,
            vec![
                DeltaRecord {
                    id: 1,
                    delta: 120,
                    total: 220,
                },
                DeltaRecord {
                    id: 2,
                    delta: 40,
                    total: 90,
                },
            ]
        );
        // sys: thread 1 20 -> 70, thread 2 0 -> 20.
        assert_eq!(d.sys[0].delta, 50);
        assert_eq!(d.sys[1].delta, 20);
    }

    #[test]
    fn test_sys_delta_never_negative() {
        let history = SampleHistory::from_samples(&[cpu(1, 100, 40)]);
        // sys shrinks from 60 to 10 because of a torn read.
        let d = compute_deltas(&[cpu(1, 110, 100)], &history);
        assert_eq!(d.sys[0].delta, 0);
        assert_eq!(d.cpu[0].delta, 10);
    }

    #[test]
    fn test_regression_drops_record() {
        let history = SampleHistory::from_samples(&[cpu(1, 500, 0), mem(2, 4096)]);
        let d = compute_deltas(&[cpu(1, 20, 0), mem(2, 1024)], &history);
        assert!(d.cpu.is_empty());
        assert!(d.memory.is_empty());
    }

    #[test]
    fn test_memory_deltas() {
        let history = SampleHistory::from_samples(&[mem(3, 1000)]);
        let d = compute_deltas(&[mem(3, 3048)], &history);
        assert_eq!(
            d.memory,
            vec![DeltaRecord {
                id: 3,
                delta: 2048,
                total: 3048,
            }]
        );
        assert!(d.cpu.is_empty());
    }
}
