//! The six ranking metrics.

use std::fmt;
use std::str::FromStr;

/// Metric the thread table is ordered by.
///
/// CPU modes share one table layout, memory modes the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetailMode {
    /// CPU time consumed during the last interval.
    Cpu,
    /// Kernel-mode CPU time consumed during the last interval.
    SysCpu,
    /// CPU time since thread start.
    TotalCpu,
    /// Kernel-mode CPU time since thread start.
    TotalSysCpu,
    /// Bytes allocated during the last interval.
    Memory,
    /// Bytes allocated since thread start.
    TotalMemory,
}

/// Error returned when a mode string is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMode(pub String);

impl fmt::Display for UnknownMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown mode '{}' (expected 1-6 or cpu, syscpu, totalcpu, totalsyscpu, memory, totalmemory)",
            self.0
        )
    }
}

impl std::error::Error for UnknownMode {}

impl DetailMode {
    /// All modes in menu order (`1`..`6`).
    pub const ALL: [DetailMode; 6] = [
        DetailMode::Cpu,
        DetailMode::SysCpu,
        DetailMode::TotalCpu,
        DetailMode::TotalSysCpu,
        DetailMode::Memory,
        DetailMode::TotalMemory,
    ];

    pub fn is_cpu(self) -> bool {
        !matches!(self, DetailMode::Memory | DetailMode::TotalMemory)
    }

    /// Lower-case name, also accepted by [`FromStr`].
    pub fn name(self) -> &'static str {
        match self {
            DetailMode::Cpu => "cpu",
            DetailMode::SysCpu => "syscpu",
            DetailMode::TotalCpu => "totalcpu",
            DetailMode::TotalSysCpu => "totalsyscpu",
            DetailMode::Memory => "memory",
            DetailMode::TotalMemory => "totalmemory",
        }
    }

    /// Position in [`DetailMode::ALL`], used as the atomic representation.
    pub(crate) fn index(self) -> u8 {
        match self {
            DetailMode::Cpu => 0,
            DetailMode::SysCpu => 1,
            DetailMode::TotalCpu => 2,
            DetailMode::TotalSysCpu => 3,
            DetailMode::Memory => 4,
            DetailMode::TotalMemory => 5,
        }
    }

    pub(crate) fn from_index(index: u8) -> Self {
        Self::ALL[index as usize % Self::ALL.len()]
    }
}

impl fmt::Display for DetailMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name().to_uppercase())
    }
}

impl FromStr for DetailMode {
    type Err = UnknownMode;

    /// Accepts the menu number (`"1"`..`"6"`) or the mode name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(n) = s.parse::<usize>() {
            return n
                .checked_sub(1)
                .and_then(|i| Self::ALL.get(i).copied())
                .ok_or_else(|| UnknownMode(s.to_string()));
        }
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownMode(s.to_string()))
    }
}
