//! CPU utilization sampling from `/proc/stat`.
//!
//! The engine records one sample at construction and one at shutdown, then
//! logs the busy percentage over its lifetime. On platforms without
//! `/proc/stat` the sample is simply absent and the report is skipped.

use std::fs;

/// Columns of the aggregate cpu line that participate in the total:
/// user, nice, system, idle, iowait, irq, softirq.
const PROC_STAT_COLUMNS: usize = 7;
/// Index of the idle column among those seven.
const PROC_STAT_IDLE_COLUMN: usize = 3;
const PROC_STAT_PATH: &str = "/proc/stat";

/// One sample of aggregate CPU time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuSample {
    total: u64,
    idle: u64,
}

impl CpuSample {
    /// Sample the aggregate cpu line.
    ///
    /// `None` where `/proc/stat` is unavailable or unparsable; utilization
    /// reporting degrades silently.
    #[must_use]
    pub fn now() -> Option<Self> {
        let stat = fs::read_to_string(PROC_STAT_PATH).ok()?;
        Self::parse(stat.lines().next()?)
    }

    /// Parse an aggregate `cpu  ...` line.
    fn parse(line: &str) -> Option<Self> {
        let mut fields = line.split_whitespace();
        if fields.next()? != "cpu" {
            return None;
        }

        let mut values = [0u64; PROC_STAT_COLUMNS];
        for slot in &mut values {
            *slot = fields.next()?.parse().ok()?;
        }

        Some(Self {
            total: values.iter().sum(),
            idle: values[PROC_STAT_IDLE_COLUMN],
        })
    }

    /// Busy percentage of the interval between `earlier` and this sample.
    ///
    /// `None` when no CPU time elapsed between the samples (or the samples
    /// are out of order).
    #[must_use]
    pub fn busy_percent_since(self, earlier: Self) -> Option<u8> {
        let total = self.total.checked_sub(earlier.total)?;
        let idle = self.idle.checked_sub(earlier.idle)?;
        if total == 0 {
            return None;
        }

        let idle_percent = u8::try_from(idle.saturating_mul(100) / total).unwrap_or(100);
        Some(100 - idle_percent.min(100))
    }
}
