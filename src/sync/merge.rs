use crate::models::Counters;

/// What the user sees: authoritative counters with unsent taps layered on top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayCounters {
    pub daily: u64,
    pub total: u64,
    pub daily_target: u64,
    pub final_target: u64,
    pub pending: u64,
}

impl DisplayCounters {
    pub fn daily_progress(&self) -> f64 {
        progress(self.daily, self.daily_target)
    }

    pub fn total_progress(&self) -> f64 {
        progress(self.total, self.final_target)
    }

    pub fn is_synced(&self) -> bool {
        self.pending == 0
    }
}

/// Assumes `counters` already reflect today's rollover.
pub fn merge(counters: &Counters, pending: u64) -> DisplayCounters {
    DisplayCounters {
        daily: counters.daily_count.saturating_add(pending),
        total: counters.total_count.saturating_add(pending),
        daily_target: counters.daily_target,
        final_target: counters.final_target,
        pending,
    }
}

/// Percentage of `target` reached, clamped to `[0, 100]`.
pub fn progress(count: u64, target: u64) -> f64 {
    if target == 0 {
        return 0.0;
    }
    (count as f64 / target as f64 * 100.0).clamp(0.0, 100.0)
}
