//! Global post-exit cooldown.

/// Tracks the trading-day index of the most recent exit across every
/// instrument in a run. One tracker per run; never shared.
#[derive(Debug, Clone, Default)]
pub struct CooldownTracker {
    cooldown_days: usize,
    last_exit: Option<usize>,
}

impl CooldownTracker {
    pub fn new(cooldown_days: usize) -> Self {
        Self {
            cooldown_days,
            last_exit: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.cooldown_days > 0
    }

    pub fn last_exit(&self) -> Option<usize> {
        self.last_exit
    }

    /// Record an exit at trading-day `index`. The latest exit wins when exits
    /// are recorded out of order. No-op when cooldown is disabled.
    pub fn record_exit(&mut self, index: usize) {
        if !self.is_enabled() {
            return;
        }
        self.last_exit = Some(self.last_exit.map_or(index, |prev| prev.max(index)));
    }

    /// Whether entries at trading-day `current` are blocked.
    ///
    /// An exit at index `i` blocks `i + 1 ..= i + cooldown_days`. Days at or
    /// before an exit that has already been recorded are blocked too, since
    /// the distance there is not positive.
    pub fn is_blocked(&self, current: usize) -> bool {
        let Some(last) = self.last_exit else {
            return false;
        };
        if !self.is_enabled() {
            return false;
        }
        let distance = current as i64 - last as i64;
        distance <= self.cooldown_days as i64
    }
}
