use std::time::Duration;

/// Exponential backoff for failed cycles.
///
/// Delay starts at `base_delay_ms` and doubles on every consecutive failure until `max_delay_ms`.
#[derive(Debug, Clone)]
pub struct RetrySettings {
    pub base_delay_ms: u64,
    /// invariant: >= base_delay_ms
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            base_delay_ms: 30_000,
            max_delay_ms: 600_000,
        }
    }
}

impl RetrySettings {
    pub fn new(base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            base_delay_ms,
            max_delay_ms: max_delay_ms.max(base_delay_ms),
        }
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32);
        let delay = self
            .base_delay_ms
            .saturating_mul(1u64 << exponent)
            .min(self.max_delay_ms);
        Duration::from_millis(delay)
    }
}
