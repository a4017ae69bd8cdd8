use std::time::Duration;

/// Exponential reconnect policy for feed connections.
///
/// The delay before retry number `n` (0-indexed) is `min(base_delay * 2^n, max_delay)`.
/// `max_attempts` of `None` retries forever.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_attempts: Option<u32>,
}

impl ReconnectPolicy {
    pub fn new(base_delay: Duration, max_delay: Duration, max_attempts: Option<u32>) -> Self {
        Self { base_delay, max_delay, max_attempts }
    }

    /// Delay for a 0-indexed attempt, capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        2u32.checked_pow(attempt)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// Delay to wait after `failures` consecutive failed connections (1-indexed),
    /// or `None` once the ceiling is exhausted.
    pub fn next_delay(&self, failures: u32) -> Option<Duration> {
        if !self.allows_attempt(failures) {
            return None;
        }
        Some(self.delay_for_attempt(failures.saturating_sub(1)))
    }

    pub fn allows_attempt(&self, attempt: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempt <= max)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(30), None)
    }
}
