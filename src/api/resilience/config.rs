//! Retry policy configuration.

use std::time::Duration;

/// Bounded linear-backoff retry policy for the request executor.
///
/// Defaults follow the documented behavior: up to 3 retries after the
/// initial attempt, waiting 1s, 2s, 3s between attempts. Whether a given
/// request retries at all is decided per request, not here.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryConfig {
    /// Delay before the retry that follows `completed_attempts` attempts:
    /// base, 2x base, 3x base, ...
    pub fn delay_after(&self, completed_attempts: u32) -> Duration {
        self.base_delay * (completed_attempts + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_matches_documented_backoff() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.delay_after(0), Duration::from_millis(1000));
        assert_eq!(config.delay_after(1), Duration::from_millis(2000));
        assert_eq!(config.delay_after(2), Duration::from_millis(3000));
    }
}
