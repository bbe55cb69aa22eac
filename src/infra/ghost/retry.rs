use std::{num::NonZeroU32, time::Duration};

/// Statuses worth another attempt: rate limiting and transient server faults.
pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);
const MAX_BACKOFF_SHIFT: u32 = 16;

pub fn is_retryable_status(status: u16) -> bool {
    RETRYABLE_STATUSES.contains(&status)
}

/// Bounded exponential backoff: `base`, `2 * base`, `4 * base`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: NonZeroU32,
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: NonZeroU32::new(DEFAULT_MAX_ATTEMPTS).unwrap_or(NonZeroU32::MIN),
            backoff_base: DEFAULT_BACKOFF_BASE,
        }
    }
}

impl From<&crate::config::FetchSettings> for RetryPolicy {
    fn from(settings: &crate::config::FetchSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts,
            backoff_base: settings.backoff_base,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(MAX_BACKOFF_SHIFT);
        self.backoff_base.saturating_mul(1 << shift)
    }

    pub fn allows_another(&self, attempt: u32) -> bool {
        attempt < self.max_attempts.get()
    }

    /// Sum of every delay a request exhausting all attempts will sleep through.
    pub fn total_backoff(&self) -> Duration {
        (1..self.max_attempts.get())
            .map(|attempt| self.delay_after(attempt))
            .fold(Duration::ZERO, Duration::saturating_add)
    }
}
