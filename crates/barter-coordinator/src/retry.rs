use std::time::Duration;

use tokio::time::Instant;

use barter_core::{LOCK_RETRY_BACKOFF_MS, LOCK_RETRY_MAX_ATTEMPTS};

/// Backoff ledger for one trade's L2 lock step.
///
/// `attempts` counts daemon refusals; the fifth refusal triggers the
/// emergency-unlock branch, so the value stays within `1..=5` for the
/// entry's lifetime.
#[derive(Clone, Debug)]
pub struct RetryState {
    pub attempts: u32,
    pub next_attempt: Instant,
}

impl RetryState {
    pub fn new() -> Self {
        Self {
            attempts: 0,
            next_attempt: Instant::now(),
        }
    }

    /// True once the backoff window has elapsed.
    pub fn due(&self) -> bool {
        Instant::now() >= self.next_attempt
    }

    pub fn record_failure(&mut self) {
        self.attempts += 1;
        self.next_attempt = Instant::now() + Duration::from_millis(LOCK_RETRY_BACKOFF_MS);
    }

    /// True when the attempt budget is spent and only the emergency unlock
    /// remains.
    pub fn exhausted(&self) -> bool {
        self.attempts >= LOCK_RETRY_MAX_ATTEMPTS
    }
}

impl Default for RetryState {
    fn default() -> Self {
        Self::new()
    }
}
