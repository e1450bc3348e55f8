use std::time::Duration;

use thiserror::Error;
use tokio::time::{Instant, sleep};

/// Bounded polling schedule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// Multiplier applied to the interval after every miss (1.0 = fixed).
    pub backoff: f64,
    pub max_interval: Duration,
    pub timeout: Duration,
}

impl PollPolicy {
    pub fn fixed(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            backoff: 1.0,
            max_interval: interval,
            timeout,
        }
    }

    pub fn with_backoff(mut self, factor: f64, max_interval: Duration) -> Self {
        self.backoff = factor.max(1.0);
        self.max_interval = max_interval.max(self.interval);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("condition not met after {attempts} attempts ({elapsed:?})")]
pub struct PollTimeout {
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Evaluate `predicate` until it holds or the policy's timeout passes.
///
/// The predicate is checked once immediately and once more at the deadline,
/// so a condition that becomes true during the last sleep is not missed.
pub async fn poll_until<F>(mut predicate: F, policy: PollPolicy) -> Result<u32, PollTimeout>
where
    F: FnMut() -> bool,
{
    let started = Instant::now();
    let deadline = started + policy.timeout;
    let mut interval = policy.interval;
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        if predicate() {
            return Ok(attempts);
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(PollTimeout {
                attempts,
                elapsed: now - started,
            });
        }

        sleep(interval.min(deadline - now)).await;
        interval = interval.mul_f64(policy.backoff).min(policy.max_interval);
    }
}
