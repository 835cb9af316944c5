//! Upstream rate budgeting.
//!
//! Adapter calls run on a bounded budget sized to the upstream's limits; a
//! denied acquisition surfaces as the recommended wait, which the adapter
//! boundary then absorbs into an empty result.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// In-memory rate budget for one upstream.
#[derive(Clone)]
pub struct ThrottlingQueue {
    limiter: Arc<DirectRateLimiter>,
    refill_hint: Duration,
}

impl ThrottlingQueue {
    pub fn new(quota_window: Duration, quota_limit: u32) -> Self {
        let limit = NonZeroU32::new(quota_limit.max(1)).expect("max(1) is non-zero");
        let replenish = quota_window
            .checked_div(limit.get())
            .unwrap_or(Duration::from_secs(1));
        let quota = Quota::with_period(replenish.max(Duration::from_millis(1)))
            .expect("period is non-zero")
            .allow_burst(limit);

        Self {
            limiter: Arc::new(RateLimiter::direct(quota)),
            refill_hint: replenish,
        }
    }

    /// Try to take one unit of budget; on denial returns how long to wait
    /// before the budget refills.
    pub fn acquire(&self) -> Result<(), Duration> {
        if self.limiter.check().is_ok() {
            Ok(())
        } else {
            Err(self.refill_hint)
        }
    }
}

impl std::fmt::Debug for ThrottlingQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThrottlingQueue")
            .field("refill_hint", &self.refill_hint)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_is_exhausted_after_the_quota_limit() {
        let queue = ThrottlingQueue::new(Duration::from_secs(60), 3);

        for _ in 0..3 {
            assert!(queue.acquire().is_ok());
        }
        let delay = queue.acquire().expect_err("fourth call must be denied");
        assert!(delay > Duration::ZERO);
    }
}
