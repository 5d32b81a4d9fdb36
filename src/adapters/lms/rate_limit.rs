//! Request budget for providers that publish one
//!
//! Schoology allows roughly 50 requests every 5 seconds per consumer key. The
//! limiter is a token bucket: a full burst is available immediately and tokens
//! refill evenly across the period.

use crate::config::SchoologyConfig;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use std::num::NonZeroU32;
use std::time::Duration;

/// Token bucket shared by every request of one client
pub struct RequestBudget {
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    requests: u32,
    period: Duration,
}

impl RequestBudget {
    /// Allow `requests` calls per `period`
    pub fn new(requests: u32, period: Duration) -> Self {
        let burst = NonZeroU32::new(requests).unwrap_or(nonzero!(1u32));
        let replenish = period / burst.get();
        let quota = Quota::with_period(replenish)
            .unwrap_or_else(|| Quota::per_second(burst))
            .allow_burst(burst);

        Self {
            limiter: RateLimiter::direct(quota),
            requests: burst.get(),
            period,
        }
    }

    /// Budget configured in the `[schoology]` section
    pub fn from_config(config: &SchoologyConfig) -> Self {
        Self::new(
            config.rate_limit_requests,
            Duration::from_secs(config.rate_limit_period_seconds),
        )
    }

    /// Wait until the next request is allowed
    pub async fn wait(&self) {
        self.limiter.until_ready().await;
    }

    pub fn requests(&self) -> u32 {
        self.requests
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl std::fmt::Debug for RequestBudget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestBudget")
            .field("requests", &self.requests)
            .field("period", &self.period)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_burst_is_immediate() {
        let budget = RequestBudget::new(50, Duration::from_secs(5));

        let start = Instant::now();
        for _ in 0..50 {
            budget.wait().await;
        }
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_exhausted_budget_waits() {
        let budget = RequestBudget::new(2, Duration::from_millis(400));

        let start = Instant::now();
        budget.wait().await;
        budget.wait().await;
        budget.wait().await;

        // third call waits for one replenish interval (200ms)
        assert!(start.elapsed() >= Duration::from_millis(150));
    }

    #[test]
    fn test_zero_requests_falls_back_to_one() {
        let budget = RequestBudget::new(0, Duration::from_secs(5));
        assert_eq!(budget.requests(), 1);
    }

    #[test]
    fn test_from_config_defaults() {
        let budget = RequestBudget::from_config(&SchoologyConfig::default());
        assert_eq!(budget.requests(), 50);
        assert_eq!(budget.period(), Duration::from_secs(5));
    }
}
