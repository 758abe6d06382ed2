//! Process-wide minimum-interval rate limiter.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Enforces a minimum delay between consecutive external dispatches.
///
/// Clones share the same timestamp, so every caller holding a clone is
/// throttled together. Waiters queue on the mutex and are released one
/// interval apart.
#[derive(Debug, Clone)]
pub struct MinIntervalRateLimiter {
    interval: Duration,
    last_dispatch: Arc<Mutex<Option<Instant>>>,
}

impl MinIntervalRateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_dispatch: Arc::new(Mutex::new(None)),
        }
    }

    pub fn from_millis(interval_ms: u64) -> Self {
        Self::new(Duration::from_millis(interval_ms))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until a dispatch is allowed, then claim the slot.
    pub async fn acquire(&self) {
        if self.interval.is_zero() {
            return;
        }

        let mut last = self.last_dispatch.lock().await;
        if let Some(previous) = *last {
            let ready_at = previous + self.interval;
            if Instant::now() < ready_at {
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_acquire_is_immediate() {
        let limiter = MinIntervalRateLimiter::from_millis(3_000);
        let start = Instant::now();
        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_consecutive_acquires_are_spaced() {
        let limiter = MinIntervalRateLimiter::from_millis(3_000);
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(6_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clones_share_the_slot() {
        let limiter = MinIntervalRateLimiter::from_millis(1_000);
        let other = limiter.clone();
        let start = Instant::now();
        limiter.acquire().await;
        other.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(1_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_disables_limiting() {
        let limiter = MinIntervalRateLimiter::from_millis(0);
        let start = Instant::now();
        for _ in 0..5 {
            limiter.acquire().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
