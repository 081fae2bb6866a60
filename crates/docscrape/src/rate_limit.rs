//! Process-wide request rate limiting
//!
//! Every outbound fetch, whatever its host, passes through one shared
//! [`RateLimiter`]. The limiter admits one call per interval; callers that
//! arrive early are suspended in [`RateLimiter::acquire`] until the window
//! opens.
//!
//! Time is read through the [`Clock`] trait so tests can drive the limiter
//! without sleeping.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Source of time for the limiter
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current instant
    fn now(&self) -> Instant;

    /// Suspend the caller for `duration`
    async fn sleep(&self, duration: Duration);
}

/// Clock backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Fixed-rate gate shared by all fetches
///
/// Wrap in `Arc` to share between the crawl controller and any worker
/// tasks; the last-admission timestamp is guarded by an async mutex so
/// concurrent callers are admitted strictly one interval apart.
pub struct RateLimiter {
    interval: Duration,
    clock: Arc<dyn Clock>,
    last_admitted: Mutex<Option<Instant>>,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

impl RateLimiter {
    /// Admit at most `requests` calls per second
    ///
    /// Zero disables limiting.
    pub fn per_second(requests: u32) -> Self {
        Self::with_clock(requests, Arc::new(TokioClock))
    }

    /// Same as [`RateLimiter::per_second`] with an explicit clock
    pub fn with_clock(requests: u32, clock: Arc<dyn Clock>) -> Self {
        let interval = if requests == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs(1) / requests
        };
        Self {
            interval,
            clock,
            last_admitted: Mutex::new(None),
        }
    }

    /// Limiter that never waits
    pub fn disabled() -> Self {
        Self::per_second(0)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_disabled(&self) -> bool {
        self.interval.is_zero()
    }

    /// Wait until the next request may be issued
    ///
    /// The first call is admitted immediately.
    pub async fn acquire(&self) {
        if self.is_disabled() {
            return;
        }

        let mut last = self.last_admitted.lock().await;
        if let Some(previous) = *last {
            let elapsed = self.clock.now().saturating_duration_since(previous);
            if elapsed < self.interval {
                let delay = self.interval - elapsed;
                debug!(delay_ms = delay.as_millis() as u64, "rate limit delay");
                self.clock.sleep(delay).await;
            }
        }
        *last = Some(self.clock.now());
    }
}
