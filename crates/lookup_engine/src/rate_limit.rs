//! Job-wide request spacing.
//!
//! One limiter is shared by every worker of a job. It bounds load on the
//! remote service independently of the worker count: a request may only be
//! issued once `spacing` has elapsed since the previous request was issued
//! (not since it completed).

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

#[derive(Debug)]
pub struct RateLimiter {
    spacing: Duration,
    last_issue: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(spacing: Duration) -> Self {
        Self {
            spacing,
            last_issue: Mutex::new(None),
        }
    }

    pub fn spacing(&self) -> Duration {
        self.spacing
    }

    /// Waits for permission to issue one request and returns the issue time.
    pub async fn acquire(&self) -> Instant {
        match self.acquire_for(|| Some(())).await {
            Some(((), issued)) => issued,
            None => Instant::now(),
        }
    }

    /// Claims the next unit of work and the slot to issue it in, as one step.
    ///
    /// `take` runs under the clock lock before any waiting. If it yields
    /// nothing the call returns at once and no slot is consumed, so callers
    /// that find no work never hold up the ones behind them. Tokio's mutex is
    /// fair: waiters are served in arrival order and each one observes the
    /// issue time of its predecessor. Dropping the future during the wait
    /// gives up the slot; whatever `take` returned is dropped with it.
    pub async fn acquire_for<T>(&self, take: impl FnOnce() -> Option<T>) -> Option<(T, Instant)> {
        let mut last_issue = self.last_issue.lock().await;
        let work = take()?;
        if let Some(previous) = *last_issue {
            sleep_until(previous + self.spacing).await;
        }
        let now = Instant::now();
        *last_issue = Some(now);
        Some((work, now))
    }
}
