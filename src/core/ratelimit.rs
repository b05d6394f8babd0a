//! Pacing for calls to the shared upstream rate service.
//!
//! The limiter enforces a minimum spacing between dispatches and allows at
//! most one upstream call in flight at a time. It is a fairness/throughput
//! control, not a retry policy: callers still succeed or fail on their own.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;
use tracing::debug;

pub struct RateLimiter {
    min_interval: Duration,
    // Timestamp of the most recent dispatch. The owned guard doubles as the
    // in-flight permit: waiters queue on the mutex in FIFO order.
    last_dispatch: Arc<Mutex<Option<Instant>>>,
}

/// Held for the duration of one upstream call. Dropping it admits the next
/// queued caller.
pub struct RateLimitPermit {
    _guard: OwnedMutexGuard<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        RateLimiter {
            min_interval,
            last_dispatch: Arc::new(Mutex::new(None)),
        }
    }

    /// A limiter with no spacing, for tests. Calls are still serialized.
    pub fn unthrottled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Waits for our turn and for the minimum spacing to elapse, then marks
    /// the dispatch time. The returned permit must be held across the
    /// upstream call.
    pub async fn acquire(&self) -> RateLimitPermit {
        let mut guard = Arc::clone(&self.last_dispatch).lock_owned().await;
        if let Some(last) = *guard {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                debug!("Rate limiter delaying dispatch by {wait:?}");
                tokio::time::sleep(wait).await;
            }
        }
        *guard = Some(Instant::now());
        RateLimitPermit { _guard: guard }
    }
}
