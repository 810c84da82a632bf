//! Request-rate cap shared by executor workers.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Spaces request starts at least `interval` apart across all workers.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    interval: Duration,
    next_slot: Arc<Mutex<Instant>>,
}

impl RateLimiter {
    /// `requests_per_second <= 0` disables the cap.
    pub fn per_second(requests_per_second: f64) -> Self {
        let interval = if requests_per_second > 0.0 {
            Duration::from_secs_f64(1.0 / requests_per_second)
        } else {
            Duration::ZERO
        };

        RateLimiter {
            interval,
            next_slot: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait for the next free slot.
    pub async fn acquire(&self) {
        if self.interval.is_zero() {
            return;
        }

        let slot = {
            let mut next = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = (*next).max(now);
            *next = slot + self.interval;
            slot
        };

        tokio::time::sleep_until(slot).await;
    }
}
