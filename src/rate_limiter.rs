//! Token bucket limiting requests to the analysis provider

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Token bucket shared by all fetch tasks of a run
pub struct RateLimiter {
    state: Mutex<BucketState>,
    requests_per_minute: u32,
}

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl RateLimiter {
    /// Create a limiter with a full bucket
    pub fn new(requests_per_minute: u32) -> Self {
        let requests_per_minute = requests_per_minute.max(1);
        Self {
            state: Mutex::new(BucketState {
                tokens: f64::from(requests_per_minute),
                last_refill: Instant::now(),
            }),
            requests_per_minute,
        }
    }

    fn tokens_per_second(&self) -> f64 {
        f64::from(self.requests_per_minute) / 60.0
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens =
            (state.tokens + elapsed * self.tokens_per_second()).min(f64::from(self.requests_per_minute));
        state.last_refill = now;
    }

    /// Wait until a request may be sent
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                self.refill(&mut state);

                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    return;
                }

                Duration::from_secs_f64((1.0 - state.tokens) / self.tokens_per_second())
            };

            tokio::time::sleep(wait).await;
        }
    }
}
