//! Outbound call pacing.
//!
//! The pipeline asks a [`RateLimiter`] for a permit before every scoring
//! call. The default [`TokenBucket`] has capacity 1 and refills every
//! `pipeline.item_delay_ms`, which spaces scoring calls at least that far
//! apart. Other policies (burst allowances, per-source buckets) only need a
//! new implementation.

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::PipelineConfig;

#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Wait until a permit is available and consume it.
    async fn acquire(&self);
}

/// Never waits. Used when pacing is disabled (`item_delay_ms = 0`).
pub struct Unlimited;

#[async_trait]
impl RateLimiter for Unlimited {
    async fn acquire(&self) {}
}

struct BucketState {
    tokens: u32,
    last_refill: Instant,
}

/// Token bucket: up to `capacity` permits, one added every `refill_every`.
pub struct TokenBucket {
    capacity: u32,
    refill_every: Duration,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// A full bucket. `capacity` is raised to at least 1.
    pub fn new(capacity: u32, refill_every: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            refill_every,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    fn refill(&self, state: &mut BucketState, now: Instant) {
        if self.refill_every.is_zero() {
            state.tokens = self.capacity;
            state.last_refill = now;
            return;
        }
        let elapsed = now.saturating_duration_since(state.last_refill);
        let earned = (elapsed.as_nanos() / self.refill_every.as_nanos()) as u64;
        if earned == 0 {
            return;
        }
        let room = u64::from(self.capacity - state.tokens);
        state.tokens += earned.min(room) as u32;
        if state.tokens == self.capacity {
            state.last_refill = now;
        } else {
            state.last_refill += self.refill_every * earned as u32;
        }
    }
}

#[async_trait]
impl RateLimiter for TokenBucket {
    async fn acquire(&self) {
        // Holding the lock across the sleep queues waiters in FIFO order.
        let mut state = self.state.lock().await;
        self.refill(&mut state, Instant::now());

        if state.tokens == 0 {
            let ready_at = state.last_refill + self.refill_every;
            tokio::time::sleep_until(ready_at).await;
            self.refill(&mut state, Instant::now());
        }

        state.tokens = state.tokens.saturating_sub(1);
    }
}

/// The limiter described by the pipeline config.
pub fn from_config(config: &PipelineConfig) -> Box<dyn RateLimiter> {
    if config.item_delay_ms == 0 {
        Box::new(Unlimited)
    } else {
        Box::new(TokenBucket::new(1, Duration::from_millis(config.item_delay_ms)))
    }
}
