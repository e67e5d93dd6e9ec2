use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

#[derive(Debug, thiserror::Error)]
#[error("places rate limit exceeded ({rps}/s): try again in ~{}ms", .retry_after.as_millis())]
pub struct RateLimited {
    pub rps: u32,
    pub retry_after: Duration,
}

/// Token bucket in front of places provider calls.
#[derive(Clone)]
pub struct RateLimiter {
    rps: u32,
    bucket: Arc<Mutex<Bucket>>,
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last: Instant,
}

impl RateLimiter {
    pub fn new(rps: u32) -> Option<Self> {
        if rps == 0 {
            return None;
        }
        Some(Self {
            rps,
            bucket: Arc::new(Mutex::new(Bucket {
                tokens: rps as f64,
                last: Instant::now(),
            })),
        })
    }

    /// `PLACES_RATE_LIMIT_RPS`; unset, unparsable, or zero disables limiting.
    pub fn from_env() -> Option<Self> {
        let rps = std::env::var("PLACES_RATE_LIMIT_RPS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())?;
        Self::new(rps)
    }

    /// Take `cost` tokens or report how long until they would be available.
    ///
    /// A discovery run costs one token per sub-search.
    pub async fn acquire(&self, cost: u32) -> Result<(), RateLimited> {
        let capacity = self.rps as f64;
        let cost = (cost as f64).min(capacity);

        let mut bucket = self.bucket.lock().await;
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last);
        bucket.last = now;
        bucket.tokens = (bucket.tokens + elapsed.as_secs_f64() * capacity).min(capacity);

        if bucket.tokens >= cost {
            bucket.tokens -= cost;
            return Ok(());
        }

        Err(RateLimited {
            rps: self.rps,
            retry_after: Duration::from_secs_f64((cost - bucket.tokens) / capacity),
        })
    }
}
