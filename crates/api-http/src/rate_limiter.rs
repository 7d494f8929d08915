//! Admission Rate Limiter (Token Bucket)
//!
//! Bounds how fast new video jobs can be started. Tokens refill continuously
//! at `refill_per_sec` up to `burst`; each admitted request spends one.

use std::sync::Mutex;
use tokio::time::Instant;

pub struct RateLimiter {
    burst: f64,
    refill_per_sec: f64,
    bucket: Mutex<Bucket>,
}

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl Bucket {
    fn refill(&mut self, burst: f64, refill_per_sec: f64) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * refill_per_sec).min(burst);
        self.last_refill = now;
    }
}

impl RateLimiter {
    /// `RateLimiter::new(20, 5)` admits a burst of 20, then 5 per second
    pub fn new(burst: u32, refill_per_sec: u32) -> Self {
        let burst = f64::from(burst.max(1));
        Self {
            burst,
            refill_per_sec: f64::from(refill_per_sec),
            bucket: Mutex::new(Bucket {
                tokens: burst,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Spend one token; false when the bucket is empty
    pub fn try_acquire(&self) -> bool {
        let mut bucket = match self.bucket.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        bucket.refill(self.burst, self.refill_per_sec);

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Whole tokens currently available
    pub fn remaining(&self) -> u32 {
        let mut bucket = match self.bucket.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        bucket.refill(self.burst, self.refill_per_sec);
        bucket.tokens.floor() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_burst_then_deny() {
        let limiter = RateLimiter::new(3, 1);

        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
        assert_eq!(limiter.remaining(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refills_over_time_up_to_burst() {
        let limiter = RateLimiter::new(2, 4);
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());

        tokio::time::advance(Duration::from_millis(250)).await;
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());

        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(limiter.remaining(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_rate_never_refills() {
        let limiter = RateLimiter::new(1, 0);
        assert!(limiter.try_acquire());

        tokio::time::advance(Duration::from_secs(3600)).await;
        assert!(!limiter.try_acquire());
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_one_bucket() {
        let limiter = Arc::new(RateLimiter::new(50, 0));

        let mut handles = Vec::new();
        for _ in 0..10 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move {
                (0..20).filter(|_| limiter.try_acquire()).count()
            }));
        }

        let mut allowed = 0;
        for handle in handles {
            allowed += handle.await.unwrap();
        }
        assert_eq!(allowed, 50);
    }
}
