use crate::error::AppError;
use dashmap::DashMap;
use std::time::Instant;

/// Per-endpoint budget: burst capacity and steady refill per second
#[derive(Clone, Copy)]
pub struct Limit {
    pub capacity: u32,
    pub refill_per_sec: f64,
}

/// Enqueue is the expensive path (journal write + match attempt)
pub const ENQUEUE: Limit = Limit {
    capacity: 10,
    refill_per_sec: 5.0,
};

/// Reads are cheap snapshots
pub const READ: Limit = Limit {
    capacity: 60,
    refill_per_sec: 30.0,
};

/// Manager lifecycle calls
pub const LIFECYCLE: Limit = Limit {
    capacity: 30,
    refill_per_sec: 15.0,
};

#[derive(Clone)]
struct Bucket {
    tokens: f64,
    last_update: Instant,
}

impl Bucket {
    fn allow(&mut self, limit: Limit) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();
        self.tokens = f64::min(
            limit.capacity as f64,
            self.tokens + elapsed * limit.refill_per_sec,
        );
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Token-bucket limiter keyed by "subject:endpoint"
pub struct RateLimiter {
    buckets: DashMap<String, Bucket>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            buckets: DashMap::new(),
        }
    }

    pub fn check(&self, subject: &str, endpoint: &str, limit: Limit) -> Result<(), AppError> {
        let key = format!("{}:{}", subject, endpoint);
        let mut bucket = self.buckets.entry(key).or_insert_with(|| Bucket {
            tokens: limit.capacity as f64,
            last_update: Instant::now(),
        });

        if bucket.allow(limit) {
            Ok(())
        } else {
            Err(AppError::RateLimitExceeded(format!(
                "Too many {} requests",
                endpoint
            )))
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_then_limited() {
        let limiter = RateLimiter::new();
        let tight = Limit {
            capacity: 3,
            refill_per_sec: 0.0,
        };
        for _ in 0..3 {
            assert!(limiter.check("alice", "enqueue", tight).is_ok());
        }
        assert!(matches!(
            limiter.check("alice", "enqueue", tight),
            Err(AppError::RateLimitExceeded(_))
        ));
        // Other subjects and endpoints have their own buckets
        assert!(limiter.check("bob", "enqueue", tight).is_ok());
        assert!(limiter.check("alice", "stats", tight).is_ok());
    }
}
