//! Named fixed-window rate-limit buckets.
//!
//! Keys are the session email when present, otherwise the client ip.
//! Exceeding a bucket returns 429 with the window's reset time in the
//! `X-RateLimit-Reset` header (Unix seconds, constant within a window).

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::error::AppError;

struct Bucket {
    window_started: Instant,
    reset_at: u64,
    count: u32,
}

impl Bucket {
    fn fresh(now: Instant, window: Duration) -> Self {
        let reset_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
            + window.as_secs();
        Self {
            window_started: now,
            reset_at,
            count: 0,
        }
    }
}

/// A single fixed-window limiter: at most `limit` requests per `window`
/// per key.
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Count a request against `key`. `Err` carries the window reset time.
    pub fn check(&self, key: &str) -> Result<(), AppError> {
        let mut buckets = self.buckets.lock().expect("rate limiter lock poisoned");
        let now = Instant::now();

        let bucket = buckets
            .entry(key.to_string())
            .or_insert_with(|| Bucket::fresh(now, self.window));
        if now.duration_since(bucket.window_started) >= self.window {
            *bucket = Bucket::fresh(now, self.window);
        }

        bucket.count += 1;
        if bucket.count > self.limit {
            Err(AppError::RateLimited {
                reset: bucket.reset_at,
            })
        } else {
            Ok(())
        }
    }
}

/// The service's named buckets.
pub struct RateLimits {
    /// Queue signups: 30 per 15 minutes per student.
    pub signup: RateLimiter,
    /// OAuth callback: 15 per 15 minutes, so a broken client cannot hammer
    /// the identity provider.
    pub oauth_callback: RateLimiter,
    /// Course and queue creation: 5 per minute.
    pub creation: RateLimiter,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            signup: RateLimiter::new(30, Duration::from_secs(15 * 60)),
            oauth_callback: RateLimiter::new(15, Duration::from_secs(15 * 60)),
            creation: RateLimiter::new(5, Duration::from_secs(60)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reset_of(err: AppError) -> u64 {
        match err {
            AppError::RateLimited { reset } => reset,
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[test]
    fn allows_up_to_the_limit_then_rejects() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        for _ in 0..3 {
            assert!(limiter.check("s@x.edu").is_ok());
        }
        assert!(limiter.check("s@x.edu").is_err());
    }

    #[test]
    fn keys_are_independent() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.check("a@x.edu").is_ok());
        assert!(limiter.check("b@x.edu").is_ok());
        assert!(limiter.check("a@x.edu").is_err());
    }

    #[test]
    fn reset_time_is_constant_within_a_window() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        limiter.check("s@x.edu").ok();
        let first = reset_of(limiter.check("s@x.edu").unwrap_err());
        let second = reset_of(limiter.check("s@x.edu").unwrap_err());
        assert_eq!(first, second);
    }

    #[test]
    fn window_expiry_admits_again() {
        let limiter = RateLimiter::new(1, Duration::from_millis(10));
        assert!(limiter.check("s@x.edu").is_ok());
        assert!(limiter.check("s@x.edu").is_err());

        std::thread::sleep(Duration::from_millis(20));
        assert!(limiter.check("s@x.edu").is_ok());
    }
}
