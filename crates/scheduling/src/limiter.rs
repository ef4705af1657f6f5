//! Rate limiter with token bucket
//!
//! Unlike a wall-clock limiter, refill is computed against an explicit
//! reference time supplied by the caller. The scheduler passes the
//! round's start time on every consultation, so admission decisions are
//! identical no matter how long the round itself takes to run.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct RateLimiter {
    rate_per_second: f64,
    burst: f64,
    available: f64,
    last_refill: Option<DateTime<Utc>>,
}

impl RateLimiter {
    /// A bucket holding up to `burst` tokens, refilled at
    /// `rate_per_second`. The bucket starts full.
    pub fn new(rate_per_second: f64, burst: u32) -> Self {
        Self {
            rate_per_second,
            burst: burst as f64,
            available: burst as f64,
            last_refill: None,
        }
    }

    pub fn rate_per_second(&self) -> f64 {
        self.rate_per_second
    }

    pub fn burst(&self) -> u32 {
        self.burst as u32
    }

    /// Tokens that would be available at `at`, without consuming any.
    pub fn tokens_at(&self, at: DateTime<Utc>) -> f64 {
        match self.last_refill {
            None => self.available,
            Some(last) => {
                let elapsed = (at - last).num_milliseconds().max(0) as f64 / 1000.0;
                (self.available + elapsed * self.rate_per_second).min(self.burst)
            }
        }
    }

    /// Whether `n` tokens could be taken at `at`.
    pub fn allows_at(&self, at: DateTime<Utc>, n: u32) -> bool {
        self.tokens_at(at) >= n as f64
    }

    /// Takes `n` tokens as of `at`. Returns false, taking nothing, if
    /// fewer than `n` tokens are available at that instant.
    pub fn try_acquire_at(&mut self, at: DateTime<Utc>, n: u32) -> bool {
        let tokens = self.tokens_at(at);
        if tokens < n as f64 {
            return false;
        }
        self.available = tokens - n as f64;
        self.last_refill = Some(at);
        true
    }
}
