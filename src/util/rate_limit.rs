//! Per-connection inbound message rate limiting

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;

/// Rate limiter type alias
pub type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Inbound message budget for one connection
pub struct ConnectionRateLimiter {
    limiter: Limiter,
}

impl ConnectionRateLimiter {
    pub fn new(messages_per_second: u32) -> Self {
        let quota = Quota::per_second(NonZeroU32::new(messages_per_second).unwrap_or(NonZeroU32::MIN));
        Self {
            limiter: RateLimiter::direct(quota),
        }
    }

    /// Returns true if the message may be processed
    pub fn check(&self) -> bool {
        self.limiter.check().is_ok()
    }
}
