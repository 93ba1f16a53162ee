pub mod rate_limit;

pub use rate_limit::{
    Clock, ConnectionRateLimiter, InMemoryRateLimitStore, ManualClock, RateDecision,
    RateLimitStore, SystemClock,
};
