//! Ratelimit - fixed-window request counting over the shared store.
//!
//! Each (endpoint, client) pair gets one counter per window. The counter
//! key ends with the window's end boundary, so it rolls over on its own and
//! expires shortly after the window closes.
//!
//! ```ignore
//! let limiter = RateLimiter::new(store, Arc::new(SystemClock), RateLimitSettings::default());
//! let rate = limiter.check("203.0.113.9", "api.task", 300, Duration::from_secs(900)).await?;
//! if rate.over_limit() { /* reject */ }
//! ```
//!
//! With the `http` feature, [`RateLimitGate`] enforces this as an axum
//! middleware and reports `X-RateLimit-*` headers.

mod envelope;
mod error;
mod limiter;
#[cfg(feature = "http")]
mod middleware;

pub use envelope::ErrorEnvelope;
pub use error::{RateLimitError, Result};
pub use limiter::{
    window_id, RateLimit, RateLimitPolicy, RateLimitSettings, RateLimiter, DEFAULT_KEY_PREFIX,
};

#[cfg(feature = "http")]
pub use middleware::{
    enforce_rate_limit, rate_limited, GatePolicy, Identity, IpScope, RateLimitGate,
    X_RATELIMIT_LIMIT, X_RATELIMIT_REMAINING, X_RATELIMIT_RESET,
};
