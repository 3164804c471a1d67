use thiserror::Error;

use super::RateLimit;
use crate::store::StoreError;

/// Error type for rate limit checks.
#[derive(Debug, Error)]
pub enum RateLimitError {
    /// Windows are whole seconds; a period under one second is rejected.
    #[error("invalid rate limit period: must be at least one second")]
    InvalidPeriod,

    /// The client used up its budget for the current window.
    #[error("too many requests: {} allowed per window, next window starts at {}", .0.limit, .0.reset)]
    TooManyRequests(RateLimit),

    /// The shared store failed; surfaced unchanged.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RateLimitError {
    /// Class name reported in the JSON error envelope.
    pub fn exception_cls(&self) -> &'static str {
        match self {
            RateLimitError::InvalidPeriod => "InvalidPeriod",
            RateLimitError::TooManyRequests(_) => "TooManyRequests",
            RateLimitError::Store(_) => "StoreError",
        }
    }
}

pub type Result<T> = std::result::Result<T, RateLimitError>;
