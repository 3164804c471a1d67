use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use super::{RateLimitError, Result};
use crate::clock::Clock;
use crate::store::Store;

pub const DEFAULT_KEY_PREFIX: &str = "rate-limit/";

/// End boundary of the fixed window containing `now`.
///
/// Every request inside one window maps to the same id, so the id doubles
/// as the counter key suffix and as the reset time reported to clients.
pub fn window_id(now: f64, period: u64) -> u64 {
    let now = now.max(0.0) as u64;
    (now / period) * period + period
}

/// Outcome of one counted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimit {
    pub limit: u64,
    /// Requests counted in this window, capped at `limit`.
    pub current: u64,
    pub remaining: u64,
    /// Window end, seconds since the epoch.
    pub reset: u64,
}

impl RateLimit {
    fn new(count: u64, limit: u64, reset: u64) -> Self {
        let current = count.min(limit);
        Self {
            limit,
            current,
            remaining: limit - current,
            reset,
        }
    }

    /// Reached as soon as the count equals the limit.
    pub fn over_limit(&self) -> bool {
        self.current >= self.limit
    }
}

/// How many requests per period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub limit: u64,
    pub period: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            limit: 300,
            period: Duration::from_secs(15 * 60),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitSettings {
    pub key_prefix: String,
    /// How long a counter outlives its window.
    pub expiration_window: Duration,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            expiration_window: Duration::from_secs(10),
        }
    }
}

/// Fixed-window request counter, one store key per (endpoint, client, window).
pub struct RateLimiter<S> {
    store: S,
    clock: Arc<dyn Clock>,
    settings: RateLimitSettings,
}

impl<S: Store> RateLimiter<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>, settings: RateLimitSettings) -> Self {
        Self {
            store,
            clock,
            settings,
        }
    }

    pub fn key(&self, endpoint_key: &str, client_key: &str, window: u64) -> String {
        format!(
            "{}{}/{}/{}",
            self.settings.key_prefix, endpoint_key, client_key, window
        )
    }

    /// Count one request and report where the client stands.
    ///
    /// The increment and the counter's absolute expiry go to the store as
    /// one atomic operation.
    pub async fn check(
        &self,
        client_key: &str,
        endpoint_key: &str,
        limit: u64,
        period: Duration,
    ) -> Result<RateLimit> {
        let period = period.as_secs();
        if period == 0 {
            return Err(RateLimitError::InvalidPeriod);
        }

        let reset = window_id(self.clock.now(), period);
        let key = self.key(endpoint_key, client_key, reset);
        let expire_at = reset + self.settings.expiration_window.as_secs();
        let count = self.store.incr_expire_at(&key, expire_at).await?;

        let rate = RateLimit::new(count, limit, reset);
        debug!(
            endpoint_key,
            client_key,
            current = rate.current,
            remaining = rate.remaining,
            "rate limit checked"
        );
        Ok(rate)
    }

    /// Like [`check`](Self::check), but an exhausted window is an error.
    pub async fn enforce(
        &self,
        client_key: &str,
        endpoint_key: &str,
        policy: RateLimitPolicy,
    ) -> Result<RateLimit> {
        let rate = self
            .check(client_key, endpoint_key, policy.limit, policy.period)
            .await?;
        if rate.over_limit() {
            return Err(RateLimitError::TooManyRequests(rate));
        }
        Ok(rate)
    }
}
