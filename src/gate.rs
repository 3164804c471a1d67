//! Gate - every component wired to one store, one clock and one config.

use std::sync::Arc;
use std::time::Duration;

use crate::clock::Clock;
use crate::config::Config;
use crate::guard::ContributionsGuard;
use crate::lock::{ActiveHolderRegistry, ResourceLockManager};
use crate::ratelimit::RateLimiter;
use crate::store::Store;

/// The lock manager, presence registry, contributions guard and rate
/// limiter, all sharing one store handle.
pub struct Gate<S> {
    pub locks: ResourceLockManager<S>,
    pub presence: ActiveHolderRegistry<S>,
    pub guard: ContributionsGuard<S>,
    limiter: Arc<RateLimiter<S>>,
    active_holder_ttl: Duration,
}

impl<S: Store + Clone> Gate<S> {
    pub fn with_store(store: S, clock: Arc<dyn Clock>, config: &Config) -> Self {
        Self {
            locks: ResourceLockManager::new(store.clone(), clock.clone(), config.lock_settings()),
            presence: ActiveHolderRegistry::new(
                store.clone(),
                clock.clone(),
                config.active_key_prefix.clone(),
            ),
            guard: ContributionsGuard::new(store.clone(), clock.clone(), config.guard_settings()),
            limiter: Arc::new(RateLimiter::new(store, clock, config.rate_limit_settings())),
            active_holder_ttl: config.active_holder_ttl(),
        }
    }

    pub fn rate_limiter(&self) -> &RateLimiter<S> {
        &self.limiter
    }

    /// TTL to use for presence heartbeats.
    pub fn active_holder_ttl(&self) -> Duration {
        self.active_holder_ttl
    }
}

#[cfg(feature = "http")]
impl<S: Store + Clone + 'static> Gate<S> {
    /// Middleware state sharing this gate's limiter.
    pub fn rate_limit_gate(&self, config: &Config) -> crate::ratelimit::RateLimitGate<S> {
        crate::ratelimit::RateLimitGate::shared(self.limiter.clone(), config.gate_policy())
    }
}

/// Middleware state for an optional gate: without a store, requests pass
/// through unthrottled.
#[cfg(feature = "http")]
pub fn rate_limit_gate<S: Store + Clone + 'static>(
    gate: Option<&Gate<S>>,
    config: &Config,
) -> crate::ratelimit::RateLimitGate<S> {
    match gate {
        Some(gate) => gate.rate_limit_gate(config),
        None => crate::ratelimit::RateLimitGate::disabled(config.gate_policy()),
    }
}

#[cfg(feature = "redis")]
impl Gate<crate::store::RedisStore> {
    /// Connect to the configured Redis. Returns `Ok(None)` when no URL is set.
    pub async fn connect(config: &Config) -> crate::store::Result<Option<Self>> {
        let Some(url) = config.redis_url.as_deref() else {
            tracing::warn!("no store configured, gate not connected");
            return Ok(None);
        };
        let store = crate::store::RedisStore::connect(url).await?;
        Ok(Some(Self::with_store(
            store,
            Arc::new(crate::clock::SystemClock),
            config,
        )))
    }
}
