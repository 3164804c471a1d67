use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::manager::validate_resource;
use super::table::{format_expiration, reap};
use super::{LockError, Result};
use crate::clock::Clock;
use crate::store::Store;

pub const DEFAULT_ACTIVE_KEY_PREFIX: &str = "slot_gate:active_users_in_project:";

/// Advisory presence tracking: who is currently active on a resource.
///
/// Holders re-register periodically as a heartbeat. There is no limit and
/// no rejection; entries simply lapse when their TTL passes.
pub struct ActiveHolderRegistry<S> {
    store: S,
    clock: Arc<dyn Clock>,
    key_prefix: String,
}

impl<S: Store> ActiveHolderRegistry<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>, key_prefix: impl Into<String>) -> Self {
        Self {
            store,
            clock,
            key_prefix: key_prefix.into(),
        }
    }

    pub fn key(&self, resource_id: &str) -> String {
        format!("{}{}", self.key_prefix, resource_id)
    }

    /// Mark `holder_id` active on `resource_id` for the next `ttl`.
    ///
    /// The resource's whole hash also expires after `ttl`, so every holder of
    /// one resource should register with the same TTL: a short registration
    /// after a long one drops the long holder with the hash.
    pub async fn register(&self, resource_id: &str, holder_id: &str, ttl: Duration) -> Result<()> {
        validate_resource(resource_id)?;
        if holder_id.is_empty() {
            return Err(LockError::InvalidInput("holder id must not be empty"));
        }

        let key = self.key(resource_id);
        let expiration = self.clock.now() + ttl.as_secs_f64();
        self.store
            .hset(&key, holder_id, &format_expiration(expiration))
            .await?;
        self.store.expire(&key, ttl).await?;
        debug!(resource_id, holder_id, "holder registered");
        Ok(())
    }

    /// Number of holders whose TTL has not passed. Reaps the rest.
    pub async fn count(&self, resource_id: &str) -> Result<usize> {
        validate_resource(resource_id)?;
        let live = reap(&self.store, &self.key(resource_id), self.clock.now()).await?;
        Ok(live.len())
    }
}
