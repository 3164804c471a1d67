use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::table::{format_expiration, parse_expiration, parse_table, reap};
use super::{LockError, Result};
use crate::clock::Clock;
use crate::store::Store;

/// Timing knobs for [`ResourceLockManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockSettings {
    /// How long a slot stays held if never released.
    pub duration: Duration,
    /// How long a released slot keeps counting as held.
    pub release_grace: Duration,
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(600),
            release_grace: Duration::from_secs(5),
        }
    }
}

/// Grants up to `limit` concurrent holders per resource.
///
/// Each resource is a hash in the store, keyed by the resource id, mapping
/// `client_id -> expiration timestamp`. Nothing is held in memory.
///
/// `acquire` reads, counts and writes in separate store calls, so callers
/// racing for the last slot of a resource can each be granted it. The
/// overshoot is bounded by the number of concurrent racers.
pub struct ResourceLockManager<S> {
    store: S,
    clock: Arc<dyn Clock>,
    settings: LockSettings,
}

impl<S: Store> ResourceLockManager<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>, settings: LockSettings) -> Self {
        Self {
            store,
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> &LockSettings {
        &self.settings
    }

    /// Try once to take a slot on `resource_id` for `client_id`.
    ///
    /// Returns `Ok(true)` if the client holds a slot afterwards (a current
    /// holder just has its expiry refreshed), `Ok(false)` if the resource is
    /// full. A `limit` of zero always denies.
    pub async fn acquire(&self, resource_id: &str, client_id: &str, limit: usize) -> Result<bool> {
        validate(resource_id, client_id)?;
        if limit == 0 {
            debug!(resource_id, client_id, "lock denied: zero limit");
            return Ok(false);
        }

        let now = self.clock.now();
        let live = reap(&self.store, resource_id, now).await?;
        let expiration = now + self.settings.duration.as_secs_f64();

        if live.contains_key(client_id) {
            self.grant(resource_id, client_id, expiration).await?;
            debug!(resource_id, client_id, "lock refreshed");
            return Ok(true);
        }

        if live.len() < limit {
            self.grant(resource_id, client_id, expiration).await?;
            debug!(
                resource_id,
                client_id,
                holders = live.len() + 1,
                limit,
                "lock granted"
            );
            return Ok(true);
        }

        debug!(
            resource_id,
            client_id,
            holders = live.len(),
            limit,
            "lock denied"
        );
        Ok(false)
    }

    /// True only if the client's entry exists and has not expired yet,
    /// whether or not it has been reaped.
    pub async fn has_lock(&self, resource_id: &str, client_id: &str) -> Result<bool> {
        validate(resource_id, client_id)?;
        let now = self.clock.now();
        let held = self
            .store
            .hget(resource_id, client_id)
            .await?
            .and_then(|raw| parse_expiration(&raw))
            .is_some_and(|at| at > now);
        Ok(held)
    }

    /// Let the slot lapse after the release grace period.
    ///
    /// The entry is not deleted: a concurrent `acquire` that already counted
    /// this holder must not see the slot freed under it.
    pub async fn release(&self, resource_id: &str, client_id: &str) -> Result<()> {
        validate(resource_id, client_id)?;
        let expiration = self.clock.now() + self.settings.release_grace.as_secs_f64();
        self.store
            .hset(resource_id, client_id, &format_expiration(expiration))
            .await?;
        debug!(resource_id, client_id, "lock released");
        Ok(())
    }

    /// Every entry of the resource, expired or not.
    pub async fn list_holders(&self, resource_id: &str) -> Result<HashMap<String, f64>> {
        validate_resource(resource_id)?;
        let raw = self.store.hgetall(resource_id).await?;
        Ok(parse_table(resource_id, raw))
    }

    async fn grant(&self, resource_id: &str, client_id: &str, expiration: f64) -> Result<()> {
        self.store
            .hset(resource_id, client_id, &format_expiration(expiration))
            .await?;
        self.store
            .expire(resource_id, self.settings.duration)
            .await?;
        Ok(())
    }
}

pub(crate) fn validate_resource(resource_id: &str) -> Result<()> {
    if resource_id.is_empty() {
        return Err(LockError::InvalidInput("resource id must not be empty"));
    }
    Ok(())
}

fn validate(resource_id: &str, client_id: &str) -> Result<()> {
    validate_resource(resource_id)?;
    if client_id.is_empty() {
        return Err(LockError::InvalidInput("client id must not be empty"));
    }
    Ok(())
}
