use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::{GuardError, Result};
use crate::clock::Clock;
use crate::lock::table::parse_expiration;
use crate::store::Store;

pub const DEFAULT_STAMP_KEY_PREFIX: &str = "slot_gate:task_requested:";

/// Whoever a task was served to.
///
/// The stamp key uses the most specific identity available: an external
/// uid, else the user id, else the client ip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Contributor {
    pub user_id: Option<String>,
    pub user_ip: Option<String>,
    pub external_uid: Option<String>,
}

impl Contributor {
    pub fn user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Self::default()
        }
    }

    pub fn anonymous(user_ip: impl Into<String>) -> Self {
        Self {
            user_ip: Some(user_ip.into()),
            ..Self::default()
        }
    }

    fn scope(&self) -> Result<&str> {
        [&self.external_uid, &self.user_id, &self.user_ip]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|id| !id.is_empty())
            .ok_or(GuardError::AnonymousContributor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardSettings {
    pub key_prefix: String,
    pub stamp_ttl: Duration,
}

impl Default for GuardSettings {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_STAMP_KEY_PREFIX.to_string(),
            stamp_ttl: Duration::from_secs(60 * 60),
        }
    }
}

pub struct ContributionsGuard<S> {
    store: S,
    clock: Arc<dyn Clock>,
    settings: GuardSettings,
}

impl<S: Store> ContributionsGuard<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>, settings: GuardSettings) -> Self {
        Self {
            store,
            clock,
            settings,
        }
    }

    fn key(&self, task_id: &str, contributor: &Contributor) -> Result<String> {
        Ok(format!(
            "{}user:{}:task:{}",
            self.settings.key_prefix,
            contributor.scope()?,
            task_id
        ))
    }

    /// Record that `task_id` was served to `contributor` now.
    pub async fn stamp(&self, task_id: &str, contributor: &Contributor) -> Result<()> {
        let key = self.key(task_id, contributor)?;
        let now = self.clock.now();
        self.store
            .set_ex(&key, &now.to_string(), self.settings.stamp_ttl)
            .await?;
        debug!(task_id, %key, "task stamped");
        Ok(())
    }

    pub async fn check_task_stamped(&self, task_id: &str, contributor: &Contributor) -> Result<bool> {
        let key = self.key(task_id, contributor)?;
        Ok(self.store.get(&key).await?.is_some())
    }

    /// When the task was served, in seconds since the epoch.
    pub async fn retrieve_timestamp(
        &self,
        task_id: &str,
        contributor: &Contributor,
    ) -> Result<Option<f64>> {
        let key = self.key(task_id, contributor)?;
        Ok(self
            .store
            .get(&key)
            .await?
            .and_then(|raw| parse_expiration(&raw)))
    }

    /// Drop the stamp. Returns true if one existed.
    pub async fn remove_stamp(&self, task_id: &str, contributor: &Contributor) -> Result<bool> {
        let key = self.key(task_id, contributor)?;
        Ok(self.store.del(&key).await?)
    }
}
