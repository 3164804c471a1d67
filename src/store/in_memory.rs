//! InMemoryStore - HashMap-backed store for testing and development.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use super::{Result, Store, StoreError};
use crate::clock::{Clock, SystemClock};

enum Value {
    Hash(HashMap<String, String>),
    Text(String),
}

struct Entry {
    value: Value,
    /// Absolute expiry in seconds since the epoch.
    expires_at: Option<f64>,
}

/// In-memory store with Redis-like semantics.
///
/// Keys expire lazily: an expired key is dropped the next time any
/// operation touches it. Clone-friendly via Arc.
#[derive(Clone)]
pub struct InMemoryStore {
    storage: Arc<Mutex<HashMap<String, Entry>>>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Create an empty store driven by the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty store whose key expiry follows the given clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            storage: Arc::new(Mutex::new(HashMap::new())),
            clock,
        }
    }

    /// Number of live keys. Handy for asserting that structures expired.
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        self.storage
            .lock()
            .map(|storage| {
                storage
                    .values()
                    .filter(|e| e.expires_at.map_or(true, |at| at > now))
                    .count()
            })
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lock the map and drop `key` if it has expired.
    fn live(&self, key: &str) -> Result<(MutexGuard<'_, HashMap<String, Entry>>, f64)> {
        let now = self.clock.now();
        let mut storage = self
            .storage
            .lock()
            .map_err(|_| StoreError::Poisoned)?;
        let expired = storage
            .get(key)
            .and_then(|e| e.expires_at)
            .is_some_and(|at| at <= now);
        if expired {
            storage.remove(key);
        }
        Ok((storage, now))
    }
}

fn wrong_type(key: &str, expected: &'static str) -> StoreError {
    StoreError::WrongType {
        key: key.to_string(),
        expected,
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        let (storage, _) = self.live(key)?;
        match storage.get(key).map(|e| &e.value) {
            None => Ok(None),
            Some(Value::Hash(hash)) => Ok(hash.get(field).cloned()),
            Some(Value::Text(_)) => Err(wrong_type(key, "hash")),
        }
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<()> {
        let (mut storage, _) = self.live(key)?;
        let entry = storage.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::Hash(HashMap::new()),
            expires_at: None,
        });
        match &mut entry.value {
            Value::Hash(hash) => {
                hash.insert(field.to_string(), value.to_string());
                Ok(())
            }
            Value::Text(_) => Err(wrong_type(key, "hash")),
        }
    }

    async fn hdel(&self, key: &str, fields: &[String]) -> Result<usize> {
        let (mut storage, _) = self.live(key)?;
        let (removed, now_empty) = match storage.get_mut(key).map(|e| &mut e.value) {
            None => return Ok(0),
            Some(Value::Hash(hash)) => {
                let removed = fields.iter().filter(|f| hash.remove(*f).is_some()).count();
                (removed, hash.is_empty())
            }
            Some(Value::Text(_)) => return Err(wrong_type(key, "hash")),
        };
        // Redis drops a hash once its last field is gone.
        if now_empty {
            storage.remove(key);
        }
        Ok(removed)
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>> {
        let (storage, _) = self.live(key)?;
        match storage.get(key).map(|e| &e.value) {
            None => Ok(HashMap::new()),
            Some(Value::Hash(hash)) => Ok(hash.clone()),
            Some(Value::Text(_)) => Err(wrong_type(key, "hash")),
        }
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        let (mut storage, now) = self.live(key)?;
        if let Some(entry) = storage.get_mut(key) {
            entry.expires_at = Some(now + ttl.as_secs_f64());
        }
        Ok(())
    }

    async fn incr_expire_at(&self, key: &str, expire_at: u64) -> Result<u64> {
        let (mut storage, _) = self.live(key)?;
        let entry = storage.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::Text("0".into()),
            expires_at: None,
        });
        let next = match &entry.value {
            Value::Text(text) => text
                .parse::<u64>()
                .map_err(|_| wrong_type(key, "integer"))?
                + 1,
            Value::Hash(_) => return Err(wrong_type(key, "integer")),
        };
        entry.value = Value::Text(next.to_string());
        entry.expires_at = Some(expire_at as f64);
        Ok(next)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let (mut storage, now) = self.live(key)?;
        storage.insert(
            key.to_string(),
            Entry {
                value: Value::Text(value.to_string()),
                expires_at: Some(now + ttl.as_secs_f64()),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let (storage, _) = self.live(key)?;
        match storage.get(key).map(|e| &e.value) {
            None => Ok(None),
            Some(Value::Text(text)) => Ok(Some(text.clone())),
            Some(Value::Hash(_)) => Err(wrong_type(key, "string")),
        }
    }

    async fn del(&self, key: &str) -> Result<bool> {
        let (mut storage, _) = self.live(key)?;
        Ok(storage.remove(key).is_some())
    }
}
