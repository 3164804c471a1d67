//! Store - the shared key-value service every component coordinates through.
//!
//! The gate has no in-process coordination: all state lives in a remote
//! store that offers hashes, atomic increments and per-key expiration.
//! Each call is atomic on its own; a sequence of calls is not.
//!
//! ## Backends
//!
//! - [`InMemoryStore`]: process-local, expiry driven by an injected clock.
//!   Used for tests and development.
//! - [`RedisStore`] (feature `redis`): a multiplexed Redis connection.
//!
//! ```ignore
//! use slot_gate::{RedisStore, ResourceLockManager, LockSettings, SystemClock};
//!
//! let store = RedisStore::connect("redis://127.0.0.1/").await?;
//! let locks = ResourceLockManager::new(store, Arc::new(SystemClock), LockSettings::default());
//! ```

mod error;
mod in_memory;
#[cfg(feature = "redis")]
mod redis;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

pub use error::{Result, StoreError};
pub use in_memory::InMemoryStore;
#[cfg(feature = "redis")]
pub use self::redis::RedisStore;

/// Abstract client over the shared key-value service.
#[async_trait]
pub trait Store: Send + Sync {
    /// Read one field of a hash.
    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>>;

    /// Write one field of a hash, creating the hash if needed.
    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<()>;

    /// Delete fields of a hash. Returns how many existed.
    async fn hdel(&self, key: &str, fields: &[String]) -> Result<usize>;

    /// All fields and values of a hash. Missing key reads as empty.
    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>>;

    /// Set the key's own expiration, relative to now.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<()>;

    /// Increment an integer key and set its absolute expiry (seconds since
    /// the epoch) as one indivisible operation. Returns the new value.
    async fn incr_expire_at(&self, key: &str, expire_at: u64) -> Result<u64>;

    /// Set a string key with a time to live.
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Read a string key.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Delete a key. Returns true if it existed.
    async fn del(&self, key: &str) -> Result<bool>;
}
