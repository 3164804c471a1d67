//! RedisStore - Store backed by a multiplexed Redis connection.

use std::collections::HashMap;
use std::time::Duration;

use ::redis::aio::ConnectionManager;
use ::redis::{cmd, pipe, Client};
use async_trait::async_trait;
use tracing::info;

use super::{Result, Store};

/// Redis-backed store.
///
/// Clone-friendly: every clone shares one auto-reconnecting multiplexed
/// connection, so components can each own a handle.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
}

impl RedisStore {
    /// Open a connection manager for the given URL (e.g. `redis://127.0.0.1/`).
    pub async fn connect(url: &str) -> Result<Self> {
        let client = Client::open(url)?;
        let connection = client.get_connection_manager().await?;
        info!("Connected to redis");
        Ok(Self { connection })
    }

    /// Wrap an existing connection manager.
    pub fn from_connection(connection: ConnectionManager) -> Self {
        Self { connection }
    }
}

fn whole_seconds(ttl: Duration) -> u64 {
    // EXPIRE/EX take integer seconds; never round a live TTL down to zero.
    ttl.as_secs_f64().ceil().max(1.0) as u64
}

#[async_trait]
impl Store for RedisStore {
    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        let mut conn = self.connection.clone();
        let value: Option<String> = cmd("HGET")
            .arg(key)
            .arg(field)
            .query_async(&mut conn)
            .await?;
        Ok(value)
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<()> {
        let mut conn = self.connection.clone();
        let _: i64 = cmd("HSET")
            .arg(key)
            .arg(field)
            .arg(value)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn hdel(&self, key: &str, fields: &[String]) -> Result<usize> {
        if fields.is_empty() {
            return Ok(0);
        }
        let mut conn = self.connection.clone();
        let mut command = cmd("HDEL");
        command.arg(key);
        for field in fields {
            command.arg(field);
        }
        let removed: usize = command.query_async(&mut conn).await?;
        Ok(removed)
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>> {
        let mut conn = self.connection.clone();
        let map: HashMap<String, String> =
            cmd("HGETALL").arg(key).query_async(&mut conn).await?;
        Ok(map)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.connection.clone();
        let _: i64 = cmd("EXPIRE")
            .arg(key)
            .arg(whole_seconds(ttl))
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn incr_expire_at(&self, key: &str, expire_at: u64) -> Result<u64> {
        let mut conn = self.connection.clone();
        // MULTI/EXEC so the counter can't be collected between INCR and EXPIREAT.
        let (count,): (u64,) = pipe()
            .atomic()
            .cmd("INCR")
            .arg(key)
            .cmd("EXPIREAT")
            .arg(key)
            .arg(expire_at)
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(count)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.connection.clone();
        let _: () = cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(whole_seconds(ttl))
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection.clone();
        let value: Option<String> = cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn del(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection.clone();
        let removed: usize = cmd("DEL").arg(key).query_async(&mut conn).await?;
        Ok(removed > 0)
    }
}
