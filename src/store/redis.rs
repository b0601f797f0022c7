//! Redis connection management

use crate::error::{CacheError, Result};
use crate::store::RemoteStore;
use ::redis::aio::ConnectionManager;
use ::redis::{AsyncCommands, Client};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};

/// Redis-backed [`RemoteStore`]
///
/// Holds one multiplexed [`ConnectionManager`]; every command works on a
/// clone of it, so no connection outlives a call.
#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
    url: String,
}

impl RedisStore {
    /// Connect and verify the server answers
    ///
    /// # Example
    /// ```no_run
    /// use sparql_cache::store::RedisStore;
    ///
    /// #[tokio::main]
    /// async fn main() -> anyhow::Result<()> {
    ///     let store = RedisStore::connect("redis://127.0.0.1:6379").await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn connect(url: &str) -> Result<Self> {
        info!("Connecting to Redis at {}", url);

        let client = Client::open(url).map_err(|e| CacheError::ConfigError(e.to_string()))?;
        let manager = ConnectionManager::new(client).await?;
        let store = Self {
            manager,
            url: url.to_string(),
        };

        if !store.health_check().await? {
            return Err(CacheError::BackendUnavailable(format!(
                "Redis at {} answered PING unexpectedly",
                url
            )));
        }

        info!("Successfully connected to Redis");
        Ok(store)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn connection(&self) -> ConnectionManager {
        self.manager.clone()
    }
}

#[async_trait]
impl RemoteStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.connection();
        match ttl {
            Some(ttl) => {
                let _: () = conn.set_ex(key, value, ttl.as_secs().max(1)).await?;
            }
            None => {
                let _: () = conn.set(key, value).await?;
            }
        }
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.connection();
        let removed: u64 = conn.del(keys.to_vec()).await?;
        Ok(removed)
    }

    async fn add_to_set(&self, set: &str, member: &str) -> Result<()> {
        let mut conn = self.connection();
        let _: () = conn.sadd(set, member).await?;
        Ok(())
    }

    async fn remove_from_set(&self, set: &str, members: &[String]) -> Result<u64> {
        if members.is_empty() {
            return Ok(0);
        }
        let mut conn = self.connection();
        let removed: u64 = conn.srem(set, members.to_vec()).await?;
        Ok(removed)
    }

    async fn set_members(&self, set: &str) -> Result<Vec<String>> {
        let mut conn = self.connection();
        let members: Vec<String> = conn.smembers(set).await?;
        Ok(members)
    }

    async fn health_check(&self) -> Result<bool> {
        debug!("Executing Redis health check (PING)");
        let mut conn = self.connection();
        let pong: String = ::redis::cmd("PING").query_async(&mut conn).await?;
        Ok(pong == "PONG")
    }

    fn provider_name(&self) -> &'static str {
        "redis"
    }
}
