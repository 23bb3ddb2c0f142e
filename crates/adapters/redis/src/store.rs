//! Redis 键值存储实现

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use stash_errors::{CacheError, CacheResult};
use stash_ports::KeyValueStore;

use crate::connection::{StoreConnection, map_redis_error};

/// Redis Store
pub struct RedisStore {
    connection: Arc<StoreConnection>,
}

impl RedisStore {
    pub fn new(connection: Arc<StoreConnection>) -> Self {
        Self { connection }
    }

    pub fn connection(&self) -> &Arc<StoreConnection> {
        &self.connection
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.connection.ensure_connected().await?;
        conn.get(key).await.map_err(|e| map_redis_error("get", e))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> CacheResult<()> {
        // SETEX 不接受 0 秒
        if ttl.is_some_and(|duration| duration.as_secs() == 0) {
            return Err(CacheError::InvalidTtl(0));
        }

        let mut conn = self.connection.ensure_connected().await?;
        match ttl {
            Some(duration) => conn
                .set_ex::<_, _, ()>(key, value, duration.as_secs())
                .await
                .map_err(|e| map_redis_error("set", e)),
            None => conn
                .set::<_, _, ()>(key, value)
                .await
                .map_err(|e| map_redis_error("set", e)),
        }
    }

    async fn delete(&self, keys: &[String]) -> CacheResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.connection.ensure_connected().await?;
        conn.del(keys).await.map_err(|e| map_redis_error("delete", e))
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        let mut conn = self.connection.ensure_connected().await?;
        conn.exists(key)
            .await
            .map_err(|e| map_redis_error("exists", e))
    }

    async fn keys(&self, pattern: &str) -> CacheResult<Vec<String>> {
        let mut conn = self.connection.ensure_connected().await?;
        conn.keys(pattern)
            .await
            .map_err(|e| map_redis_error("keys", e))
    }

    async fn ping(&self) -> CacheResult<()> {
        self.connection.ping().await
    }

    async fn close(&self) -> CacheResult<()> {
        self.connection.close().await;
        Ok(())
    }
}
