//! 值缓存
//!
//! 值以 JSON 文本存储。所有失败都以 `Err` 返回，由调用方决定是否降级

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use stash_errors::{CacheError, CacheResult};
use stash_keys::{
    ComposedKey, DeletionPattern, DeletionScope, KeyDescriptor, compose, compose_deletion_pattern,
};
use stash_ports::KeyValueStore;
use tracing::debug;

/// 值缓存
#[derive(Clone)]
pub struct ValueCache {
    store: Arc<dyn KeyValueStore>,
}

impl ValueCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// 组合存储键
    pub fn key(&self, service: &str, descriptor: &KeyDescriptor) -> CacheResult<ComposedKey> {
        compose(service, descriptor)
    }

    /// 写入值，`ttl_secs` 为 `None` 时永不过期
    pub async fn set<T>(
        &self,
        service: &str,
        descriptor: &KeyDescriptor,
        value: &T,
        ttl_secs: Option<u64>,
    ) -> CacheResult<()>
    where
        T: Serialize + ?Sized,
    {
        let key = compose(service, descriptor)?;
        let ttl = ttl_duration(ttl_secs)?;
        let payload = serde_json::to_string(value)
            .map_err(|e| CacheError::serialization(format!("{}: {}", key, e)))?;

        self.store.set(key.as_str(), &payload, ttl).await?;
        debug!(key = %key, ttl_secs = ?ttl_secs, "Cache value set");
        Ok(())
    }

    /// 读取值，键不存在返回 `None`
    pub async fn get<T>(&self, service: &str, descriptor: &KeyDescriptor) -> CacheResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let key = compose(service, descriptor)?;
        let Some(payload) = self.store.get(key.as_str()).await? else {
            debug!(key = %key, "Cache miss");
            return Ok(None);
        };

        let value = serde_json::from_str(&payload)
            .map_err(|e| CacheError::deserialization(format!("{}: {}", key, e)))?;
        debug!(key = %key, "Cache hit");
        Ok(Some(value))
    }

    /// 删除单个键，键不存在不是错误
    pub async fn delete(&self, service: &str, descriptor: &KeyDescriptor) -> CacheResult<()> {
        let key = compose(service, descriptor)?;
        self.delete_key(&key).await
    }

    pub async fn exists(&self, service: &str, descriptor: &KeyDescriptor) -> CacheResult<bool> {
        let key = compose(service, descriptor)?;
        self.store.exists(key.as_str()).await
    }

    /// 按删除范围批量失效，返回删除数量
    ///
    /// 列举和删除是两步操作，不具备原子性：
    /// 列举之后写入的匹配键不保证被删除
    pub async fn delete_matching(&self, service: &str, scope: &DeletionScope) -> CacheResult<u64> {
        let pattern = compose_deletion_pattern(Some(service), scope)?;
        self.delete_pattern(&pattern).await
    }

    /// 删除以组合键为前缀的所有键
    pub async fn delete_by_prefix(
        &self,
        service: &str,
        descriptor: &KeyDescriptor,
    ) -> CacheResult<u64> {
        let key = compose(service, descriptor)?;
        self.delete_pattern(&DeletionPattern::prefix_of(&key)).await
    }

    pub async fn delete_pattern(&self, pattern: &DeletionPattern) -> CacheResult<u64> {
        let keys = self.store.keys(pattern.as_str()).await?;
        if keys.is_empty() {
            debug!(pattern = %pattern, "No keys matched deletion pattern");
            return Ok(0);
        }

        let deleted = self.store.delete(&keys).await?;
        debug!(
            pattern = %pattern,
            matched = keys.len(),
            deleted = deleted,
            "Cache keys deleted by pattern"
        );
        Ok(deleted)
    }

    /// 按组合键读取原始载荷
    pub async fn get_raw(&self, key: &ComposedKey) -> CacheResult<Option<String>> {
        self.store.get(key.as_str()).await
    }

    /// 按组合键写入已序列化的载荷
    pub async fn set_raw(
        &self,
        key: &ComposedKey,
        payload: &str,
        ttl_secs: Option<u64>,
    ) -> CacheResult<()> {
        let ttl = ttl_duration(ttl_secs)?;
        self.store.set(key.as_str(), payload, ttl).await
    }

    pub async fn delete_key(&self, key: &ComposedKey) -> CacheResult<()> {
        let deleted = self.store.delete(&[key.as_str().to_string()]).await?;
        debug!(key = %key, deleted = deleted, "Cache key deleted");
        Ok(())
    }

    /// 关闭底层连接
    pub async fn close(&self) -> CacheResult<()> {
        self.store.close().await
    }
}

fn ttl_duration(ttl_secs: Option<u64>) -> CacheResult<Option<Duration>> {
    match ttl_secs {
        Some(0) => Err(CacheError::InvalidTtl(0)),
        Some(secs) => Ok(Some(Duration::from_secs(secs))),
        None => Ok(None),
    }
}
