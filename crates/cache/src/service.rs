//! 服务级缓存句柄

use serde::Serialize;
use serde::de::DeserializeOwned;
use stash_errors::CacheResult;
use stash_keys::{ComposedKey, DeletionScope, KeyDescriptor, compose};

use crate::value_cache::ValueCache;

/// 默认服务名
pub const DEFAULT_SERVICE: &str = "unknown";

/// 默认环境
pub const DEFAULT_ENVIRONMENT: &str = "dev";

/// 绑定服务名和环境的缓存
///
/// ```ignore
/// let cache = ServiceCache::new(value_cache, "billing", "prod");
/// let descriptor = KeyDescriptor::new("session123").with_app_id("app456");
/// cache.set_value(&descriptor, &profile, Some(300)).await?;
/// let profile: Option<Profile> = cache.get_value(&descriptor).await?;
/// ```
#[derive(Clone)]
pub struct ServiceCache {
    cache: ValueCache,
    service: String,
    environment: String,
}

impl ServiceCache {
    pub fn new(
        cache: ValueCache,
        service: impl Into<String>,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            cache,
            service: service.into(),
            environment: environment.into(),
        }
    }

    /// 使用默认服务名和环境
    pub fn with_defaults(cache: ValueCache) -> Self {
        Self::new(cache, DEFAULT_SERVICE, DEFAULT_ENVIRONMENT)
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn value_cache(&self) -> &ValueCache {
        &self.cache
    }

    pub async fn set_value<T>(
        &self,
        descriptor: &KeyDescriptor,
        value: &T,
        expire_time: Option<u64>,
    ) -> CacheResult<()>
    where
        T: Serialize + ?Sized,
    {
        self.cache
            .set(&self.service, descriptor, value, expire_time)
            .await
    }

    pub async fn get_value<T>(&self, descriptor: &KeyDescriptor) -> CacheResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        self.cache.get(&self.service, descriptor).await
    }

    pub async fn delete_value(&self, descriptor: &KeyDescriptor) -> CacheResult<()> {
        self.cache.delete(&self.service, descriptor).await
    }

    pub async fn key_exists(&self, descriptor: &KeyDescriptor) -> CacheResult<bool> {
        self.cache.exists(&self.service, descriptor).await
    }

    /// 在本服务下按范围批量失效
    pub async fn delete_matching(&self, scope: &DeletionScope) -> CacheResult<u64> {
        self.cache.delete_matching(&self.service, scope).await
    }

    /// 删除指定服务下以描述组合键为前缀的所有键
    pub async fn global_keys_deletion(
        &self,
        service: &str,
        descriptor: &KeyDescriptor,
    ) -> CacheResult<u64> {
        self.cache.delete_by_prefix(service, descriptor).await
    }

    /// 组合其他服务命名空间下的键
    pub fn another_service_key(
        &self,
        service: &str,
        descriptor: &KeyDescriptor,
    ) -> CacheResult<ComposedKey> {
        compose(service, descriptor)
    }

    pub async fn close(&self) -> CacheResult<()> {
        self.cache.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stash_errors::CacheError;
    use stash_ports::InMemoryStore;
    use std::sync::Arc;

    fn service_cache(service: &str) -> ServiceCache {
        ServiceCache::new(
            ValueCache::new(Arc::new(InMemoryStore::new())),
            service,
            "test",
        )
    }

    #[tokio::test]
    async fn test_values_are_scoped_to_service() {
        let cache = service_cache("billing");
        let descriptor = KeyDescriptor::new("invoice-7").with_app_id("app1");

        cache
            .set_value(&descriptor, &vec![1, 2, 3], None)
            .await
            .unwrap();

        assert!(cache.key_exists(&descriptor).await.unwrap());
        assert_eq!(
            cache.get_value::<Vec<i32>>(&descriptor).await.unwrap(),
            Some(vec![1, 2, 3])
        );
        assert!(
            cache
                .value_cache()
                .exists("billing", &descriptor)
                .await
                .unwrap()
        );
        assert!(
            !cache
                .value_cache()
                .exists("shipping", &descriptor)
                .await
                .unwrap()
        );

        cache.delete_value(&descriptor).await.unwrap();
        assert!(!cache.key_exists(&descriptor).await.unwrap());
    }

    #[tokio::test]
    async fn test_defaults() {
        let cache = ServiceCache::with_defaults(ValueCache::new(Arc::new(InMemoryStore::new())));
        assert_eq!(cache.service(), "unknown");
        assert_eq!(cache.environment(), "dev");
    }

    #[tokio::test]
    async fn test_another_service_key() {
        let cache = service_cache("billing");
        let key = cache
            .another_service_key("shipping", &KeyDescriptor::new("parcel-1"))
            .unwrap();
        assert_eq!(key.as_str(), "shipping:parcel-1");

        let err = cache
            .another_service_key("", &KeyDescriptor::new("parcel-1"))
            .unwrap_err();
        assert_eq!(err, CacheError::InvalidServiceName);
    }

    #[tokio::test]
    async fn test_global_keys_deletion_targets_other_service() {
        let cache = service_cache("billing");
        let shipping = ServiceCache::new(cache.value_cache().clone(), "shipping", "test");
        let descriptor = KeyDescriptor::new("parcel").with_app_id("app1");

        shipping.set_value(&descriptor, "a", None).await.unwrap();
        cache.set_value(&descriptor, "b", None).await.unwrap();

        let deleted = cache
            .global_keys_deletion("shipping", &descriptor)
            .await
            .unwrap();

        assert_eq!(deleted, 1);
        assert!(!shipping.key_exists(&descriptor).await.unwrap());
        assert!(cache.key_exists(&descriptor).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_matching_in_own_namespace() {
        let cache = service_cache("billing");
        for user in ["u1", "u2"] {
            let descriptor = KeyDescriptor::new("cart")
                .with_app_id("app1")
                .with_user_id(user);
            cache.set_value(&descriptor, "x", Some(60)).await.unwrap();
        }

        let deleted = cache
            .delete_matching(&DeletionScope::all().app("app1").user("u1"))
            .await
            .unwrap();
        assert_eq!(deleted, 1);
    }
}
