//! 基础设施资源管理
//!
//! 统一创建共享的 Redis 连接以及基于它的缓存组件

use std::sync::Arc;
use std::time::Duration;

use secrecy::ExposeSecret;
use stash_adapter_redis::{HealthChecker, RedisConfig, RedisStore, StoreConnection};
use stash_cache::{ServiceCache, ValueCache};
use stash_config::AppConfig;
use stash_errors::CacheResult;
use stash_gateway::ResponseCacheState;
use tracing::{info, warn};

/// 缓存运行时资源容器
///
/// 持有进程内唯一的连接句柄，所有组件共享同一个 [`StoreConnection`]
pub struct CacheRuntime {
    /// 应用配置
    config: AppConfig,
    /// Redis 连接（懒创建）
    connection: Arc<StoreConnection>,
    /// 值缓存
    cache: ValueCache,
}

impl CacheRuntime {
    /// 创建运行时资源（不进行网络 I/O）
    pub fn new(config: AppConfig) -> Self {
        let connection = Arc::new(StoreConnection::new(redis_config(&config)));
        let cache = ValueCache::new(Arc::new(RedisStore::new(connection.clone())));

        Self {
            config,
            connection,
            cache,
        }
    }

    /// 创建运行时资源并检查 Redis 连通性
    ///
    /// 连接失败只记录警告：缓存不可用时请求仍然正常处理，之后按需重连
    pub async fn from_config(config: AppConfig) -> Self {
        let runtime = Self::new(config);

        let result = HealthChecker::new(runtime.connection.clone())
            .with_timeout(runtime.connection.config().connection_timeout)
            .check()
            .await;

        if result.healthy {
            info!(
                url = %runtime.connection.config().redacted_url(),
                latency_ms = result.latency_ms,
                "Redis connection verified"
            );
        } else {
            warn!(
                url = %runtime.connection.config().redacted_url(),
                error = ?result.error,
                "Redis unavailable at startup, cache will reconnect on demand"
            );
        }

        runtime
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn connection(&self) -> &Arc<StoreConnection> {
        &self.connection
    }

    pub fn value_cache(&self) -> ValueCache {
        self.cache.clone()
    }

    /// 绑定配置中服务名和环境的缓存
    pub fn service_cache(&self) -> ServiceCache {
        ServiceCache::new(
            self.cache.clone(),
            &self.config.service.name,
            &self.config.service.environment,
        )
    }

    /// 响应缓存中间件状态
    pub fn response_cache_state(&self) -> CacheResult<ResponseCacheState> {
        Ok(
            ResponseCacheState::new(self.cache.clone(), &self.config.service.name)
                .with_ttl_secs(self.config.middleware.ttl_secs)?
                .with_max_body_bytes(self.config.middleware.max_body_bytes),
        )
    }

    /// 关闭连接
    pub async fn shutdown(&self) {
        self.connection.close().await;
        info!("Cache runtime shut down");
    }
}

/// 把应用配置转换为适配器配置
pub fn redis_config(config: &AppConfig) -> RedisConfig {
    let redis = &config.redis;
    let mut adapter = RedisConfig::new(&redis.host, redis.port)
        .with_database(redis.database)
        .with_connection_timeout(Duration::from_secs(redis.connection_timeout_secs));

    if let Some(username) = &redis.username {
        adapter = adapter.with_username(username);
    }
    if let Some(password) = &redis.password {
        adapter = adapter.with_password(password.expose_secret());
    }
    adapter
}
