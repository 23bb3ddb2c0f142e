//! Redis 连接管理
//!
//! 进程内共享一个懒创建的连接句柄：首次使用时建立，之后复用。
//! 同一时刻只有一次建立尝试，等待中的调用方共享它的结果；
//! 失败不会缓存给之后的调用，下次调用重新尝试

use redis::aio::ConnectionManager;
use redis::{Client, RedisError};
use stash_errors::{CacheError, CacheResult};
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::RedisConfig;

/// 存储连接
pub struct StoreConnection {
    config: RedisConfig,
    handle: RwLock<Option<ConnectionManager>>,
    /// 串行化建立尝试，并记录最近一次失败
    connecting: Mutex<Option<ConnectFailure>>,
}

/// 一次失败的建立尝试
struct ConnectFailure {
    finished_at: Instant,
    error: CacheError,
}

impl StoreConnection {
    /// 创建连接（不进行任何网络 I/O）
    pub fn new(config: RedisConfig) -> Self {
        Self {
            config,
            handle: RwLock::new(None),
            connecting: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &RedisConfig {
        &self.config
    }

    /// 确保已连接并返回句柄，幂等
    pub async fn ensure_connected(&self) -> CacheResult<ConnectionManager> {
        if let Some(conn) = self.handle.read().await.as_ref() {
            return Ok(conn.clone());
        }

        let waiting_since = Instant::now();
        let mut last_failure = self.connecting.lock().await;

        // 等待期间可能已被其他调用方建立
        if let Some(conn) = self.handle.read().await.as_ref() {
            return Ok(conn.clone());
        }
        // 等待期间结束的失败尝试与本次调用并发，直接共享其结果
        if let Some(failure) = last_failure.as_ref() {
            if failure.finished_at >= waiting_since {
                return Err(failure.error.clone());
            }
        }

        match create_connection_manager(&self.config).await {
            Ok(conn) => {
                *self.handle.write().await = Some(conn.clone());
                *last_failure = None;
                Ok(conn)
            }
            Err(error) => {
                *last_failure = Some(ConnectFailure {
                    finished_at: Instant::now(),
                    error: error.clone(),
                });
                Err(error)
            }
        }
    }

    /// 是否已建立连接句柄
    pub async fn is_connected(&self) -> bool {
        self.handle.read().await.is_some()
    }

    /// PING 检查，期望返回 PONG
    pub async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.ensure_connected().await?;
        check_connection(&mut conn).await
    }

    /// 连通性检查的布尔形式，结果写入日志
    pub async fn is_healthy(&self) -> bool {
        match self.ping().await {
            Ok(()) => {
                debug!(url = %self.config.redacted_url(), "Redis ping succeeded");
                true
            }
            Err(e) => {
                warn!(url = %self.config.redacted_url(), error = %e, "Redis ping failed");
                false
            }
        }
    }

    /// 释放连接句柄，之后的调用会重新建立连接
    pub async fn close(&self) {
        if self.handle.write().await.take().is_some() {
            info!(url = %self.config.redacted_url(), "Redis connection closed");
        }
    }
}

/// 创建 Redis 连接管理器
pub async fn create_connection_manager(config: &RedisConfig) -> CacheResult<ConnectionManager> {
    let client = Client::open(config.url()).map_err(|e| {
        CacheError::store_unavailable(format!("Failed to create Redis client: {}", e))
    })?;

    let conn = tokio::time::timeout(config.connection_timeout, ConnectionManager::new(client))
        .await
        .map_err(|_| {
            CacheError::store_unavailable(format!(
                "Redis connection timed out after {:?}",
                config.connection_timeout
            ))
        })?
        .map_err(|e| {
            CacheError::store_unavailable(format!(
                "Failed to create Redis connection manager: {}",
                e
            ))
        })?;

    info!(url = %config.redacted_url(), "Redis connection created");
    Ok(conn)
}

/// 检查 Redis 连接
pub async fn check_connection(conn: &mut ConnectionManager) -> CacheResult<()> {
    let response: String = redis::cmd("PING")
        .query_async(conn)
        .await
        .map_err(|e| CacheError::store_unavailable(format!("Redis health check failed: {}", e)))?;

    if response != "PONG" {
        return Err(CacheError::store_unavailable(format!(
            "Unexpected PING response: {}",
            response
        )));
    }
    Ok(())
}

/// 把命令错误映射为错误分类：连接类错误视为存储不可用
pub fn map_redis_error(operation: &str, e: RedisError) -> CacheError {
    let msg = format!("Redis {} failed: {}", operation, e);
    if e.is_io_error() || e.is_connection_refusal() || e.is_connection_dropped() || e.is_timeout()
    {
        CacheError::store_unavailable(msg)
    } else {
        CacheError::store_operation(msg)
    }
}
