//! Redis 健康检查模块

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error};

use crate::connection::StoreConnection;

/// 健康检查结果
#[derive(Debug, Clone)]
pub struct HealthCheckResult {
    /// 是否健康
    pub healthy: bool,
    /// 延迟（毫秒）
    pub latency_ms: Option<u64>,
    /// 错误信息
    pub error: Option<String>,
}

/// 健康检查器
pub struct HealthChecker {
    connection: Arc<StoreConnection>,
    timeout: Duration,
}

impl HealthChecker {
    /// 创建新的健康检查器
    pub fn new(connection: Arc<StoreConnection>) -> Self {
        Self {
            connection,
            timeout: Duration::from_secs(5),
        }
    }

    /// 设置超时时间
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 执行健康检查
    pub async fn check(&self) -> HealthCheckResult {
        let start = Instant::now();
        let result = tokio::time::timeout(self.timeout, self.connection.ping()).await;

        match result {
            Ok(Ok(())) => {
                let latency = start.elapsed().as_millis() as u64;
                debug!(latency_ms = latency, "Redis health check passed");
                HealthCheckResult {
                    healthy: true,
                    latency_ms: Some(latency),
                    error: None,
                }
            }
            Ok(Err(e)) => {
                error!(error = %e, "Redis health check failed");
                HealthCheckResult {
                    healthy: false,
                    latency_ms: None,
                    error: Some(e.to_string()),
                }
            }
            Err(_) => {
                error!("Redis health check timed out");
                HealthCheckResult {
                    healthy: false,
                    latency_ms: None,
                    error: Some("Health check timed out".to_string()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RedisConfig;

    #[tokio::test]
    async fn test_unreachable_store_is_unhealthy() {
        let config = RedisConfig::new("127.0.0.1", 1)
            .with_connection_timeout(Duration::from_millis(200));
        let checker = HealthChecker::new(Arc::new(StoreConnection::new(config)))
            .with_timeout(Duration::from_secs(2));

        let result = checker.check().await;
        assert!(!result.healthy);
        assert!(result.latency_ms.is_none());
        assert!(result.error.is_some());
    }

    #[tokio::test]
    #[ignore] // 需要 Redis 实例
    async fn test_health_checker() {
        let connection = Arc::new(StoreConnection::new(RedisConfig::default()));
        let checker = HealthChecker::new(connection).with_timeout(Duration::from_secs(10));

        let result = checker.check().await;
        assert!(result.healthy);
    }
}
