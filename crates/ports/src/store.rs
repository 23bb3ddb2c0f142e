//! 键值存储 trait 定义

use async_trait::async_trait;
use stash_errors::CacheResult;
use std::time::Duration;

/// 远程键值存储
///
/// 缓存核心只依赖这组原语，具体实现见 Redis 适配器和 [`crate::InMemoryStore`]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// 获取值，键不存在返回 `None`
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// 设置值，`ttl` 为 `None` 表示永不过期
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> CacheResult<()>;

    /// 批量删除，返回实际删除的数量
    async fn delete(&self, keys: &[String]) -> CacheResult<u64>;

    /// 检查是否存在
    async fn exists(&self, key: &str) -> CacheResult<bool>;

    /// 按 glob 模式列出键
    async fn keys(&self, pattern: &str) -> CacheResult<Vec<String>>;

    /// 连通性检查
    async fn ping(&self) -> CacheResult<()>;

    /// 关闭连接
    async fn close(&self) -> CacheResult<()>;
}
