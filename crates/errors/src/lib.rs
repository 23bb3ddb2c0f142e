//! stash-errors - 统一错误处理
//!
//! 缓存层错误分类：键构造错误属于调用方编程错误，存储错误属于可恢复的基础设施错误

use thiserror::Error;

/// 缓存错误类型
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("Invalid service name")]
    InvalidServiceName,

    #[error("Invalid key")]
    InvalidKey,

    #[error("Invalid TTL: {0} (must be a positive number of seconds)")]
    InvalidTtl(u64),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Store operation failed: {0}")]
    StoreOperationFailed(String),
}

impl CacheError {
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    pub fn deserialization(msg: impl Into<String>) -> Self {
        Self::Deserialization(msg.into())
    }

    pub fn store_unavailable(msg: impl Into<String>) -> Self {
        Self::StoreUnavailable(msg.into())
    }

    pub fn store_operation(msg: impl Into<String>) -> Self {
        Self::StoreOperationFailed(msg.into())
    }

    /// 稳定的机器可读错误码（日志、指标标签使用）
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidServiceName => "invalid_service_name",
            Self::InvalidKey => "invalid_key",
            Self::InvalidTtl(_) => "invalid_ttl",
            Self::Serialization(_) => "serialization",
            Self::Deserialization(_) => "deserialization",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::StoreOperationFailed(_) => "store_operation_failed",
        }
    }

    /// 是否为存储层错误（连接失败或单次命令失败）
    pub fn is_store_error(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable(_) | Self::StoreOperationFailed(_)
        )
    }

    /// 是否为键构造错误（调用方编程错误，应尽早失败）
    pub fn is_key_error(&self) -> bool {
        matches!(self, Self::InvalidServiceName | Self::InvalidKey)
    }
}

/// Result 类型别名
pub type CacheResult<T> = Result<T, CacheError>;
