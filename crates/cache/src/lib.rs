//! stash-cache - 键值缓存
//!
//! - ValueCache: 基于组合键的类型化读写、删除和批量失效
//! - ServiceCache: 绑定服务名和环境的便捷句柄

mod service;
mod value_cache;

pub use service::*;
pub use value_cache::*;

pub use stash_keys::{AuxItem, ComposedKey, DeletionPattern, DeletionScope, KeyDescriptor};
