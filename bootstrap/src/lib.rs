//! stash-bootstrap - 缓存层启动骨架
//!
//! 配置 → 日志 → Redis 连接 → 缓存 → 中间件状态

mod infrastructure;
mod runtime;

pub use infrastructure::*;
pub use runtime::*;
