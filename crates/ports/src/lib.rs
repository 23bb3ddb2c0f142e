//! ports - 抽象 trait 层
//!
//! 定义缓存核心依赖的键值存储接口

mod memory;
mod store;

pub use memory::*;
pub use store::*;
