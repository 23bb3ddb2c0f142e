//! stash-keys - 缓存键构造
//!
//! 把服务名 + 结构化身份描述转换为确定性的存储键，
//! 以及把部分描述转换为批量失效使用的通配模式

mod composer;
mod descriptor;
mod pattern;

pub use composer::*;
pub use descriptor::*;
pub use pattern::*;
