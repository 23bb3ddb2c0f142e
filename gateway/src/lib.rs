//! stash-gateway - HTTP 响应缓存中间件

mod cached_response;
mod response_cache;

pub use cached_response::*;
pub use response_cache::*;
