//! 请求缓存中间件
//!
//! 以请求的原始 URL（路径 + 查询）作为键：
//! - GET: 命中直接返回缓存，不再执行 handler
//! - POST / PUT: handler 返回 200 / 201 后异步写入 handler 自己产出的响应体
//! - DELETE: 先同步删除键，再执行 handler
//!
//! 缓存只是加速手段：所有存储错误只记录日志，请求始终继续

use axum::{
    body::{Body, HttpBody},
    extract::{OriginalUri, Request, State},
    http::{Method, StatusCode, Uri, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::counter;
use stash_cache::{ComposedKey, KeyDescriptor, ValueCache};
use stash_errors::{CacheError, CacheResult};
use tracing::{debug, instrument, warn};

use crate::cached_response::CachedResponse;

/// 默认缓存时间（1 小时）
pub const DEFAULT_TTL_SECS: u64 = 3600;

/// 可捕获的最大响应体（1MB）
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// 按请求方法划分的缓存动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheAction {
    /// 读穿透
    Read,
    /// 写穿透（捕获 handler 响应）
    Capture,
    /// 失效
    Invalidate,
    /// 不参与缓存
    PassThrough,
}

impl CacheAction {
    pub fn for_method(method: &Method) -> Self {
        match *method {
            Method::GET => Self::Read,
            Method::POST | Method::PUT => Self::Capture,
            Method::DELETE => Self::Invalidate,
            _ => Self::PassThrough,
        }
    }
}

/// 中间件状态，每个服务配置一个实例
#[derive(Clone)]
pub struct ResponseCacheState {
    cache: ValueCache,
    service: String,
    ttl_secs: u64,
    max_body_bytes: usize,
}

impl ResponseCacheState {
    pub fn new(cache: ValueCache, service: impl Into<String>) -> Self {
        Self {
            cache,
            service: service.into(),
            ttl_secs: DEFAULT_TTL_SECS,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// 设置缓存时间（秒），0 返回 `InvalidTtl`
    pub fn with_ttl_secs(mut self, ttl_secs: u64) -> CacheResult<Self> {
        if ttl_secs == 0 {
            return Err(CacheError::InvalidTtl(ttl_secs));
        }
        self.ttl_secs = ttl_secs;
        Ok(self)
    }

    /// 设置可捕获的最大响应体
    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// 请求 URL 对应的缓存键
    pub fn key_for(&self, uri: &Uri) -> CacheResult<ComposedKey> {
        let target = uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or_else(|| uri.path());
        self.cache.key(&self.service, &KeyDescriptor::new(target))
    }

    /// 读取缓存的响应，任何失败都视为未命中
    async fn lookup(&self, key: &ComposedKey) -> Option<CachedResponse> {
        let payload = match self.cache.get_raw(key).await {
            Ok(Some(payload)) => payload,
            Ok(None) => return None,
            Err(e) => {
                self.record_store_error("get", key, &e);
                return None;
            }
        };

        match serde_json::from_str(&payload) {
            Ok(cached) => Some(cached),
            Err(e) => {
                warn!(key = %key, error = %e, "Corrupt cached response, treating as miss");
                None
            }
        }
    }

    async fn capture(&self, key: ComposedKey, cached: CachedResponse) {
        let payload = match serde_json::to_string(&cached) {
            Ok(payload) => payload,
            Err(e) => {
                let err = CacheError::serialization(e.to_string());
                self.record_store_error("set", &key, &err);
                return;
            }
        };

        match self.cache.set_raw(&key, &payload, Some(self.ttl_secs)).await {
            Ok(()) => {
                counter!("stash_cache_captures_total", "service" => self.service.clone())
                    .increment(1);
                debug!(key = %key, ttl_secs = self.ttl_secs, "Response captured");
            }
            Err(e) => self.record_store_error("set", &key, &e),
        }
    }

    async fn invalidate(&self, key: &ComposedKey) {
        match self.cache.delete_key(key).await {
            Ok(()) => debug!(key = %key, "Cached response invalidated"),
            Err(e) => self.record_store_error("delete", key, &e),
        }
    }

    fn record_store_error(&self, operation: &'static str, key: &ComposedKey, e: &CacheError) {
        counter!(
            "stash_cache_store_errors_total",
            "service" => self.service.clone(),
            "operation" => operation,
            "code" => e.code()
        )
        .increment(1);
        warn!(key = %key, operation, error = %e, "Cache operation failed, continuing without cache");
    }
}

/// Axum 中间件函数
///
/// ```ignore
/// let state = ResponseCacheState::new(value_cache, "widgets-api");
/// let app = Router::new()
///     .route("/widgets/{id}", get(show).put(update).delete(remove))
///     .layer(middleware::from_fn_with_state(state, response_cache_middleware));
/// ```
#[instrument(skip_all, fields(method = %request.method(), path = %request.uri().path()))]
pub async fn response_cache_middleware(
    State(state): State<ResponseCacheState>,
    request: Request,
    next: Next,
) -> Response {
    let action = CacheAction::for_method(request.method());
    if action == CacheAction::PassThrough {
        return next.run(request).await;
    }

    let uri = request
        .extensions()
        .get::<OriginalUri>()
        .map(|original| original.0.clone())
        .unwrap_or_else(|| request.uri().clone());

    let key = match state.key_for(&uri) {
        Ok(key) => key,
        Err(e) => {
            warn!(error = %e, "Failed to derive cache key, bypassing cache");
            return next.run(request).await;
        }
    };

    match action {
        CacheAction::Read => {
            if let Some(cached) = state.lookup(&key).await {
                counter!("stash_cache_hits_total", "service" => state.service.clone())
                    .increment(1);
                debug!(key = %key, outcome = "hit", "Serving cached response");
                return cached.into_response();
            }

            counter!("stash_cache_misses_total", "service" => state.service.clone()).increment(1);
            debug!(key = %key, outcome = "miss", "Cache miss, executing handler");
            next.run(request).await
        }
        CacheAction::Capture => {
            let response = next.run(request).await;
            capture_response(state, key, response).await
        }
        CacheAction::Invalidate => {
            state.invalidate(&key).await;
            next.run(request).await
        }
        CacheAction::PassThrough => next.run(request).await,
    }
}

/// 只有 200 / 201 会被捕获
fn is_capturable(status: StatusCode) -> bool {
    status == StatusCode::OK || status == StatusCode::CREATED
}

/// 缓冲 handler 的响应体并调度缓存写入，调用方的响应不等待写入完成
async fn capture_response(
    state: ResponseCacheState,
    key: ComposedKey,
    response: Response,
) -> Response {
    if !is_capturable(response.status()) {
        debug!(key = %key, status = %response.status(), "Response not capturable");
        return response;
    }

    let (parts, body) = response.into_parts();

    // 流式或超大的响应体不缓存
    let within_limit = body
        .size_hint()
        .upper()
        .is_some_and(|upper| upper <= state.max_body_bytes as u64);
    if !within_limit {
        debug!(key = %key, "Response body too large or unbounded, skipping capture");
        return Response::from_parts(parts, body);
    }

    let bytes = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(key = %key, error = %e, "Failed to buffer response body");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let content_type = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());
    let cached = CachedResponse::new(parts.status, content_type, bytes.clone());

    tokio::spawn(async move {
        state.capture(key, cached).await;
    });

    Response::from_parts(parts, Body::from(bytes))
}
