//! 批量失效模式
//!
//! 只能从左到右逐级收窄：service → app_id → user_id → key，
//! 第一个缺省（或为 `*`）的字段截断模式并追加通配符

use std::borrow::Cow;
use std::fmt;

use stash_errors::{CacheError, CacheResult};

use crate::composer::{SEPARATOR, escape_segment};
use crate::descriptor::ComposedKey;

/// 通配符
pub const WILDCARD: &str = "*";

/// 删除范围（部分描述）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionScope {
    pub app_id: Option<String>,
    pub user_id: Option<String>,
    pub key: Option<String>,
}

impl DeletionScope {
    /// 服务下的全部键
    pub fn all() -> Self {
        Self::default()
    }

    pub fn app(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = Some(app_id.into());
        self
    }

    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

/// 存储侧 glob 模式
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeletionPattern {
    pattern: String,
    wildcard: bool,
}

impl DeletionPattern {
    fn exact(pattern: String) -> Self {
        Self {
            pattern,
            wildcard: false,
        }
    }

    fn with_trailing_wildcard(mut pattern: String) -> Self {
        pattern.push_str(WILDCARD);
        Self {
            pattern,
            wildcard: true,
        }
    }

    /// 匹配所有键
    pub fn everything() -> Self {
        Self::with_trailing_wildcard(String::new())
    }

    /// 以组合键为前缀的所有键
    pub fn prefix_of(key: &ComposedKey) -> Self {
        Self::with_trailing_wildcard(escape_glob(key.as_str()).into_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// 是否带尾部通配符（否则为精确键）
    pub fn is_wildcard(&self) -> bool {
        self.wildcard
    }
}

impl fmt::Display for DeletionPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

impl AsRef<str> for DeletionPattern {
    fn as_ref(&self) -> &str {
        &self.pattern
    }
}

/// 组合删除模式
///
/// `service` 缺省或为 `*` 时匹配全部键；空字符串返回 `InvalidServiceName`
pub fn compose_deletion_pattern(
    service: Option<&str>,
    scope: &DeletionScope,
) -> CacheResult<DeletionPattern> {
    let service = match service {
        None => return Ok(DeletionPattern::everything()),
        Some(WILDCARD) => return Ok(DeletionPattern::everything()),
        Some("") => return Err(CacheError::InvalidServiceName),
        Some(service) => service,
    };

    let mut pattern = pattern_segment(service);

    for field in [&scope.app_id, &scope.user_id, &scope.key] {
        match field.as_deref().filter(|v| !is_wildcard(v)) {
            Some(value) => {
                pattern.push(SEPARATOR);
                pattern.push_str(&pattern_segment(value));
            }
            None => {
                pattern.push(SEPARATOR);
                return Ok(DeletionPattern::with_trailing_wildcard(pattern));
            }
        }
    }

    Ok(DeletionPattern::exact(pattern))
}

fn is_wildcard(value: &str) -> bool {
    value.is_empty() || value == WILDCARD
}

fn pattern_segment(value: &str) -> String {
    escape_glob(&escape_segment(value)).into_owned()
}

/// 转义 glob 元字符
pub fn escape_glob(value: &str) -> Cow<'_, str> {
    const META: [char; 5] = ['*', '?', '[', ']', '\\'];
    if !value.contains(META) {
        return Cow::Borrowed(value);
    }

    let mut escaped = String::with_capacity(value.len() + 4);
    for ch in value.chars() {
        if META.contains(&ch) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    Cow::Owned(escaped)
}
