//! 内存键值存储
//!
//! 按 Redis 语义模拟过期和 glob 匹配，用于测试和本地开发

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use regex::Regex;
use stash_errors::{CacheError, CacheResult};
use tokio::time::Instant;

use crate::store::KeyValueStore;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// 内存存储
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 未过期的条目数
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .values()
            .filter(|entry| !entry.is_expired(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 读取条目时顺带清理已过期的键
    fn live_value(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        Ok(self.live_value(key))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> CacheResult<()> {
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        self.entries.lock().insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> CacheResult<u64> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let mut deleted = 0;
        for key in keys {
            if let Some(entry) = entries.remove(key) {
                if !entry.is_expired(now) {
                    deleted += 1;
                }
            }
        }
        Ok(deleted)
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        Ok(self.live_value(key).is_some())
    }

    async fn keys(&self, pattern: &str) -> CacheResult<Vec<String>> {
        let matcher = glob_to_regex(pattern)?;
        let now = Instant::now();
        let mut keys: Vec<String> = self
            .entries
            .lock()
            .iter()
            .filter(|(key, entry)| !entry.is_expired(now) && matcher.is_match(key))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn ping(&self) -> CacheResult<()> {
        Ok(())
    }

    async fn close(&self) -> CacheResult<()> {
        Ok(())
    }
}

/// 把 Redis glob 模式翻译为锚定的正则
///
/// 支持 `*`、`?`、`[...]`（含 `[^...]`）以及 `\` 转义
pub fn glob_to_regex(pattern: &str) -> CacheResult<Regex> {
    let mut out = String::with_capacity(pattern.len() * 2 + 2);
    out.push('^');

    let mut chars = pattern.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '\\' => {
                if let Some(next) = chars.next() {
                    out.push_str(&regex::escape(&next.to_string()));
                }
            }
            '[' => {
                out.push('[');
                if chars.peek() == Some(&'^') {
                    chars.next();
                    out.push('^');
                }
                for inner in chars.by_ref() {
                    match inner {
                        ']' => break,
                        '-' => out.push('-'),
                        c => out.push_str(&regex::escape(&c.to_string())),
                    }
                }
                out.push(']');
            }
            c => out.push_str(&regex::escape(&c.to_string())),
        }
    }

    out.push('$');
    Regex::new(&out)
        .map_err(|e| CacheError::store_operation(format!("Invalid key pattern {}: {}", pattern, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = InMemoryStore::new();
        store.set("svc:k", "\"v\"", None).await.unwrap();

        assert_eq!(store.get("svc:k").await.unwrap().as_deref(), Some("\"v\""));
        assert!(store.exists("svc:k").await.unwrap());

        let deleted = store.delete(&["svc:k".to_string()]).await.unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(store.get("svc:k").await.unwrap(), None);

        // 删除不存在的键不是错误
        let deleted = store.delete(&["svc:k".to_string()]).await.unwrap();
        assert_eq!(deleted, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiry() {
        let store = InMemoryStore::new();
        store
            .set("svc:k", "1", Some(Duration::from_secs(1)))
            .await
            .unwrap();
        assert!(store.exists("svc:k").await.unwrap());

        tokio::time::advance(Duration::from_millis(1001)).await;

        assert!(!store.exists("svc:k").await.unwrap());
        assert_eq!(store.get("svc:k").await.unwrap(), None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_keys_pattern() {
        let store = InMemoryStore::new();
        for key in ["svc:app1:k1", "svc:app1:k2", "svc:app2:k1", "other:app1:k1"] {
            store.set(key, "1", None).await.unwrap();
        }

        assert_eq!(
            store.keys("svc:app1:*").await.unwrap(),
            vec!["svc:app1:k1", "svc:app1:k2"]
        );
        assert_eq!(store.keys("svc:*").await.unwrap().len(), 3);
        assert_eq!(store.keys("*").await.unwrap().len(), 4);
        assert_eq!(store.keys("svc:app?:k1").await.unwrap().len(), 2);
        assert_eq!(store.keys("svc:app[^1]:*").await.unwrap(), vec!["svc:app2:k1"]);
    }

    #[test]
    fn test_glob_escapes() {
        let matcher = glob_to_regex("svc:a\\*b:*").unwrap();
        assert!(matcher.is_match("svc:a*b:k"));
        assert!(!matcher.is_match("svc:axxb:k"));

        let matcher = glob_to_regex("svc:/widgets.json").unwrap();
        assert!(!matcher.is_match("svc:/widgetsXjson"));
    }
}
