//! 键组合
//!
//! 格式：`service[:app_id][:user_id][:type::id...][:tag...]:key`
//!
//! 只有 `user_id` 时保留空的 `app_id` 槽位（`service::user_id:key`），
//! 两者不会落在同一位置
//!
//! 字段值中的 `%` 和 `:` 会被转义为 `%25`、`%3A`，
//! 任何字段值都无法伪造字段边界；不含这两个字符的值原样输出

use std::borrow::Cow;

use stash_errors::{CacheError, CacheResult};

use crate::descriptor::{ComposedKey, KeyDescriptor};

/// 字段分隔符
pub const SEPARATOR: char = ':';

/// 组合存储键
pub fn compose(service: &str, descriptor: &KeyDescriptor) -> CacheResult<ComposedKey> {
    if service.is_empty() {
        return Err(CacheError::InvalidServiceName);
    }
    descriptor.validate()?;

    let mut key = String::with_capacity(service.len() + descriptor.key.len() + 16);
    key.push_str(&escape_segment(service));

    let app_id = descriptor.app_id.as_deref().filter(|v| !v.is_empty());
    let user_id = descriptor.user_id.as_deref().filter(|v| !v.is_empty());
    match (app_id, user_id) {
        (Some(app_id), user_id) => {
            key.push(SEPARATOR);
            key.push_str(&escape_segment(app_id));
            if let Some(user_id) = user_id {
                key.push(SEPARATOR);
                key.push_str(&escape_segment(user_id));
            }
        }
        (None, Some(user_id)) => {
            key.push(SEPARATOR);
            key.push(SEPARATOR);
            key.push_str(&escape_segment(user_id));
        }
        (None, None) => {}
    }

    for item in descriptor.normalized_aux_items() {
        key.push(SEPARATOR);
        key.push_str(&escape_segment(&item.kind));
        key.push(SEPARATOR);
        key.push(SEPARATOR);
        key.push_str(&escape_segment(&item.id));
    }

    for tag in descriptor.extra_tags.iter().filter(|t| !t.is_empty()) {
        key.push(SEPARATOR);
        key.push_str(&escape_segment(tag));
    }

    key.push(SEPARATOR);
    key.push_str(&escape_segment(&descriptor.key));

    Ok(ComposedKey::new(key))
}

/// 转义单个字段值
pub fn escape_segment(value: &str) -> Cow<'_, str> {
    if !value.contains(['%', SEPARATOR]) {
        return Cow::Borrowed(value);
    }

    let mut escaped = String::with_capacity(value.len() + 8);
    for ch in value.chars() {
        match ch {
            '%' => escaped.push_str("%25"),
            SEPARATOR => escaped.push_str("%3A"),
            c => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_compose_key_only() {
        let key = compose("svc", &KeyDescriptor::new("session123")).unwrap();
        assert_eq!(key.as_str(), "svc:session123");
    }

    #[test]
    fn test_compose_full_descriptor() {
        let descriptor = KeyDescriptor::new("profile")
            .with_app_id("app456")
            .with_aux_item("order", "9")
            .with_tag("v2")
            .with_tag("eu");

        let key = compose("billing", &descriptor).unwrap();
        assert_eq!(key.as_str(), "billing:app456:order::9:eu:v2:profile");
    }

    #[test]
    fn test_compose_with_user_id_follows_app_id() {
        let descriptor = KeyDescriptor::new("session123")
            .with_app_id("app456")
            .with_user_id("user789");

        let key = compose("svc", &descriptor).unwrap();
        assert_eq!(key.as_str(), "svc:app456:user789:session123");
    }

    #[test]
    fn test_user_id_without_app_id_keeps_empty_slot() {
        let by_app = compose("svc", &KeyDescriptor::new("k").with_app_id("a")).unwrap();
        let by_user = compose("svc", &KeyDescriptor::new("k").with_user_id("a")).unwrap();

        assert_eq!(by_app.as_str(), "svc:a:k");
        assert_eq!(by_user.as_str(), "svc::a:k");
        assert_ne!(by_app, by_user);
    }

    #[test]
    fn test_compose_normalizes_aux_items() {
        let unordered = KeyDescriptor::new("k")
            .with_aux_item("b", "2")
            .with_aux_item("a", "1");
        let ordered = KeyDescriptor::new("k")
            .with_aux_item("a", "1")
            .with_aux_item("b", "2");

        let left = compose("svc", &unordered).unwrap();
        let right = compose("svc", &ordered).unwrap();

        assert_eq!(left, right);
        assert_eq!(left.as_str(), "svc:a::1:b::2:k");
    }

    #[test]
    fn test_compose_rejects_empty_service() {
        let result = compose("", &KeyDescriptor::new("k"));
        assert_eq!(result, Err(CacheError::InvalidServiceName));
    }

    #[test]
    fn test_compose_rejects_empty_key() {
        let result = compose("svc", &KeyDescriptor::new(""));
        assert_eq!(result, Err(CacheError::InvalidKey));
    }

    #[test]
    fn test_compose_skips_empty_qualifiers() {
        let descriptor = KeyDescriptor::new("k").with_app_id("").with_tag("");
        let key = compose("svc", &descriptor).unwrap();
        assert_eq!(key.as_str(), "svc:k");
    }

    #[test]
    fn test_colons_in_values_cannot_forge_boundaries() {
        let forged = KeyDescriptor::new("b").with_app_id("a");
        let embedded = KeyDescriptor::new("a:b");

        let forged_key = compose("svc", &forged).unwrap();
        let embedded_key = compose("svc", &embedded).unwrap();

        assert_ne!(forged_key, embedded_key);
        assert_eq!(embedded_key.as_str(), "svc:a%3Ab");
    }

    #[test]
    fn test_escape_segment() {
        assert!(matches!(escape_segment("/widgets/42"), Cow::Borrowed(_)));
        assert_eq!(escape_segment("a:b"), "a%3Ab");
        assert_eq!(escape_segment("100%"), "100%25");
        // 已转义的形式不会与原值冲突
        assert_ne!(escape_segment("%3A"), escape_segment(":"));
    }

    fn shuffled_aux_items() -> impl Strategy<Value = (Vec<(String, String)>, Vec<(String, String)>)>
    {
        prop::collection::btree_map("[a-z]{1,6}", "[a-z0-9:%]{1,6}", 0..6).prop_flat_map(|items| {
            let sorted: Vec<(String, String)> = items.into_iter().collect();
            (Just(sorted.clone()), Just(sorted).prop_shuffle())
        })
    }

    proptest! {
        #[test]
        fn prop_compose_is_deterministic_under_permutation(
            (sorted, shuffled) in shuffled_aux_items(),
            tags in prop::collection::vec("[a-z]{1,5}", 0..5),
            key in "[a-z0-9/]{1,12}",
        ) {
            let mut left = KeyDescriptor::new(key.clone());
            for (kind, id) in &sorted {
                left = left.with_aux_item(kind, id);
            }
            for tag in &tags {
                left = left.with_tag(tag);
            }

            let mut right = KeyDescriptor::new(key);
            for (kind, id) in &shuffled {
                right = right.with_aux_item(kind, id);
            }
            for tag in tags.iter().rev() {
                right = right.with_tag(tag);
            }

            prop_assert_eq!(compose("svc", &left).unwrap(), compose("svc", &right).unwrap());
        }

        #[test]
        fn prop_distinct_keys_never_collide(a in "[a-z:%]{1,8}", b in "[a-z:%]{1,8}") {
            prop_assume!(a != b);
            let left = compose("svc", &KeyDescriptor::new(a)).unwrap();
            let right = compose("svc", &KeyDescriptor::new(b)).unwrap();
            prop_assert_ne!(left, right);
        }
    }
}
