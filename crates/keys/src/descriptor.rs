//! 键描述模型

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use stash_errors::{CacheError, CacheResult};

/// 带类型的子标识，渲染为 `type::id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuxItem {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

impl AuxItem {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
        }
    }
}

/// 键描述
///
/// 输入顺序不影响最终的键：`aux_items` 在组合前按 `kind` 稳定排序，
/// `extra_tags` 本身是有序集合
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyDescriptor {
    /// 叶子标识（必填，非空）
    pub key: String,
    /// 应用/租户标识
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    /// 用户标识
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// 带类型的子标识列表
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aux_items: Vec<AuxItem>,
    /// 扁平限定标签
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub extra_tags: BTreeSet<String>,
}

impl KeyDescriptor {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    /// 创建并校验描述，空 key 直接返回 `InvalidKey`
    pub fn try_new(key: impl Into<String>) -> CacheResult<Self> {
        let descriptor = Self::new(key);
        descriptor.validate()?;
        Ok(descriptor)
    }

    pub fn with_app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = Some(app_id.into());
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_aux_item(mut self, kind: impl Into<String>, id: impl Into<String>) -> Self {
        self.aux_items.push(AuxItem::new(kind, id));
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.extra_tags.insert(tag.into());
        self
    }

    pub fn validate(&self) -> CacheResult<()> {
        if self.key.is_empty() {
            return Err(CacheError::InvalidKey);
        }
        Ok(())
    }

    /// 按 `kind` 稳定排序后的子标识，相同 `kind` 保持输入顺序
    pub fn normalized_aux_items(&self) -> Vec<&AuxItem> {
        let mut items: Vec<&AuxItem> = self.aux_items.iter().collect();
        items.sort_by(|a, b| a.kind.cmp(&b.kind));
        items
    }
}

/// 组合后的存储键
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComposedKey(String);

impl ComposedKey {
    pub(crate) fn new(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ComposedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ComposedKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<ComposedKey> for String {
    fn from(key: ComposedKey) -> Self {
        key.0
    }
}
