//! 白名单字段更新的取值类型
//!
//! 区分"设置为新值"、"清空"与"不修改"三种情况。配合 `#[serde(default)]`
//! 使用时，请求中缺失的字段为 `NoChange`，显式 `null` 为 `Unset`。

use serde::{Deserialize, Serialize};

/// 单个字段的更新操作
///
/// ```rust
/// use datasync_core::types::UpdateValue;
///
/// let hostname = UpdateValue::Set("ms-host-02".to_string());
/// assert_eq!(hostname.apply_to(None), Some("ms-host-02".to_string()));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(untagged)]
pub enum UpdateValue<T> {
    /// 设置为指定值
    Set(T),
    /// 清空字段
    Unset,
    /// 不修改
    #[default]
    NoChange,
}

impl<T> UpdateValue<T> {
    pub fn is_change(&self) -> bool {
        !matches!(self, UpdateValue::NoChange)
    }

    /// 将更新应用到已有值
    pub fn apply_to(self, existing: Option<T>) -> Option<T> {
        match self {
            UpdateValue::Set(value) => Some(value),
            UpdateValue::Unset => None,
            UpdateValue::NoChange => existing,
        }
    }

    /// 应用到非空字段：`Unset` 保留原值
    pub fn apply_to_required(self, existing: T) -> T {
        match self {
            UpdateValue::Set(value) => value,
            UpdateValue::Unset | UpdateValue::NoChange => existing,
        }
    }
}

impl<'de, T> Deserialize<'de> for UpdateValue<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        // 字段缺失由 #[serde(default)] 处理，能走到这里说明字段存在
        match Option::<T>::deserialize(deserializer)? {
            Some(value) => Ok(UpdateValue::Set(value)),
            None => Ok(UpdateValue::Unset),
        }
    }
}

/// 生成白名单更新请求结构体，附带 `has_changes`
#[macro_export]
macro_rules! update_request {
    (
        $(#[$struct_meta:meta])*
        $struct_vis:vis struct $struct_name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field_name:ident : $field_ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$struct_meta])*
        $struct_vis struct $struct_name {
            $(
                $(#[$field_meta])*
                $field_vis $field_name : $field_ty
            ),*
        }

        impl $struct_name {
            /// 是否包含实际变更
            pub fn has_changes(&self) -> bool {
                $(
                    self.$field_name.is_change() ||
                )* false
            }
        }
    };
}
