//! 通用类型定义

pub mod update_value;

pub use update_value::UpdateValue;
