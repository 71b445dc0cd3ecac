//! datasync 核心库
//!
//! 同步协议各层共享的数据模型、错误类型、配置和仓储接口。

pub mod config;
pub mod errors;
pub mod logging;
pub mod models;
pub mod traits;
pub mod types;

pub use errors::{SyncError, SyncResult};
pub use logging::{LogLevel, LogLevelControl};
pub use types::UpdateValue;
