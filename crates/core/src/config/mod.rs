//! 配置管理
//!
//! 配置加载顺序：
//! 1. 内置默认值
//! 2. TOML 配置文件（默认 `config/datasync.toml`）
//! 3. 环境变量覆盖（前缀 `DATASYNC_`，优先级最高）
//!
//! 每个配置段都提供 `validate()`，加载后统一校验。
//!
//! ```rust,no_run
//! use datasync_core::config::AppConfig;
//!
//! let config = AppConfig::load(Some("config/datasync.toml")).unwrap();
//! println!("文件仓库: {}", config.repository.root.display());
//! ```

pub mod models;

#[cfg(test)]
mod tests;

pub use models::{
    ApiConfig, AppConfig, DatabaseConfig, NotificationConfig, ObservabilityConfig,
    RepositoryConfig,
};
