//! 基础设施层：SQLite仓储、本地文件仓库、通知通道与可观测性

pub mod database;
pub mod filestore;
pub mod notifier;
pub mod observability;

pub use database::*;
pub use filestore::LocalFilestore;
pub use notifier::{build_notifier, DisabledNotifier, LogNotifier, WebhookNotifier};
pub use observability::*;
