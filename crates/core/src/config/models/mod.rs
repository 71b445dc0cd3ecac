pub mod api_observability;
pub mod app_config;
pub mod database;
pub mod notification;
pub mod repository;

pub use api_observability::{ApiConfig, LogFormat, ObservabilityConfig};
pub use app_config::AppConfig;
pub use database::DatabaseConfig;
pub use notification::NotificationConfig;
pub use repository::RepositoryConfig;
