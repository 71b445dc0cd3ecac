pub mod logging;
pub mod metrics_collector;

pub use logging::{init_logging, FilterHandle, ReloadLogLevel, SERVER_LOG_FILE};
pub use metrics_collector::{install_prometheus_recorder, MetricsCollector};
