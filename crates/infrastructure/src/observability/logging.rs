use std::fs::OpenOptions;
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, reload, EnvFilter, Layer, Registry};

use datasync_core::config::models::LogFormat;
use datasync_core::{LogLevel, LogLevelControl, SyncError, SyncResult};

/// 服务器日志文件名
pub const SERVER_LOG_FILE: &str = "datasync.log";

pub type FilterHandle = reload::Handle<EnvFilter, Registry>;

/// 基于 `reload` 句柄的运行期日志级别控制
///
/// `current` 读取正在生效的过滤器，启动时被 `RUST_LOG` 覆盖的级别也能如实反映。
pub struct ReloadLogLevel {
    handle: FilterHandle,
    current: RwLock<LogLevel>,
}

impl ReloadLogLevel {
    pub fn new(handle: FilterHandle, initial: LogLevel) -> Self {
        Self {
            handle,
            current: RwLock::new(initial),
        }
    }
}

impl LogLevelControl for ReloadLogLevel {
    fn current(&self) -> LogLevel {
        let configured = self
            .current
            .read()
            .map(|level| *level)
            .unwrap_or(LogLevel::Info);
        self.handle
            .with_current(|filter| <EnvFilter as Layer<Registry>>::max_level_hint(filter))
            .ok()
            .flatten()
            .and_then(level_from_filter)
            .unwrap_or(configured)
    }

    fn set(&self, level: LogLevel) -> SyncResult<()> {
        self.handle
            .modify(|filter| *filter = EnvFilter::new(level.as_directive()))
            .map_err(|e| SyncError::Internal(format!("重新加载日志过滤器失败: {e}")))?;
        if let Ok(mut current) = self.current.write() {
            *current = level;
        }
        Ok(())
    }
}

fn level_from_filter(filter: LevelFilter) -> Option<LogLevel> {
    if filter == LevelFilter::TRACE {
        Some(LogLevel::Trace)
    } else if filter == LevelFilter::DEBUG {
        Some(LogLevel::Debug)
    } else if filter == LevelFilter::INFO {
        Some(LogLevel::Info)
    } else if filter == LevelFilter::WARN {
        Some(LogLevel::Warn)
    } else if filter == LevelFilter::ERROR {
        Some(LogLevel::Error)
    } else {
        None
    }
}

/// 初始化全局日志订阅器
///
/// `RUST_LOG` 存在时优先使用；设置了 `log_directory` 时同时追加写入
/// `<log_directory>/datasync.log`。
pub fn init_logging(
    level: LogLevel,
    format: LogFormat,
    log_directory: Option<&Path>,
) -> Result<Arc<ReloadLogLevel>> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_directive()));
    let (filter_layer, handle) = reload::Layer::new(env_filter);

    let stdout_layer = match format {
        LogFormat::Json => fmt::layer().json().boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
    };

    let file_layer = match log_directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("创建日志目录失败: {}", dir.display()))?;
            let path = dir.join(SERVER_LOG_FILE);
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("打开日志文件失败: {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .context("初始化日志系统失败")?;

    info!(level = %level, format = %format, "日志系统已初始化");
    Ok(Arc::new(ReloadLogLevel::new(handle, level)))
}
