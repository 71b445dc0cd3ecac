use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{info, warn};

use datasync_api::{create_app, AppState, Backends};
use datasync_core::config::AppConfig;
use datasync_core::LogLevelControl;
use datasync_domain::UploadRecipients;
use datasync_infrastructure::observability::{install_prometheus_recorder, MetricsCollector};
use datasync_infrastructure::{build_notifier, DatabaseManager, LocalFilestore};

/// 同步服务应用
pub struct Application {
    config: AppConfig,
    state: AppState,
    database: Arc<DatabaseManager>,
}

impl Application {
    /// 连接数据库、执行迁移并组装全部服务
    pub async fn new(config: AppConfig, log_control: Arc<dyn LogLevelControl>) -> Result<Self> {
        config.validate().context("配置验证失败")?;

        let database = DatabaseManager::new(&config.database)
            .await
            .context("初始化数据库失败")?;
        database.migrate().await.context("数据库迁移失败")?;
        let database = Arc::new(database);

        let filestore = Arc::new(LocalFilestore::from_config(&config.repository));
        let notifier = build_notifier(&config.notification).context("初始化通知通道失败")?;

        let prometheus = if config.observability.metrics_enabled {
            Some(install_prometheus_recorder()?)
        } else {
            None
        };

        if config.observability.log_directory.is_none() {
            warn!("未配置服务器日志目录，管理端日志浏览不可用");
        }

        let backends = Backends {
            database: database.clone(),
            filestore,
            notifier,
            log_control,
            recipients: UploadRecipients {
                logs_to: config.notification.logs_to.clone(),
                keys_to: config.notification.keys_to.clone(),
            },
            log_directory: config.observability.log_directory.clone(),
            persistent_root: config.repository.persistent_root(),
        };
        let state = AppState::new(backends, MetricsCollector::new(), prometheus);

        info!(
            repository = %config.repository.root.display(),
            database = %config.database.url,
            "应用初始化完成"
        );

        Ok(Self {
            config,
            state,
            database,
        })
    }

    pub fn router(&self) -> Router {
        create_app(
            self.state.clone(),
            &self.config.api,
            &self.config.observability,
        )
    }

    /// 启动HTTP服务，收到关闭信号后停止接受新连接并等待在途请求完成
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        let bind_address = &self.config.api.bind_address;
        let listener = TcpListener::bind(bind_address)
            .await
            .with_context(|| format!("绑定地址失败: {bind_address}"))?;
        info!("API服务器监听地址: {}", bind_address);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("API服务器收到关闭信号");
            })
            .await
            .context("API服务器运行失败")?;

        self.database.close().await;
        info!("API服务器已停止");
        Ok(())
    }
}
