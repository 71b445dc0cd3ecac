use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::PathBuf;
use std::sync::Arc;

use datasync_core::traits::{Filestore, NodeClientRepository, Notifier, RunRepository, RunSampleRepository};
use datasync_core::LogLevelControl;
use datasync_domain::{
    AdminUtilities, CompletionReconciler, ExpectedFileResolver, NodeDirectory, NodeRegistry,
    RunCompletion, SyncRequestHandler, UploadIngestor, UploadRecipients,
};
use datasync_infrastructure::database::{
    DatabaseManager, SqliteNodeClientRepository, SqliteRunRepository, SqliteRunSampleRepository,
};
use datasync_infrastructure::observability::MetricsCollector;

use crate::handlers::{
    admin::{add_node_rule, get_utils, register_node, serve_file, set_log_level, tail_log, update_node, update_runsample},
    health::health_check,
    metrics::render_metrics,
    nodes::list_node_clients,
    sync::{check_sample_files, complete_run, request_sync_get, request_sync_post},
    upload::{key_upload, log_upload},
};

/// API应用状态
#[derive(Clone)]
pub struct AppState {
    pub sync_handler: Arc<SyncRequestHandler>,
    pub reconciler: Arc<CompletionReconciler>,
    pub uploads: Arc<UploadIngestor>,
    pub completion: Arc<RunCompletion>,
    pub directory: Arc<NodeDirectory>,
    pub admin: Arc<AdminUtilities>,
    pub database: Arc<DatabaseManager>,
    pub metrics: MetricsCollector,
    /// 未启用指标时为 None，`/metrics` 返回404
    pub prometheus: Option<PrometheusHandle>,
}

/// 组装领域服务所需的外部依赖
pub struct Backends {
    pub database: Arc<DatabaseManager>,
    pub filestore: Arc<dyn Filestore>,
    pub notifier: Arc<dyn Notifier>,
    pub log_control: Arc<dyn LogLevelControl>,
    pub recipients: UploadRecipients,
    pub log_directory: Option<PathBuf>,
    pub persistent_root: PathBuf,
}

impl AppState {
    pub fn new(
        backends: Backends,
        metrics: MetricsCollector,
        prometheus: Option<PrometheusHandle>,
    ) -> Self {
        let pool = backends.database.pool().clone();
        let nodes: Arc<dyn NodeClientRepository> =
            Arc::new(SqliteNodeClientRepository::new(pool.clone()));
        let runs: Arc<dyn RunRepository> = Arc::new(SqliteRunRepository::new(pool.clone()));
        let samples: Arc<dyn RunSampleRepository> = Arc::new(SqliteRunSampleRepository::new(pool));
        let filestore = backends.filestore;

        let registry = Arc::new(NodeRegistry::new(nodes.clone(), filestore.clone()));
        let resolver = Arc::new(ExpectedFileResolver::new(
            runs.clone(),
            samples.clone(),
            filestore.clone(),
        ));
        let completion = Arc::new(RunCompletion::new(
            runs.clone(),
            samples.clone(),
            backends.notifier.clone(),
        ));

        Self {
            sync_handler: Arc::new(SyncRequestHandler::new(registry, resolver)),
            reconciler: Arc::new(CompletionReconciler::new(
                runs,
                samples.clone(),
                filestore.clone(),
                completion.clone(),
            )),
            uploads: Arc::new(UploadIngestor::new(
                filestore.clone(),
                backends.notifier,
                backends.recipients,
            )),
            completion,
            directory: Arc::new(NodeDirectory::new(nodes.clone())),
            admin: Arc::new(AdminUtilities::new(
                backends.log_control,
                filestore,
                nodes,
                samples,
                backends.log_directory,
                backends.persistent_root,
            )),
            database: backends.database,
            metrics,
            prometheus,
        }
    }
}

/// 创建API路由
pub fn create_routes(state: AppState, metrics_endpoint: &str) -> Router {
    Router::new()
        // 健康检查
        .route("/health", get(health_check))
        .route(metrics_endpoint, get(render_metrics))
        // 客户端同步协议
        .route(
            "/sync/requestsync/{organisation}/{sitename}/{station}/",
            get(request_sync_get).post(request_sync_post),
        )
        .route("/sync/checksamplefiles/", post(check_sample_files))
        .route("/sync/logupload/", post(log_upload))
        .route("/sync/keyupload/", post(key_upload))
        .route("/sync/nodeclients/", get(list_node_clients))
        .route("/sync/runs/{run_id}/complete", post(complete_run))
        // 管理端
        .route("/admin/utils", get(get_utils))
        .route("/admin/loglevel", post(set_log_level))
        .route("/admin/taillog/{filename}", get(tail_log))
        .route("/admin/files/{*path}", get(serve_file))
        .route("/admin/nodes", post(register_node))
        .route("/admin/nodes/{id}/update", post(update_node))
        .route("/admin/nodes/{id}/rules", post(add_node_rule))
        .route("/admin/runsamples/{id}/update", post(update_runsample))
        .with_state(state)
}
