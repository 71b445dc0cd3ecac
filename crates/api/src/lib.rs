//! # Datasync API
//!
//! 基于Axum的HTTP接口层，把请求转换为领域服务调用。
//!
//! ## 端点
//!
//! ### 客户端同步协议（总是HTTP 200，结果在 `success` 字段）
//! - `GET|POST /sync/requestsync/{organisation}/{sitename}/{station}/` - 轮询期望文件
//! - `POST /sync/checksamplefiles/` - 上报已传输的样本
//! - `POST /sync/logupload/`、`POST /sync/keyupload/` - 日志与公钥上传
//! - `GET /sync/nodeclients/` - 节点列表
//! - `POST /sync/runs/{run_id}/complete` - Run整批完成
//!
//! ### 管理端（使用HTTP状态码）
//! - `GET /admin/utils`、`POST /admin/loglevel`
//! - `GET /admin/taillog/{filename}`、`GET /admin/files/{*path}`
//! - `POST /admin/nodes`、`POST /admin/nodes/{id}/update`、`POST /admin/nodes/{id}/rules`
//! - `POST /admin/runsamples/{id}/update`
//!
//! ### 运维
//! - `GET /health`，以及启用时的 Prometheus 指标端点

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower::ServiceBuilder;

use datasync_core::config::{ApiConfig, ObservabilityConfig};
use middleware::{cors_layer, request_logging, timeout_layer, trace_layer};
pub use routes::{create_routes, AppState, Backends};

/// 创建完整的API应用
pub fn create_app(state: AppState, api: &ApiConfig, observability: &ObservabilityConfig) -> Router {
    let metrics = state.metrics.clone();
    let router = create_routes(state, &observability.metrics_endpoint)
        .layer(DefaultBodyLimit::max(api.max_request_size_bytes()));

    let router = router.layer(
        ServiceBuilder::new()
            .layer(trace_layer())
            .layer(timeout_layer(api))
            .layer(axum::middleware::from_fn_with_state(metrics, request_logging)),
    );

    if api.cors_enabled {
        router.layer(cors_layer(api))
    } else {
        router
    }
}
