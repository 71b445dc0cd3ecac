//! 客户端同步协议接口，总是返回HTTP 200，业务结果放在响应体中

use std::time::Instant;

use axum::{
    extract::{
        rejection::{FormRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    Form, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use datasync_core::models::NodeKey;
use datasync_domain::{parse_truthy, CheckSampleFilesOutcome, SyncOutcome, SyncRequest};

use crate::routes::AppState;

#[derive(Debug, Deserialize)]
pub struct NodePath {
    pub organisation: String,
    pub sitename: String,
    pub station: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SyncQuery {
    pub version: Option<String>,
    pub sync_completed: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SyncForm {
    pub version: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CheckSampleFilesForm {
    pub runsamplefiles: Option<String>,
}

pub async fn request_sync_get(
    State(state): State<AppState>,
    node: Result<Path<NodePath>, PathRejection>,
    query: Result<Query<SyncQuery>, QueryRejection>,
) -> Json<SyncOutcome> {
    handle_sync(&state, node, query, None).await
}

/// 表单中的 version 优先于查询参数
pub async fn request_sync_post(
    State(state): State<AppState>,
    node: Result<Path<NodePath>, PathRejection>,
    query: Result<Query<SyncQuery>, QueryRejection>,
    form: Result<Form<SyncForm>, FormRejection>,
) -> Json<SyncOutcome> {
    let form_version = match form {
        Ok(Form(form)) => form.version,
        Err(rejection) => {
            debug!(error = %rejection, "requestsync without form body");
            None
        }
    };
    handle_sync(&state, node, query, form_version).await
}

async fn handle_sync(
    state: &AppState,
    node: Result<Path<NodePath>, PathRejection>,
    query: Result<Query<SyncQuery>, QueryRejection>,
    form_version: Option<String>,
) -> Json<SyncOutcome> {
    let start = Instant::now();
    let (node, query) = match (node, query) {
        (Ok(Path(node)), Ok(Query(query))) => (node, query),
        (Err(rejection), _) => {
            warn!(error = %rejection, "unparseable requestsync path");
            state.metrics.record_sync_request(false, start.elapsed());
            return Json(SyncOutcome::malformed_request(format!(
                "Invalid node path: {}",
                rejection.body_text()
            )));
        }
        (_, Err(rejection)) => {
            warn!(error = %rejection, "unparseable requestsync query");
            state.metrics.record_sync_request(false, start.elapsed());
            return Json(SyncOutcome::malformed_request(format!(
                "Invalid query parameters: {}",
                rejection.body_text()
            )));
        }
    };

    let request = SyncRequest {
        node: NodeKey::new(node.organisation, node.sitename, node.station),
        version: form_version.or(query.version).unwrap_or_default(),
        sync_completed: parse_truthy(query.sync_completed.as_deref()),
    };

    let outcome = state.sync_handler.handle(&request).await;
    state
        .metrics
        .record_sync_request(outcome.success, start.elapsed());
    Json(outcome)
}

pub async fn check_sample_files(
    State(state): State<AppState>,
    form: Result<Form<CheckSampleFilesForm>, FormRejection>,
) -> Json<CheckSampleFilesOutcome> {
    let runsamplefiles = match form {
        Ok(Form(form)) => form.runsamplefiles,
        Err(rejection) => {
            warn!(error = %rejection, "unreadable checksamplefiles form");
            None
        }
    };

    let outcome = state
        .reconciler
        .check_sample_files(runsamplefiles.as_deref())
        .await;
    let found = outcome.synced_samples.values().map(Vec::len).sum();
    state.metrics.record_reconciliation(outcome.success, found);
    Json(outcome)
}

/// 整批标记完成；Run不存在等错误以 `success:false` 返回
pub async fn complete_run(
    State(state): State<AppState>,
    run_id: Result<Path<i64>, PathRejection>,
) -> Json<Value> {
    let run_id = match run_id {
        Ok(Path(run_id)) => run_id,
        Err(rejection) => {
            warn!(error = %rejection, "invalid run id in completion request");
            return Json(json!({
                "success": false,
                "message": format!("Invalid run id: {}", rejection.body_text()),
            }));
        }
    };

    match state.completion.mark_run_complete(run_id).await {
        Ok(outcome) => Json(json!({
            "success": true,
            "run_id": outcome.run_id,
            "samples_marked": outcome.samples_marked,
            "notified": outcome.notified,
        })),
        Err(e) => {
            warn!(run_id, error = %e, "unable to mark run complete");
            Json(json!({
                "success": false,
                "message": e.to_string(),
            }))
        }
    }
}
