//! 管理端接口：使用HTTP状态码表达错误

use axum::{
    extract::{
        rejection::{FormRejection, JsonRejection},
        Path, Query, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use serde::Deserialize;
use tracing::{info, warn};

use datasync_core::models::{NewNodeClient, NodeClient, NodeClientUpdate, NodeRule, RunSample, RunSampleUpdate};
use datasync_core::{LogLevel, SyncError};
use datasync_domain::{LogTail, UtilsListing, DEFAULT_TAIL_LINES};

use crate::error::{ApiError, ApiResult};
use crate::response::{created, success, ApiResponse};
use crate::routes::AppState;

#[derive(Debug, Deserialize)]
pub struct LogLevelForm {
    pub loglevel: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TailLogQuery {
    pub linesback: Option<usize>,
    pub since: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewRuleRequest {
    pub description: String,
}

/// 请求体解析失败统一返回400
fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

pub async fn get_utils(State(state): State<AppState>) -> ApiResult<Json<UtilsListing>> {
    Ok(Json(state.admin.utils().await?))
}

pub async fn set_log_level(
    State(state): State<AppState>,
    form: Result<Form<LogLevelForm>, FormRejection>,
) -> ApiResult<ApiResponse<LogLevel>> {
    let requested = form
        .ok()
        .and_then(|Form(form)| form.loglevel)
        .filter(|level| !level.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("No valid log level posted.".to_string()))?;

    let level = state.admin.set_log_level(&requested)?;
    info!(level = %level, "日志级别已修改");
    Ok(ApiResponse::success_with_message(
        level,
        format!("Logging level set to {level}"),
    ))
}

pub async fn tail_log(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    Query(query): Query<TailLogQuery>,
) -> ApiResult<Json<LogTail>> {
    let tail = state
        .admin
        .tail_log(
            &filename,
            query.linesback.unwrap_or(DEFAULT_TAIL_LINES),
            query.since.unwrap_or(0),
        )
        .await
        .map_err(|e| match e {
            SyncError::Configuration(_) => ApiError::NotFound,
            other => ApiError::Sync(other),
        })?;
    Ok(Json(tail))
}

/// 读取失败一律按404处理，越界路径为400
pub async fn serve_file(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> ApiResult<Response> {
    let served = state.admin.serve_file(&path).await.map_err(|e| match e {
        SyncError::Validation(_) => ApiError::Sync(e),
        other => {
            warn!(path = %path, error = %other, "file not served");
            ApiError::NotFound
        }
    })?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, served.content_type),
            (header::CONTENT_LENGTH, served.contents.len().to_string()),
        ],
        served.contents,
    )
        .into_response())
}

pub async fn register_node(
    State(state): State<AppState>,
    body: Result<Json<NewNodeClient>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let request = json_body(body)?;
    let node: NodeClient = state.directory.register(request).await?;
    Ok(created(node))
}

pub async fn update_node(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Result<Json<NodeClientUpdate>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let update = json_body(body)?;
    let node: NodeClient = state.directory.update(id, update).await?;
    Ok(success(node))
}

pub async fn add_node_rule(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Result<Json<NewRuleRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let request = json_body(body)?;
    let rule: NodeRule = state.directory.add_rule(id, &request.description).await?;
    Ok(created(rule))
}

pub async fn update_runsample(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Result<Json<RunSampleUpdate>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let update = json_body(body)?;
    let sample: RunSample = state.admin.update_runsample(id, update).await?;
    Ok(success(sample))
}
