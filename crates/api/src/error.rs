use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use datasync_core::SyncError;
use serde_json::json;
use tracing::error;

/// 管理端接口错误，同步接口不使用HTTP错误码
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Sync(#[from] SyncError),

    #[error("请求参数错误: {0}")]
    BadRequest(String),

    #[error("未找到资源")]
    NotFound,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, error_type) = match &self {
            ApiError::Sync(e) if e.is_not_found() => {
                (StatusCode::NOT_FOUND, e.to_string(), "NOT_FOUND")
            }
            // 校验失败的信息原样返回给调用方
            ApiError::Sync(SyncError::Validation(msg)) => {
                (StatusCode::BAD_REQUEST, msg.clone(), "VALIDATION_ERROR")
            }
            ApiError::Sync(e @ SyncError::NodeAlreadyExists { .. }) => {
                (StatusCode::CONFLICT, e.to_string(), "CONFLICT")
            }
            ApiError::Sync(e) => {
                error!(error = %e, "管理接口内部错误");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "系统内部错误".to_string(),
                    "INTERNAL_ERROR",
                )
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone(), "BAD_REQUEST"),
            ApiError::NotFound => (
                StatusCode::NOT_FOUND,
                "请求的资源不存在".to_string(),
                "NOT_FOUND",
            ),
        };

        let body = Json(json!({
            "success": false,
            "error": {
                "message": message,
                "type": error_type,
                "code": status.as_u16(),
                "timestamp": chrono::Utc::now().to_rfc3339(),
            }
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
