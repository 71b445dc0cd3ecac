use axum::{extract::State, Json};

use datasync_domain::NodeGrouping;

use crate::error::ApiResult;
use crate::routes::AppState;

/// 机构 -> 站点 -> [工作站]，供客户端配置界面选择
pub async fn list_node_clients(State(state): State<AppState>) -> ApiResult<Json<NodeGrouping>> {
    Ok(Json(state.directory.list_grouped().await?))
}
