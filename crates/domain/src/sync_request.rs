//! 节点轮询请求处理
//!
//! 每次请求依次经过：节点解析 → 客户端版本检查 → 期望文件计算 → 响应。
//! 所有失败都转换为 `success: false` 的响应体，不向 HTTP 层抛出错误。

use std::sync::Arc;

use serde::{Serialize, Serializer};
use tracing::{error, info, warn};

use datasync_core::models::{FileManifest, NodeDescriptor, NodeKey};

use crate::expected_files::ExpectedFileResolver;
use crate::node_registry::NodeRegistry;
use crate::value_objects::ClientVersion;

/// 一次轮询请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    pub node: NodeKey,
    pub version: String,
    pub sync_completed: bool,
}

/// 轮询响应体
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncOutcome {
    pub success: bool,
    pub message: String,
    /// 节点未找到时序列化为 `{}`
    #[serde(serialize_with = "details_or_empty")]
    pub details: Option<NodeDescriptor>,
    pub files: FileManifest,
}

fn details_or_empty<S>(details: &Option<NodeDescriptor>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match details {
        Some(descriptor) => descriptor.serialize(serializer),
        None => serde_json::Map::new().serialize(serializer),
    }
}

impl SyncOutcome {
    fn failure(message: impl Into<String>, details: Option<NodeDescriptor>) -> Self {
        Self {
            success: false,
            message: message.into(),
            details,
            files: FileManifest::new(),
        }
    }

    /// 请求本身无法解析（路径或查询参数非法）时的响应
    pub fn malformed_request(message: impl Into<String>) -> Self {
        Self::failure(message, None)
    }
}

pub struct SyncRequestHandler {
    registry: Arc<NodeRegistry>,
    resolver: Arc<ExpectedFileResolver>,
}

impl SyncRequestHandler {
    pub fn new(registry: Arc<NodeRegistry>, resolver: Arc<ExpectedFileResolver>) -> Self {
        Self { registry, resolver }
    }

    pub async fn handle(&self, request: &SyncRequest) -> SyncOutcome {
        let Some(node) = self.registry.resolve(&request.node).await else {
            warn!(node = %request.node, "sync request from unregistered node");
            return SyncOutcome::failure(format!("Could not find node {}", request.node), None);
        };

        let details = self.registry.describe(&node).await;

        if !ClientVersion::check(&request.version) {
            warn!(node = %request.node, version = %request.version, "rejected client version");
            return SyncOutcome::failure(
                format!(
                    "Client version \"{}\" is not supported. Please update.",
                    request.version
                ),
                Some(details),
            );
        }

        let expected = match self.resolver.resolve(&node, request.sync_completed).await {
            Ok(expected) => expected,
            Err(e) => {
                error!(node = %request.node, error = %e, "计算期望文件失败");
                return SyncOutcome::failure(
                    format!("Unable to resolve expected files: {e}"),
                    Some(details),
                );
            }
        };

        let files = expected.flatten(request.sync_completed);
        info!(
            node = %request.node,
            version = %request.version,
            sync_completed = request.sync_completed,
            files = files.len(),
            "sync request served"
        );

        SyncOutcome {
            success: true,
            message: String::new(),
            details: Some(details),
            files,
        }
    }
}
