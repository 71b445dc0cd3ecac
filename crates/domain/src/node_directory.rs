use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;

use datasync_core::models::{NewNodeClient, NodeClient, NodeClientUpdate, NodeRule};
use datasync_core::traits::NodeClientRepository;
use datasync_core::{SyncError, SyncResult};

/// 机构 -> 站点 -> [工作站]
pub type NodeGrouping = BTreeMap<String, BTreeMap<String, Vec<String>>>;

/// 节点目录管理：注册、白名单更新、交付规则
pub struct NodeDirectory {
    nodes: Arc<dyn NodeClientRepository>,
}

impl NodeDirectory {
    pub fn new(nodes: Arc<dyn NodeClientRepository>) -> Self {
        Self { nodes }
    }

    pub async fn list(&self) -> SyncResult<Vec<NodeClient>> {
        self.nodes.list().await
    }

    pub async fn list_grouped(&self) -> SyncResult<NodeGrouping> {
        let mut grouped = NodeGrouping::new();
        for node in self.nodes.list().await? {
            grouped
                .entry(node.organisation_name)
                .or_default()
                .entry(node.site_name)
                .or_default()
                .push(node.station_name);
        }
        Ok(grouped)
    }

    pub async fn register(&self, new: NewNodeClient) -> SyncResult<NodeClient> {
        let key = new.key();
        if [&key.organisation, &key.site, &key.station]
            .iter()
            .any(|part| part.trim().is_empty())
        {
            return Err(SyncError::Validation(
                "机构、站点、工作站名称都不能为空".to_string(),
            ));
        }

        let node = self.nodes.create(&new).await?;
        info!(node = %key, node_id = node.id, "node registered");
        Ok(node)
    }

    pub async fn update(&self, id: i64, update: NodeClientUpdate) -> SyncResult<NodeClient> {
        let mut node = self
            .nodes
            .find_by_id(id)
            .await?
            .ok_or(SyncError::NodeIdNotFound { id })?;

        if node.apply_update(update) {
            self.nodes.update(&node).await?;
            info!(node = %node.key(), node_id = id, "node updated");
        }
        Ok(node)
    }

    pub async fn add_rule(&self, node_id: i64, description: &str) -> SyncResult<NodeRule> {
        if description.trim().is_empty() {
            return Err(SyncError::Validation("规则描述不能为空".to_string()));
        }
        self.nodes
            .find_by_id(node_id)
            .await?
            .ok_or(SyncError::NodeIdNotFound { id: node_id })?;

        self.nodes.add_rule(node_id, description).await
    }
}
