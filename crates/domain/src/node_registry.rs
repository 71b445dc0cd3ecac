use std::sync::Arc;

use tracing::{debug, error, warn};

use datasync_core::models::{NodeClient, NodeDescriptor, NodeKey};
use datasync_core::traits::{Filestore, NodeClientRepository};

/// 节点注册表：三元组解析与客户端配置描述
///
/// 两个操作都不向调用方传播错误，存储故障记录日志后按"未找到"处理。
pub struct NodeRegistry {
    nodes: Arc<dyn NodeClientRepository>,
    filestore: Arc<dyn Filestore>,
}

impl NodeRegistry {
    pub fn new(nodes: Arc<dyn NodeClientRepository>, filestore: Arc<dyn Filestore>) -> Self {
        Self { nodes, filestore }
    }

    pub async fn resolve(&self, key: &NodeKey) -> Option<NodeClient> {
        match self.nodes.find_by_key(key).await {
            Ok(Some(node)) => {
                debug!(node = %key, node_id = node.id, "节点解析成功");
                Some(node)
            }
            Ok(None) => {
                debug!(node = %key, "节点未注册");
                None
            }
            Err(e) => {
                error!(node = %key, error = %e, "查询节点失败");
                None
            }
        }
    }

    pub async fn describe(&self, node: &NodeClient) -> NodeDescriptor {
        let rules = match self.nodes.rules_for(node.id).await {
            Ok(rules) if rules.is_empty() => None,
            Ok(rules) => Some(rules.into_iter().map(|rule| rule.description).collect()),
            Err(e) => {
                warn!(node = %node.key(), error = %e, "加载节点交付规则失败");
                None
            }
        };

        NodeDescriptor {
            host: non_empty(&node.hostname),
            flags: non_empty(&node.flags),
            username: non_empty(&node.username),
            rootdir: self.filestore.root().display().to_string(),
            rules,
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}
