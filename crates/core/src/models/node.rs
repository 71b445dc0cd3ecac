use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::UpdateValue;

/// 实验站点三元组：机构 / 站点 / 工作站
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeKey {
    pub organisation: String,
    pub site: String,
    pub station: String,
}

impl NodeKey {
    pub fn new(
        organisation: impl Into<String>,
        site: impl Into<String>,
        station: impl Into<String>,
    ) -> Self {
        Self {
            organisation: organisation.into(),
            site: site.into(),
            station: station.into(),
        }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.organisation, self.site, self.station)
    }
}

/// 已注册的仪器节点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeClient {
    pub id: i64,
    pub organisation_name: String,
    pub site_name: String,
    pub station_name: String,
    pub hostname: Option<String>,
    pub username: Option<String>,
    pub flags: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NodeClient {
    pub fn key(&self) -> NodeKey {
        NodeKey::new(
            self.organisation_name.clone(),
            self.site_name.clone(),
            self.station_name.clone(),
        )
    }

    /// 应用白名单字段更新，返回是否有字段发生变化
    pub fn apply_update(&mut self, update: NodeClientUpdate) -> bool {
        let changed = update.has_changes();
        self.hostname = update.hostname.apply_to(self.hostname.take());
        self.username = update.username.apply_to(self.username.take());
        self.flags = update.flags.apply_to(self.flags.take());
        changed
    }
}

/// 节点注册请求
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewNodeClient {
    pub organisation_name: String,
    pub site_name: String,
    pub station_name: String,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub flags: Option<String>,
}

impl NewNodeClient {
    pub fn key(&self) -> NodeKey {
        NodeKey::new(
            self.organisation_name.clone(),
            self.site_name.clone(),
            self.station_name.clone(),
        )
    }
}

crate::update_request! {
    /// 节点可更新字段白名单，三元组身份不可修改
    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    #[serde(deny_unknown_fields)]
    pub struct NodeClientUpdate {
        #[serde(default)]
        pub hostname: UpdateValue<String>,
        #[serde(default)]
        pub username: UpdateValue<String>,
        #[serde(default)]
        pub flags: UpdateValue<String>,
    }
}

/// 节点交付规则
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRule {
    pub id: i64,
    pub parent_node_id: i64,
    pub description: String,
}

impl fmt::Display for NodeRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

/// 返回给客户端的节点配置描述，空字段不序列化
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeDescriptor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub rootdir: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<String>>,
}
