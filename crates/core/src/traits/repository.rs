//! 数据仓储层接口定义
//!
//! 关系型存储之上的最小抽象，只覆盖同步协议需要的读写：
//! - `NodeClientRepository` - 节点注册与交付规则
//! - `RunRepository` - 节点被分配的Run
//! - `RunSampleRepository` - 期望文件及其完成标记
//!
//! 所有实现必须是 `Send + Sync`，由请求处理器并发调用。
//! RunSample 的更新不加行锁，并发对账同一行时以最后一次写入为准。

use async_trait::async_trait;

use crate::models::{
    NewNodeClient, NodeClient, NodeKey, NodeRule, Run, RunSample, RunState,
};
use crate::SyncResult;

/// 节点仓储接口
#[async_trait]
pub trait NodeClientRepository: Send + Sync {
    /// 按三元组精确查找，不做模糊匹配
    async fn find_by_key(&self, key: &NodeKey) -> SyncResult<Option<NodeClient>>;

    async fn find_by_id(&self, id: i64) -> SyncResult<Option<NodeClient>>;

    /// 按 机构, 站点, 工作站 排序
    async fn list(&self) -> SyncResult<Vec<NodeClient>>;

    /// 注册新节点，三元组重复时返回 `NodeAlreadyExists`
    async fn create(&self, node: &NewNodeClient) -> SyncResult<NodeClient>;

    /// 持久化白名单字段（hostname / username / flags）
    async fn update(&self, node: &NodeClient) -> SyncResult<()>;

    async fn rules_for(&self, node_id: i64) -> SyncResult<Vec<NodeRule>>;

    async fn add_rule(&self, node_id: i64, description: &str) -> SyncResult<NodeRule>;
}

/// Run仓储接口
#[async_trait]
pub trait RunRepository: Send + Sync {
    /// 分配给节点的所有Run，按 id 升序
    async fn find_by_machine(&self, node_id: i64) -> SyncResult<Vec<Run>>;

    async fn find_by_id(&self, id: i64) -> SyncResult<Option<Run>>;

    async fn update_state(&self, id: i64, state: RunState) -> SyncResult<()>;
}

/// RunSample仓储接口
#[async_trait]
pub trait RunSampleRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> SyncResult<Option<RunSample>>;

    /// Run下期望文件的样本（排除空文件名），按 sequence, id 排序
    async fn find_with_files_by_run(&self, run_id: i64) -> SyncResult<Vec<RunSample>>;

    /// 单独提交一行的 complete 标记
    async fn set_complete(&self, id: i64, complete: bool) -> SyncResult<()>;

    /// 将Run下所有样本标记为完成，返回受影响的行数
    async fn mark_all_complete(&self, run_id: i64) -> SyncResult<u64>;

    /// 持久化白名单字段（filename / sequence / vial_number / method_number）
    async fn update(&self, sample: &RunSample) -> SyncResult<()>;
}
