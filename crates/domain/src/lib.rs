//! # 同步协议领域服务
//!
//! 各服务只依赖 `datasync-core` 中的仓储、文件仓库和通知接口，
//! 具体实现由基础设施层在启动时注入。
//!
//! - [`NodeRegistry`] - 节点三元组解析与客户端配置描述
//! - [`ExpectedFileResolver`] - 节点仍需上传的文件
//! - [`SyncRequestHandler`] - 一次轮询的完整处理
//! - [`CompletionReconciler`] - 客户端上报与文件存在性对账
//! - [`UploadIngestor`] - 日志与公钥上传
//! - [`NodeDirectory`] / [`RunCompletion`] / [`AdminUtilities`] - 管理功能

pub mod admin;
pub mod expected_files;
pub mod node_directory;
pub mod node_registry;
pub mod reconciler;
pub mod run_completion;
pub mod sync_request;
pub mod upload;
pub mod value_objects;

#[cfg(test)]
pub(crate) mod test_utils;

pub use admin::{AdminUtilities, LogTail, ServedFile, UtilsListing, DEFAULT_TAIL_LINES};
pub use expected_files::ExpectedFileResolver;
pub use node_directory::{NodeDirectory, NodeGrouping};
pub use node_registry::NodeRegistry;
pub use reconciler::{CheckSampleFilesOutcome, CompletionReconciler};
pub use run_completion::{RunCompletion, RunCompletionOutcome};
pub use sync_request::{SyncOutcome, SyncRequest, SyncRequestHandler};
pub use upload::{UploadIngestor, UploadRecipients, UploadStatus};
pub use value_objects::{parse_truthy, ClientVersion};
