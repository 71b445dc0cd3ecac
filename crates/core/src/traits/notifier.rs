use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::SyncResult;

/// 一条待发送的通知
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub subject: String,
    pub body: String,
    pub recipients: Vec<String>,
}

/// 通知通道（邮件网关、webhook等）
///
/// 调用方把通知视为尽力而为：发送失败只记录日志，不影响业务结果。
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> SyncResult<()>;
}
