use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, error, info};

use datasync_core::config::NotificationConfig;
use datasync_core::traits::{Notification, Notifier};
use datasync_core::{SyncError, SyncResult};

/// 只写日志的通知通道，未配置 webhook 时使用
pub struct LogNotifier {
    from: String,
}

impl LogNotifier {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> SyncResult<()> {
        info!(
            from = %self.from,
            to = ?notification.recipients,
            subject = %notification.subject,
            body = %notification.body,
            "notification"
        );
        Ok(())
    }
}

/// 以 JSON POST 投递到邮件网关或聊天机器人
pub struct WebhookNotifier {
    url: String,
    from: String,
    http_client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, from: impl Into<String>, timeout: Duration) -> SyncResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Configuration(format!("创建HTTP客户端失败: {e}")))?;
        Ok(Self {
            url: url.into(),
            from: from.into(),
            http_client,
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, notification: &Notification) -> SyncResult<()> {
        let payload = json!({
            "from": self.from,
            "to": notification.recipients,
            "subject": notification.subject,
            "body": notification.body,
        });

        match self.http_client.post(&self.url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(subject = %notification.subject, "通知已投递");
                Ok(())
            }
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                error!("Notification webhook failed: HTTP {} - {}", status, body);
                Err(SyncError::Notification(format!("HTTP {status} - {body}")))
            }
            Err(e) => {
                error!("Failed to reach notification webhook: {}", e);
                Err(SyncError::Notification(format!("webhook connection error: {e}")))
            }
        }
    }
}

/// 丢弃所有通知
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn notify(&self, notification: &Notification) -> SyncResult<()> {
        debug!(subject = %notification.subject, "通知已禁用，跳过");
        Ok(())
    }
}

/// 根据配置选择通知通道
pub fn build_notifier(config: &NotificationConfig) -> SyncResult<Arc<dyn Notifier>> {
    if !config.enabled {
        return Ok(Arc::new(DisabledNotifier));
    }
    match &config.webhook_url {
        Some(url) => Ok(Arc::new(WebhookNotifier::new(
            url.clone(),
            config.return_address.clone(),
            Duration::from_secs(config.timeout_seconds),
        )?)),
        None => Ok(Arc::new(LogNotifier::new(config.return_address.clone()))),
    }
}
