use serde::{Deserialize, Serialize};

/// 通知配置
///
/// 未配置 `webhook_url` 时通知只写入日志。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub enabled: bool,
    pub return_address: String,
    /// 客户端日志上传通知的收件人
    pub logs_to: Vec<String>,
    /// 公钥上传通知的收件人
    pub keys_to: Vec<String>,
    #[serde(default)]
    pub webhook_url: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            return_address: "noreply@localhost".to_string(),
            logs_to: Vec::new(),
            keys_to: Vec::new(),
            webhook_url: None,
            timeout_seconds: 10,
        }
    }
}

impl NotificationConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(url) = &self.webhook_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(anyhow::anyhow!("Webhook地址必须以 http:// 或 https:// 开头"));
            }
        }

        if self.timeout_seconds == 0 {
            return Err(anyhow::anyhow!("通知超时时间必须大于0"));
        }

        Ok(())
    }
}
