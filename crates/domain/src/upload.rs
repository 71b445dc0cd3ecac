use std::sync::Arc;

use tracing::{debug, error, info, warn};

use datasync_core::models::UploadKind;
use datasync_core::traits::{Filestore, Notification, Notifier};
use datasync_core::{SyncError, SyncResult};

/// 上传结果，对应接口返回的状态字符串
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    Ok,
    Failed,
    NothingPosted,
}

impl UploadStatus {
    pub fn message(&self, kind: UploadKind) -> &'static str {
        match (self, kind) {
            (UploadStatus::Ok, _) => "ok",
            (UploadStatus::Failed, UploadKind::Log) => "Log upload failed",
            (UploadStatus::Failed, UploadKind::Key) => "key upload failed",
            (UploadStatus::NothingPosted, UploadKind::Log) => "No log posted",
            (UploadStatus::NothingPosted, UploadKind::Key) => "No key posted",
        }
    }
}

/// 各类上传通知的收件人
#[derive(Debug, Clone, Default)]
pub struct UploadRecipients {
    pub logs_to: Vec<String>,
    pub keys_to: Vec<String>,
}

/// 客户端日志和公钥的落盘
///
/// 不做内容、大小、类型校验，大小只受HTTP请求体上限约束。
pub struct UploadIngestor {
    filestore: Arc<dyn Filestore>,
    notifier: Arc<dyn Notifier>,
    recipients: UploadRecipients,
}

impl UploadIngestor {
    pub fn new(
        filestore: Arc<dyn Filestore>,
        notifier: Arc<dyn Notifier>,
        recipients: UploadRecipients,
    ) -> Self {
        Self {
            filestore,
            notifier,
            recipients,
        }
    }

    /// 写入上传内容并发送通知，返回是否写入成功。不会返回错误。
    pub async fn ingest(
        &self,
        kind: UploadKind,
        node_name: Option<&str>,
        original_filename: &str,
        bytes: Vec<u8>,
    ) -> bool {
        let prefix = filename_prefix(node_name);
        let relative = destination(kind, &prefix, original_filename);
        debug!(kind = %kind, path = %relative, size = bytes.len(), "写入上传文件");

        let written = match self.write_blocking(relative.clone(), bytes).await {
            Ok(path) => {
                info!(kind = %kind, path = %path.display(), "upload stored");
                true
            }
            Err(e) => {
                error!(kind = %kind, path = %relative, error = %e, "upload failed");
                false
            }
        };

        let notification = self.notification(kind, &prefix, &relative, written);
        if let Err(e) = self.notifier.notify(&notification).await {
            warn!(kind = %kind, error = %e, "unable to send upload notification");
        }

        written
    }

    pub fn status(written: bool) -> UploadStatus {
        if written {
            UploadStatus::Ok
        } else {
            UploadStatus::Failed
        }
    }

    async fn write_blocking(&self, relative: String, bytes: Vec<u8>) -> SyncResult<std::path::PathBuf> {
        let filestore = self.filestore.clone();
        tokio::task::spawn_blocking(move || filestore.write(&relative, &bytes))
            .await
            .map_err(|e| SyncError::Internal(format!("上传写入任务异常退出: {e}")))?
    }

    fn notification(&self, kind: UploadKind, prefix: &str, relative: &str, written: bool) -> Notification {
        let node = prefix.trim_end_matches('_');
        let (subject, body, recipients) = match kind {
            UploadKind::Log => (
                format!("MS Datasync Log Upload ({node})"),
                if written {
                    format!("An MS Datasync logfile has been uploaded: {relative}")
                } else {
                    format!("MS Datasync logfile upload failed: {relative}")
                },
                self.recipients.logs_to.clone(),
            ),
            UploadKind::Key => (
                format!("MS Datasync Public Key upload ({node})"),
                if written {
                    format!("An MS Datasync keyfile has been uploaded: {relative}")
                } else {
                    format!("MS Datasync keyfile upload failed: {relative}")
                },
                self.recipients.keys_to.clone(),
            ),
        };
        Notification {
            subject,
            body,
            recipients,
        }
    }
}

/// `<node>_`，未提交节点名时为 `UNKNOWN_`；节点名中的路径分隔符替换为 `_`
pub fn filename_prefix(node_name: Option<&str>) -> String {
    match node_name {
        Some(name) => {
            let cleaned: String = name
                .chars()
                .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
                .collect();
            format!("{cleaned}_")
        }
        None => "UNKNOWN_".to_string(),
    }
}

/// 文件仓库中的相对目标路径
pub fn destination(kind: UploadKind, prefix: &str, original_filename: &str) -> String {
    match kind {
        UploadKind::Log => {
            let basename = original_filename
                .rsplit(['/', '\\'])
                .next()
                .filter(|name| !name.is_empty() && *name != "." && *name != "..")
                .unwrap_or("upload.log");
            format!("{}/{prefix}{basename}", kind.directory())
        }
        UploadKind::Key => format!("{}/{prefix}id_rsa.pub", kind.directory()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockNotifier, TempFilestore};
    use std::sync::atomic::Ordering;

    fn recipients() -> UploadRecipients {
        UploadRecipients {
            logs_to: vec!["ops@example.org".to_string()],
            keys_to: vec!["sysadmin@example.org".to_string()],
        }
    }

    #[test]
    fn test_destinations() {
        assert_eq!(
            destination(UploadKind::Log, "orgA-siteB-station1_", "sync.log"),
            "synclogs/orgA-siteB-station1_sync.log"
        );
        assert_eq!(
            destination(UploadKind::Log, "UNKNOWN_", "../../etc/passwd"),
            "synclogs/UNKNOWN_passwd"
        );
        assert_eq!(
            destination(UploadKind::Log, "n_", "C:\\logs\\screen.png"),
            "synclogs/n_screen.png"
        );
        assert_eq!(
            destination(UploadKind::Key, "n_", "whatever.txt"),
            "publickeys/n_id_rsa.pub"
        );
    }

    #[test]
    fn test_prefix() {
        assert_eq!(filename_prefix(None), "UNKNOWN_");
        assert_eq!(filename_prefix(Some("station1")), "station1_");
        assert_eq!(filename_prefix(Some("../x")), ".._x_");
    }

    #[test]
    fn test_status_messages() {
        assert_eq!(UploadStatus::Ok.message(UploadKind::Key), "ok");
        assert_eq!(UploadStatus::Failed.message(UploadKind::Log), "Log upload failed");
        assert_eq!(UploadStatus::Failed.message(UploadKind::Key), "key upload failed");
        assert_eq!(UploadStatus::NothingPosted.message(UploadKind::Log), "No log posted");
        assert_eq!(UploadStatus::NothingPosted.message(UploadKind::Key), "No key posted");
    }

    #[tokio::test]
    async fn test_log_upload_writes_and_notifies() {
        let filestore = TempFilestore::new();
        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .withf(|n| {
                n.subject == "MS Datasync Log Upload (station1)"
                    && n.body.contains("has been uploaded: synclogs/station1_sync.log")
                    && n.recipients == vec!["ops@example.org".to_string()]
            })
            .times(1)
            .returning(|_| Ok(()));
        let ingestor = UploadIngestor::new(filestore.clone(), Arc::new(notifier), recipients());

        let written = ingestor
            .ingest(UploadKind::Log, Some("station1"), "sync.log", b"log line".to_vec())
            .await;

        assert!(written);
        let content =
            std::fs::read(filestore.root().join("synclogs/station1_sync.log")).unwrap();
        assert_eq!(content, b"log line");
    }

    #[tokio::test]
    async fn test_write_failure_still_notifies() {
        let filestore = TempFilestore::new();
        filestore.read_only.store(true, Ordering::SeqCst);
        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .withf(|n| n.body.starts_with("MS Datasync keyfile upload failed"))
            .times(1)
            .returning(|_| Ok(()));
        let ingestor = UploadIngestor::new(filestore, Arc::new(notifier), recipients());

        let written = ingestor
            .ingest(UploadKind::Key, None, "id_rsa.pub", b"ssh-rsa AAAA".to_vec())
            .await;
        assert!(!written);
        assert_eq!(UploadIngestor::status(written).message(UploadKind::Key), "key upload failed");
    }

    #[tokio::test]
    async fn test_notification_failure_is_ignored() {
        let filestore = TempFilestore::new();
        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .returning(|_| Err(SyncError::Notification("gateway down".to_string())));
        let ingestor = UploadIngestor::new(filestore.clone(), Arc::new(notifier), recipients());

        assert!(
            ingestor
                .ingest(UploadKind::Key, Some("station1"), "key", b"ssh-rsa AAAA".to_vec())
                .await
        );
        assert!(filestore.root().join("publickeys/station1_id_rsa.pub").exists());
    }
}
