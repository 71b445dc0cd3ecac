use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 清单条目，序列化为 `[run_id, runsample_id, relative_path, exists]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry(pub i64, pub i64, pub String, pub bool);

impl ManifestEntry {
    pub fn new(run_id: i64, runsample_id: i64, relative_path: impl Into<String>, exists: bool) -> Self {
        Self(run_id, runsample_id, relative_path.into(), exists)
    }

    pub fn run_id(&self) -> i64 {
        self.0
    }

    pub fn runsample_id(&self) -> i64 {
        self.1
    }

    pub fn relative_path(&self) -> &str {
        &self.2
    }

    /// 服务器文件仓库中是否已存在该文件，仅供客户端参考
    pub fn exists(&self) -> bool {
        self.3
    }
}

/// 单个Run内的 文件名 -> 清单条目
pub type RunFiles = BTreeMap<String, ManifestEntry>;

/// 扁平化后返回给客户端的文件清单
pub type FileManifest = BTreeMap<String, ManifestEntry>;

/// 服务器期望接收的文件，按完成标记分为两组，均以 run_id 为键
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpectedFiles {
    pub complete: BTreeMap<i64, RunFiles>,
    pub incomplete: BTreeMap<i64, RunFiles>,
}

impl ExpectedFiles {
    pub fn is_empty(&self) -> bool {
        self.complete.is_empty() && self.incomplete.is_empty()
    }

    /// 合并为扁平清单。按 run_id 升序遍历，跨Run重名时后者覆盖前者。
    pub fn flatten(&self, include_completed: bool) -> FileManifest {
        let mut files = FileManifest::new();
        for run_files in self.incomplete.values() {
            files.extend(run_files.iter().map(|(name, entry)| (name.clone(), entry.clone())));
        }
        if include_completed {
            for run_files in self.complete.values() {
                files.extend(run_files.iter().map(|(name, entry)| (name.clone(), entry.clone())));
            }
        }
        files
    }
}

/// 上传文件类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadKind {
    Log,
    Key,
}

impl UploadKind {
    /// 文件仓库中的目标子目录
    pub fn directory(&self) -> &'static str {
        match self {
            UploadKind::Log => "synclogs",
            UploadKind::Key => "publickeys",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UploadKind::Log => "log",
            UploadKind::Key => "key",
        }
    }
}

impl fmt::Display for UploadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 对账计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationCounts {
    pub total_runs: usize,
    pub total_samples: usize,
    pub total_found: usize,
}

/// 单个条目的对账失败记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationFailure {
    pub run_id: String,
    pub runsample: String,
    pub message: String,
}

/// 一次对账请求的结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub success: bool,
    pub synced_samples: BTreeMap<String, Vec<i64>>,
    pub counts: ReconciliationCounts,
    pub failures: Vec<ReconciliationFailure>,
}

impl ReconciliationReport {
    pub fn description(&self) -> String {
        format!(
            "Success - {}/{} samples marked complete, from {} run(s)",
            self.counts.total_found, self.counts.total_samples, self.counts.total_runs
        )
    }

    /// 最后一个失败条目的错误信息，没有失败时为 "None"
    pub fn error_text(&self) -> String {
        self.failures
            .last()
            .map(|failure| failure.message.clone())
            .unwrap_or_else(|| "None".to_string())
    }
}
