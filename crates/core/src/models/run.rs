use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::errors::SyncError;
use crate::types::UpdateValue;

/// Run生命周期状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RunState {
    #[serde(rename = "NEW")]
    New,
    #[serde(rename = "IN_PROGRESS")]
    InProgress,
    #[serde(rename = "COMPLETE")]
    Complete,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::New => "NEW",
            RunState::InProgress => "IN_PROGRESS",
            RunState::Complete => "COMPLETE",
        }
    }
}

impl FromStr for RunState {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(RunState::New),
            "IN_PROGRESS" => Ok(RunState::InProgress),
            "COMPLETE" => Ok(RunState::Complete),
            _ => Err(SyncError::Serialization(format!("无效的Run状态: {s}"))),
        }
    }
}

/// 分配给某个节点的一批仪器采集任务
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub id: i64,
    pub title: String,
    pub experiment_id: Option<i64>,
    pub machine_id: i64,
    pub state: RunState,
    pub creator: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Run {
    pub fn is_complete(&self) -> bool {
        matches!(self.state, RunState::Complete)
    }

    /// Run数据目录相对于文件仓库根目录的路径: runs/<YYYY>/<MM>/<run_id>
    pub fn relative_dir(&self) -> String {
        format!(
            "runs/{}/{:02}/{}",
            self.created_at.year(),
            self.created_at.month(),
            self.id
        )
    }

    /// 根据样本完成情况推导Run状态
    ///
    /// `flags` 为该Run下所有需要文件的样本的 complete 标记。
    pub fn derive_state(&self, flags: &[bool]) -> RunState {
        let total = flags.len();
        let done = flags.iter().filter(|complete| **complete).count();

        if total == 0 {
            self.state
        } else if done == total {
            RunState::Complete
        } else if done > 0 || self.is_complete() {
            RunState::InProgress
        } else {
            self.state
        }
    }
}

/// Run与样本的关联，记录期望的数据文件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSample {
    pub id: i64,
    pub run_id: i64,
    pub sample_id: i64,
    pub filename: Option<String>,
    pub complete: bool,
    pub sequence: i32,
    pub vial_number: Option<i32>,
    pub method_number: Option<i32>,
}

impl RunSample {
    /// 文件名为空或未设置时不期望任何文件
    pub fn expected_filename(&self) -> Option<&str> {
        self.filename.as_deref().filter(|name| !name.is_empty())
    }

    /// 返回 (绝对目录, 相对目录)
    pub fn filepaths(&self, run: &Run, root: &Path) -> (PathBuf, String) {
        let relative = run.relative_dir();
        (root.join(&relative), relative)
    }

    /// 数据文件绝对路径；无期望文件时返回 None
    pub fn absolute_path(&self, run: &Run, root: &Path) -> Option<PathBuf> {
        let filename = self.expected_filename()?;
        let (dir, _) = self.filepaths(run, root);
        Some(dir.join(filename))
    }

    pub fn apply_update(&mut self, update: RunSampleUpdate) -> bool {
        let changed = update.has_changes();
        self.filename = update.filename.apply_to(self.filename.take());
        self.sequence = update.sequence.apply_to_required(self.sequence);
        self.vial_number = update.vial_number.apply_to(self.vial_number);
        self.method_number = update.method_number.apply_to(self.method_number);
        changed
    }
}

crate::update_request! {
    /// RunSample可更新字段白名单；complete 标记只能由对账流程修改
    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    #[serde(deny_unknown_fields)]
    pub struct RunSampleUpdate {
        #[serde(default)]
        pub filename: UpdateValue<String>,
        #[serde(default)]
        pub sequence: UpdateValue<i32>,
        #[serde(default)]
        pub vial_number: UpdateValue<i32>,
        #[serde(default)]
        pub method_number: UpdateValue<i32>,
    }
}
