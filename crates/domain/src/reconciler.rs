//! 客户端上报与服务器文件存在性的对账
//!
//! 客户端上报 `{run_id: [runsample_id, ...]}`，服务器逐条检查文件是否存在，
//! 以检查结果覆盖 `complete` 标记。每个样本单独提交，处理到一半失败时
//! 已处理的条目保留，重复上报是安全的。

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use datasync_core::models::{ReconciliationFailure, ReconciliationReport};
use datasync_core::traits::{Filestore, RunRepository, RunSampleRepository};
use datasync_core::{SyncError, SyncResult};

use crate::run_completion::RunCompletion;

/// check-sample-files 接口的响应体
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckSampleFilesOutcome {
    pub success: bool,
    pub description: String,
    pub error: String,
    pub synced_samples: BTreeMap<String, Vec<i64>>,
}

impl CheckSampleFilesOutcome {
    pub fn no_files_given() -> Self {
        Self {
            success: false,
            description: "No files given".to_string(),
            error: "None".to_string(),
            synced_samples: BTreeMap::new(),
        }
    }

    pub fn malformed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            description: "Unable to parse runsamplefiles".to_string(),
            error: error.into(),
            synced_samples: BTreeMap::new(),
        }
    }
}

impl From<ReconciliationReport> for CheckSampleFilesOutcome {
    fn from(report: ReconciliationReport) -> Self {
        Self {
            success: report.success,
            description: report.description(),
            error: report.error_text(),
            synced_samples: report.synced_samples,
        }
    }
}

/// 上报中的一个Run及其样本id（原始JSON值，逐条解析）
pub type ReportedRuns = Vec<(String, Vec<Value>)>;

pub struct CompletionReconciler {
    runs: Arc<dyn RunRepository>,
    samples: Arc<dyn RunSampleRepository>,
    filestore: Arc<dyn Filestore>,
    completion: Arc<RunCompletion>,
}

impl CompletionReconciler {
    pub fn new(
        runs: Arc<dyn RunRepository>,
        samples: Arc<dyn RunSampleRepository>,
        filestore: Arc<dyn Filestore>,
        completion: Arc<RunCompletion>,
    ) -> Self {
        Self {
            runs,
            samples,
            filestore,
            completion,
        }
    }

    /// 处理表单字段 `runsamplefiles` 的原始内容
    pub async fn check_sample_files(&self, runsamplefiles: Option<&str>) -> CheckSampleFilesOutcome {
        let Some(raw) = runsamplefiles else {
            return CheckSampleFilesOutcome::no_files_given();
        };

        match parse_reported(raw) {
            Ok(reported) => self.reconcile(reported).await.into(),
            Err(e) => {
                warn!(error = %e, "malformed runsamplefiles payload");
                CheckSampleFilesOutcome::malformed(e.to_string())
            }
        }
    }

    pub async fn reconcile(&self, reported: ReportedRuns) -> ReconciliationReport {
        let mut report = ReconciliationReport {
            success: true,
            ..Default::default()
        };
        let mut touched_runs = BTreeSet::new();

        for (run_key, ids) in reported {
            report.counts.total_runs += 1;
            let synced = report.synced_samples.entry(run_key.clone()).or_default();

            for raw_id in ids {
                report.counts.total_samples += 1;
                match self.reconcile_one(&raw_id).await {
                    Ok((run_id, runsample_id, true)) => {
                        report.counts.total_found += 1;
                        synced.push(runsample_id);
                        touched_runs.insert(run_id);
                    }
                    Ok((run_id, _, false)) => {
                        touched_runs.insert(run_id);
                    }
                    Err(e) => {
                        warn!(run = %run_key, runsample = %raw_id, error = %e, "reconciliation failed for runsample");
                        report.success = false;
                        report.failures.push(ReconciliationFailure {
                            run_id: run_key.clone(),
                            runsample: display_id(&raw_id),
                            message: e.to_string(),
                        });
                    }
                }
            }
        }

        for run_id in touched_runs {
            if let Err(e) = self.completion.refresh_run_state(run_id).await {
                warn!(run_id, error = %e, "unable to refresh run state after reconciliation");
            }
        }

        info!(
            runs = report.counts.total_runs,
            samples = report.counts.total_samples,
            found = report.counts.total_found,
            failures = report.failures.len(),
            "reconciliation finished"
        );
        report
    }

    /// 返回 (run_id, runsample_id, 文件是否存在)
    async fn reconcile_one(&self, raw_id: &Value) -> SyncResult<(i64, i64, bool)> {
        let id = parse_id(raw_id)?;
        let sample = self
            .samples
            .find_by_id(id)
            .await?
            .ok_or(SyncError::RunSampleNotFound { id })?;
        let run = self
            .runs
            .find_by_id(sample.run_id)
            .await?
            .ok_or(SyncError::RunNotFound { id: sample.run_id })?;

        let exists = match sample.absolute_path(&run, self.filestore.root()) {
            Some(path) => {
                let exists = self.filestore.exists(&path);
                debug!(runsample_id = id, path = %path.display(), exists, "检查样本文件");
                exists
            }
            None => false,
        };

        self.samples.set_complete(id, exists).await?;
        Ok((run.id, id, exists))
    }
}

/// 解析上报内容，顶层必须是对象，每个值必须是数组
fn parse_reported(raw: &str) -> SyncResult<ReportedRuns> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| SyncError::Serialization(format!("runsamplefiles不是合法JSON: {e}")))?;

    let Value::Object(runs) = value else {
        return Err(SyncError::Validation(
            "runsamplefiles必须是以run_id为键的对象".to_string(),
        ));
    };

    runs.into_iter()
        .map(|(run_id, ids)| match ids {
            Value::Array(ids) => Ok((run_id, ids)),
            other => Err(SyncError::Validation(format!(
                "run {run_id} 的样本列表必须是数组，实际为: {other}"
            ))),
        })
        .collect()
}

fn parse_id(raw: &Value) -> SyncResult<i64> {
    match raw {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| SyncError::Validation(format!("无效的runsample id: {raw}")))
}

fn display_id(raw: &Value) -> String {
    match raw {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{run, runsample, MemoryStore, MockNotifier, TempFilestore};
    use datasync_core::models::RunState;

    fn reconciler(store: &Arc<MemoryStore>, filestore: &Arc<TempFilestore>) -> CompletionReconciler {
        let completion = Arc::new(RunCompletion::new(
            store.clone(),
            store.clone(),
            Arc::new(MockNotifier::new()),
        ));
        CompletionReconciler::new(store.clone(), store.clone(), filestore.clone(), completion)
    }

    fn store_with_run() -> Arc<MemoryStore> {
        let store = MemoryStore::new();
        store.add_run(run(1, 1, RunState::New));
        store.add_sample(runsample(10, 1, Some("A01.d"), false));
        store.add_sample(runsample(11, 1, Some("A02.d"), false));
        store
    }

    #[tokio::test]
    async fn test_missing_payload() {
        let outcome = reconciler(&MemoryStore::new(), &TempFilestore::new())
            .check_sample_files(None)
            .await;
        assert!(!outcome.success);
        assert_eq!(outcome.description, "No files given");
    }

    #[tokio::test]
    async fn test_malformed_payload() {
        let reconciler = reconciler(&MemoryStore::new(), &TempFilestore::new());

        let outcome = reconciler.check_sample_files(Some("{not json")).await;
        assert!(!outcome.success);
        assert!(outcome.error.contains("JSON"));

        let outcome = reconciler.check_sample_files(Some("[1, 2]")).await;
        assert!(!outcome.success);

        let outcome = reconciler.check_sample_files(Some(r#"{"1": 10}"#)).await;
        assert!(!outcome.success);
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_processed_items() {
        let store = store_with_run();
        let filestore = TempFilestore::new();
        filestore.touch("runs/2024/03/1/A01.d");

        let outcome = reconciler(&store, &filestore)
            .check_sample_files(Some(r#"{"1": [10, 999999]}"#))
            .await;

        assert!(!outcome.success);
        assert_eq!(outcome.synced_samples["1"], vec![10]);
        assert_eq!(
            outcome.description,
            "Success - 1/2 samples marked complete, from 1 run(s)"
        );
        assert!(outcome.error.contains("999999"));
        assert!(store.sample(10).complete);
    }

    #[tokio::test]
    async fn test_string_and_invalid_ids() {
        let store = store_with_run();
        let filestore = TempFilestore::new();
        filestore.touch("runs/2024/03/1/A02.d");

        let outcome = reconciler(&store, &filestore)
            .check_sample_files(Some(r#"{"1": ["11", "eleven"]}"#))
            .await;

        assert!(!outcome.success);
        assert_eq!(outcome.synced_samples["1"], vec![11]);
        assert!(outcome.error.contains("eleven"));
    }

    #[tokio::test]
    async fn test_self_healing_after_file_deleted() {
        let store = store_with_run();
        let filestore = TempFilestore::new();
        filestore.touch("runs/2024/03/1/A01.d");
        let reconciler = reconciler(&store, &filestore);

        let outcome = reconciler.check_sample_files(Some(r#"{"1": [10]}"#)).await;
        assert!(outcome.success);
        assert!(store.sample(10).complete);

        filestore.remove("runs/2024/03/1/A01.d");
        let outcome = reconciler.check_sample_files(Some(r#"{"1": [10]}"#)).await;
        assert!(outcome.success);
        assert!(outcome.synced_samples["1"].is_empty());
        assert!(!store.sample(10).complete);
        assert_eq!(
            outcome.description,
            "Success - 0/1 samples marked complete, from 1 run(s)"
        );
    }

    #[tokio::test]
    async fn test_run_state_follows_reconciliation() {
        let store = store_with_run();
        let filestore = TempFilestore::new();
        filestore.touch("runs/2024/03/1/A01.d");
        let reconciler = reconciler(&store, &filestore);

        reconciler.check_sample_files(Some(r#"{"1": [10, 11]}"#)).await;
        assert_eq!(store.run_state(1), RunState::InProgress);

        filestore.touch("runs/2024/03/1/A02.d");
        reconciler.check_sample_files(Some(r#"{"1": [11]}"#)).await;
        assert_eq!(store.run_state(1), RunState::Complete);
    }

    #[tokio::test]
    async fn test_empty_report() {
        let outcome = reconciler(&MemoryStore::new(), &TempFilestore::new())
            .check_sample_files(Some("{}"))
            .await;
        assert!(outcome.success);
        assert_eq!(outcome.error, "None");
        assert_eq!(
            outcome.description,
            "Success - 0/0 samples marked complete, from 0 run(s)"
        );
    }
}
