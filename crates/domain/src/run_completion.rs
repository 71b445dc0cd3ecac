use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use datasync_core::models::RunState;
use datasync_core::traits::{Notification, Notifier, RunRepository, RunSampleRepository};
use datasync_core::{SyncError, SyncResult};

/// 整批完成的结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunCompletionOutcome {
    pub run_id: i64,
    pub samples_marked: u64,
    pub notified: bool,
}

/// Run级别的完成状态维护
pub struct RunCompletion {
    runs: Arc<dyn RunRepository>,
    samples: Arc<dyn RunSampleRepository>,
    notifier: Arc<dyn Notifier>,
}

impl RunCompletion {
    pub fn new(
        runs: Arc<dyn RunRepository>,
        samples: Arc<dyn RunSampleRepository>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            runs,
            samples,
            notifier,
        }
    }

    /// 将Run下所有样本标记为完成，Run置为 COMPLETE，并通知创建者
    pub async fn mark_run_complete(&self, run_id: i64) -> SyncResult<RunCompletionOutcome> {
        let run = self
            .runs
            .find_by_id(run_id)
            .await?
            .ok_or(SyncError::RunNotFound { id: run_id })?;

        let samples_marked = self.samples.mark_all_complete(run_id).await?;
        self.runs.update_state(run_id, RunState::Complete).await?;
        info!(run_id, samples_marked, "run marked complete");

        let notified = match run.creator.as_deref().filter(|c| !c.is_empty()) {
            Some(creator) => {
                let notification = Notification {
                    subject: format!("Run complete: {}", run.title),
                    body: format!(
                        "Run {} ({}) has been marked complete, {} sample(s) received.",
                        run.id, run.title, samples_marked
                    ),
                    recipients: vec![creator.to_string()],
                };
                match self.notifier.notify(&notification).await {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(run_id, error = %e, "unable to notify run creator");
                        false
                    }
                }
            }
            None => false,
        };

        Ok(RunCompletionOutcome {
            run_id,
            samples_marked,
            notified,
        })
    }

    /// 对账后根据样本完成情况重新推导Run状态，返回推导后的状态
    pub async fn refresh_run_state(&self, run_id: i64) -> SyncResult<RunState> {
        let run = self
            .runs
            .find_by_id(run_id)
            .await?
            .ok_or(SyncError::RunNotFound { id: run_id })?;

        let flags: Vec<bool> = self
            .samples
            .find_with_files_by_run(run_id)
            .await?
            .iter()
            .map(|sample| sample.complete)
            .collect();

        let state = run.derive_state(&flags);
        if state != run.state {
            self.runs.update_state(run_id, state).await?;
            info!(run_id, from = run.state.as_str(), to = state.as_str(), "run state changed");
        } else {
            debug!(run_id, state = state.as_str(), "run state unchanged");
        }
        Ok(state)
    }
}
