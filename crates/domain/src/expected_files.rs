use std::collections::btree_map::Entry;
use std::sync::Arc;

use tracing::{debug, warn};

use datasync_core::models::{ExpectedFiles, ManifestEntry, NodeClient, RunFiles};
use datasync_core::traits::{Filestore, RunRepository, RunSampleRepository};
use datasync_core::SyncResult;

/// 计算节点仍需上传的文件
///
/// 只读操作，可重复、并发调用；结果按 run_id 和文件名排序，
/// 没有写入时两次调用的序列化结果完全相同。
pub struct ExpectedFileResolver {
    runs: Arc<dyn RunRepository>,
    samples: Arc<dyn RunSampleRepository>,
    filestore: Arc<dyn Filestore>,
}

impl ExpectedFileResolver {
    pub fn new(
        runs: Arc<dyn RunRepository>,
        samples: Arc<dyn RunSampleRepository>,
        filestore: Arc<dyn Filestore>,
    ) -> Self {
        Self {
            runs,
            samples,
            filestore,
        }
    }

    pub async fn resolve(
        &self,
        node: &NodeClient,
        include_completed: bool,
    ) -> SyncResult<ExpectedFiles> {
        let mut expected = ExpectedFiles::default();
        let runs = self.runs.find_by_machine(node.id).await?;

        for run in runs
            .iter()
            .filter(|run| include_completed || !run.is_complete())
        {
            let samples = self.samples.find_with_files_by_run(run.id).await?;
            for sample in &samples {
                let Some(filename) = sample.expected_filename() else {
                    continue;
                };
                let (absolute_dir, relative_dir) = sample.filepaths(run, self.filestore.root());
                let exists = self.filestore.exists(&absolute_dir.join(filename));

                let bucket: &mut RunFiles = if sample.complete {
                    expected.complete.entry(run.id).or_default()
                } else {
                    expected.incomplete.entry(run.id).or_default()
                };

                match bucket.entry(filename.to_string()) {
                    Entry::Vacant(slot) => {
                        slot.insert(ManifestEntry::new(run.id, sample.id, relative_dir, exists));
                    }
                    Entry::Occupied(existing) => {
                        warn!(
                            run_id = run.id,
                            runsample_id = sample.id,
                            kept_runsample_id = existing.get().runsample_id(),
                            filename,
                            "duplicate filename in run, keeping first runsample"
                        );
                    }
                }
            }
        }

        debug!(
            node = %node.key(),
            complete_runs = expected.complete.len(),
            incomplete_runs = expected.incomplete.len(),
            "期望文件计算完成"
        );
        Ok(expected)
    }
}
