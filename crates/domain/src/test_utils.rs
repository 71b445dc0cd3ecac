//! 单元测试用的内存实现

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use mockall::mock;
use tempfile::TempDir;

use datasync_core::models::{
    NewNodeClient, NodeClient, NodeKey, NodeRule, Run, RunSample, RunState,
};
use datasync_core::traits::{
    Filestore, NodeClientRepository, Notification, Notifier, RunRepository, RunSampleRepository,
};
use datasync_core::{SyncError, SyncResult};

pub fn node(id: i64, organisation: &str, site: &str, station: &str) -> NodeClient {
    NodeClient {
        id,
        organisation_name: organisation.to_string(),
        site_name: site.to_string(),
        station_name: station.to_string(),
        hostname: Some(format!("{station}.local")),
        username: Some("syncuser".to_string()),
        flags: None,
        created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    }
}

pub fn run(id: i64, machine_id: i64, state: RunState) -> Run {
    Run {
        id,
        title: format!("run {id}"),
        experiment_id: None,
        machine_id,
        state,
        creator: Some("scientist@example.org".to_string()),
        created_at: Utc.with_ymd_and_hms(2024, 3, 9, 10, 0, 0).unwrap(),
    }
}

pub fn runsample(id: i64, run_id: i64, filename: Option<&str>, complete: bool) -> RunSample {
    RunSample {
        id,
        run_id,
        sample_id: id * 10,
        filename: filename.map(str::to_string),
        complete,
        sequence: id as i32,
        vial_number: None,
        method_number: None,
    }
}

/// 三个仓储接口的内存实现，`fail` 置位后所有调用返回数据库错误
#[derive(Default)]
pub struct MemoryStore {
    pub nodes: Mutex<HashMap<i64, NodeClient>>,
    pub rules: Mutex<Vec<NodeRule>>,
    pub runs: Mutex<HashMap<i64, Run>>,
    pub samples: Mutex<HashMap<i64, RunSample>>,
    pub fail: AtomicBool,
    pub fail_rules: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_node(&self, node: NodeClient) {
        self.nodes.lock().unwrap().insert(node.id, node);
    }

    pub fn add_rule(&self, node_id: i64, description: &str) {
        let mut rules = self.rules.lock().unwrap();
        let id = rules.len() as i64 + 1;
        rules.push(NodeRule {
            id,
            parent_node_id: node_id,
            description: description.to_string(),
        });
    }

    pub fn add_run(&self, run: Run) {
        self.runs.lock().unwrap().insert(run.id, run);
    }

    pub fn add_sample(&self, sample: RunSample) {
        self.samples.lock().unwrap().insert(sample.id, sample);
    }

    pub fn sample(&self, id: i64) -> RunSample {
        self.samples.lock().unwrap()[&id].clone()
    }

    pub fn run_state(&self, id: i64) -> RunState {
        self.runs.lock().unwrap()[&id].state
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn check(&self) -> SyncResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            Err(SyncError::DatabaseOperation("storage offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl NodeClientRepository for MemoryStore {
    async fn find_by_key(&self, key: &NodeKey) -> SyncResult<Option<NodeClient>> {
        self.check()?;
        Ok(self
            .nodes
            .lock()
            .unwrap()
            .values()
            .find(|node| &node.key() == key)
            .cloned())
    }

    async fn find_by_id(&self, id: i64) -> SyncResult<Option<NodeClient>> {
        self.check()?;
        Ok(self.nodes.lock().unwrap().get(&id).cloned())
    }

    async fn list(&self) -> SyncResult<Vec<NodeClient>> {
        self.check()?;
        let mut nodes: Vec<_> = self.nodes.lock().unwrap().values().cloned().collect();
        nodes.sort_by(|a, b| {
            (&a.organisation_name, &a.site_name, &a.station_name).cmp(&(
                &b.organisation_name,
                &b.site_name,
                &b.station_name,
            ))
        });
        Ok(nodes)
    }

    async fn create(&self, new: &NewNodeClient) -> SyncResult<NodeClient> {
        self.check()?;
        let mut nodes = self.nodes.lock().unwrap();
        let key = NodeKey::new(&new.organisation_name, &new.site_name, &new.station_name);
        if nodes.values().any(|node| node.key() == key) {
            return Err(SyncError::NodeAlreadyExists {
                key: key.to_string(),
            });
        }
        let node = NodeClient {
            id: nodes.keys().max().copied().unwrap_or(0) + 1,
            organisation_name: new.organisation_name.clone(),
            site_name: new.site_name.clone(),
            station_name: new.station_name.clone(),
            hostname: new.hostname.clone(),
            username: new.username.clone(),
            flags: new.flags.clone(),
            created_at: Utc::now(),
        };
        nodes.insert(node.id, node.clone());
        Ok(node)
    }

    async fn update(&self, node: &NodeClient) -> SyncResult<()> {
        self.check()?;
        self.nodes.lock().unwrap().insert(node.id, node.clone());
        Ok(())
    }

    async fn rules_for(&self, node_id: i64) -> SyncResult<Vec<NodeRule>> {
        self.check()?;
        if self.fail_rules.load(Ordering::SeqCst) {
            return Err(SyncError::DatabaseOperation("rules table missing".to_string()));
        }
        Ok(self
            .rules
            .lock()
            .unwrap()
            .iter()
            .filter(|rule| rule.parent_node_id == node_id)
            .cloned()
            .collect())
    }

    async fn add_rule(&self, node_id: i64, description: &str) -> SyncResult<NodeRule> {
        self.check()?;
        MemoryStore::add_rule(self, node_id, description);
        Ok(self.rules.lock().unwrap().last().cloned().unwrap())
    }
}

#[async_trait]
impl RunRepository for MemoryStore {
    async fn find_by_machine(&self, node_id: i64) -> SyncResult<Vec<Run>> {
        self.check()?;
        let mut runs: Vec<_> = self
            .runs
            .lock()
            .unwrap()
            .values()
            .filter(|run| run.machine_id == node_id)
            .cloned()
            .collect();
        runs.sort_by_key(|run| run.id);
        Ok(runs)
    }

    async fn find_by_id(&self, id: i64) -> SyncResult<Option<Run>> {
        self.check()?;
        Ok(self.runs.lock().unwrap().get(&id).cloned())
    }

    async fn update_state(&self, id: i64, state: RunState) -> SyncResult<()> {
        self.check()?;
        match self.runs.lock().unwrap().get_mut(&id) {
            Some(run) => {
                run.state = state;
                Ok(())
            }
            None => Err(SyncError::RunNotFound { id }),
        }
    }
}

#[async_trait]
impl RunSampleRepository for MemoryStore {
    async fn find_by_id(&self, id: i64) -> SyncResult<Option<RunSample>> {
        self.check()?;
        Ok(self.samples.lock().unwrap().get(&id).cloned())
    }

    async fn find_with_files_by_run(&self, run_id: i64) -> SyncResult<Vec<RunSample>> {
        self.check()?;
        let mut samples: Vec<_> = self
            .samples
            .lock()
            .unwrap()
            .values()
            .filter(|rs| rs.run_id == run_id && rs.expected_filename().is_some())
            .cloned()
            .collect();
        samples.sort_by_key(|rs| (rs.sequence, rs.id));
        Ok(samples)
    }

    async fn set_complete(&self, id: i64, complete: bool) -> SyncResult<()> {
        self.check()?;
        match self.samples.lock().unwrap().get_mut(&id) {
            Some(rs) => {
                rs.complete = complete;
                Ok(())
            }
            None => Err(SyncError::RunSampleNotFound { id }),
        }
    }

    async fn mark_all_complete(&self, run_id: i64) -> SyncResult<u64> {
        self.check()?;
        let mut count = 0;
        for rs in self.samples.lock().unwrap().values_mut() {
            if rs.run_id == run_id {
                rs.complete = true;
                count += 1;
            }
        }
        Ok(count)
    }

    async fn update(&self, sample: &RunSample) -> SyncResult<()> {
        self.check()?;
        self.samples.lock().unwrap().insert(sample.id, sample.clone());
        Ok(())
    }
}

/// 基于临时目录的文件仓库，权限修正省略
pub struct TempFilestore {
    dir: TempDir,
    pub read_only: AtomicBool,
}

impl TempFilestore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            dir: TempDir::new().unwrap(),
            read_only: AtomicBool::new(false),
        })
    }

    /// 在文件仓库中创建一个文件
    pub fn touch(&self, relative: &str) -> PathBuf {
        let path = self.dir.path().join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"data").unwrap();
        path
    }

    pub fn remove(&self, relative: &str) {
        std::fs::remove_file(self.dir.path().join(relative)).unwrap();
    }
}

impl Filestore for TempFilestore {
    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn write(&self, relative: &str, bytes: &[u8]) -> SyncResult<PathBuf> {
        let path = self.absolute(relative);
        if self.read_only.load(Ordering::SeqCst) {
            return Err(SyncError::io(
                &path,
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            ));
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SyncError::io(parent, e))?;
        }
        std::fs::write(&path, bytes).map_err(|e| SyncError::io(&path, e))?;
        Ok(path)
    }
}

mock! {
    pub Notifier {}

    #[async_trait]
    impl Notifier for Notifier {
        async fn notify(&self, notification: &Notification) -> SyncResult<()>;
    }
}
