//! 管理端工具：日志级别、日志文件浏览、文件下载、样本字段修正

use std::io::SeekFrom;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, info};

use datasync_core::models::{NodeClient, RunSample, RunSampleUpdate};
use datasync_core::traits::{
    list_file_names, Filestore, NodeClientRepository, RunSampleRepository,
};
use datasync_core::{LogLevel, LogLevelControl, SyncError, SyncResult};

/// 默认回看行数
pub const DEFAULT_TAIL_LINES: usize = 10;

/// 从文件末尾回看时每行预估的字节数，窗口不够时按 1.3 倍扩大
const TAIL_BYTES_PER_LINE: u64 = 75;

/// 管理首页的列表数据
#[derive(Debug, Clone, Serialize)]
pub struct UtilsListing {
    pub log_level: LogLevel,
    pub client_logs: Vec<String>,
    pub screenshots: Vec<String>,
    pub server_logs: Vec<String>,
    pub nodes: Vec<NodeClient>,
}

/// 日志尾部内容，`position` 为读取结束时的字节偏移，下次作为 `since` 传回
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogTail {
    pub data: String,
    pub position: u64,
}

#[derive(Debug, Clone)]
pub struct ServedFile {
    pub path: PathBuf,
    pub content_type: String,
    pub contents: Vec<u8>,
}

pub struct AdminUtilities {
    log_control: Arc<dyn LogLevelControl>,
    filestore: Arc<dyn Filestore>,
    nodes: Arc<dyn NodeClientRepository>,
    samples: Arc<dyn RunSampleRepository>,
    log_directory: Option<PathBuf>,
    persistent_root: PathBuf,
}

impl AdminUtilities {
    pub fn new(
        log_control: Arc<dyn LogLevelControl>,
        filestore: Arc<dyn Filestore>,
        nodes: Arc<dyn NodeClientRepository>,
        samples: Arc<dyn RunSampleRepository>,
        log_directory: Option<PathBuf>,
        persistent_root: PathBuf,
    ) -> Self {
        Self {
            log_control,
            filestore,
            nodes,
            samples,
            log_directory,
            persistent_root,
        }
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_control.current()
    }

    /// 接受级别名称或旧的数字代码
    pub fn set_log_level(&self, level: &str) -> SyncResult<LogLevel> {
        let level: LogLevel = level.parse()?;
        self.log_control.set(level)?;
        info!(level = %level, "logging level changed");
        Ok(level)
    }

    pub async fn utils(&self) -> SyncResult<UtilsListing> {
        let (screenshots, client_logs): (Vec<String>, Vec<String>) = self
            .filestore
            .list("synclogs")?
            .into_iter()
            .partition(|name| name.ends_with(".png"));

        let server_logs = match &self.log_directory {
            Some(dir) => list_file_names(dir)?,
            None => Vec::new(),
        };

        Ok(UtilsListing {
            log_level: self.log_control.current(),
            client_logs,
            screenshots,
            server_logs,
            nodes: self.nodes.list().await?,
        })
    }

    pub async fn tail_log(&self, filename: &str, linesback: usize, since: u64) -> SyncResult<LogTail> {
        if !is_single_component(filename) {
            return Err(SyncError::Validation(format!("无效的日志文件名: {filename}")));
        }
        let dir = self
            .log_directory
            .as_ref()
            .ok_or_else(|| SyncError::Configuration("未配置服务器日志目录".to_string()))?;
        let path = dir.join(filename);

        let mut file = tokio::fs::File::open(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => SyncError::FileNotFound {
                path: path.display().to_string(),
            },
            _ => SyncError::io(&path, e),
        })?;
        let position = file
            .metadata()
            .await
            .map_err(|e| SyncError::io(&path, e))?
            .len();

        let data = if since > 0 {
            let start = if since > position { 0 } else { since };
            let bytes = read_range(&mut file, &path, start, position).await?;
            String::from_utf8_lossy(&bytes).into_owned()
        } else {
            tail_lines(&mut file, &path, position, linesback).await?
        };

        debug!(file = %path.display(), since, position, "tail log");
        Ok(LogTail { data, position })
    }

    /// 解析持久化文件仓库下的路径，拒绝越出根目录的路径
    pub fn resolve_served_path(&self, requested: &str) -> SyncResult<PathBuf> {
        let relative = normalize(requested).ok_or_else(|| {
            SyncError::Validation(format!("路径越出文件仓库: {requested}"))
        })?;
        let path = self.persistent_root.join(relative);
        if !path.is_file() {
            return Err(SyncError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        Ok(path)
    }

    pub async fn serve_file(&self, requested: &str) -> SyncResult<ServedFile> {
        let path = self.resolve_served_path(requested)?;
        let contents = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => SyncError::FileNotFound {
                path: path.display().to_string(),
            },
            _ => SyncError::io(&path, e),
        })?;
        let content_type = mime_guess::from_path(&path)
            .first_or_octet_stream()
            .to_string();
        Ok(ServedFile {
            path,
            content_type,
            contents,
        })
    }

    /// RunSample 白名单字段修正，complete 标记不可在此修改
    pub async fn update_runsample(&self, id: i64, update: RunSampleUpdate) -> SyncResult<RunSample> {
        let mut sample = self
            .samples
            .find_by_id(id)
            .await?
            .ok_or(SyncError::RunSampleNotFound { id })?;
        if sample.apply_update(update) {
            self.samples.update(&sample).await?;
            info!(runsample_id = id, "runsample updated");
        }
        Ok(sample)
    }
}

fn is_single_component(name: &str) -> bool {
    if name.contains('\\') {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(components.next(), Some(Component::Normal(_))) && components.next().is_none()
}

/// 类似 posix normpath，去掉开头的 `/`；`..` 越过根目录时返回 None
fn normalize(requested: &str) -> Option<PathBuf> {
    let mut parts: Vec<&str> = Vec::new();
    for part in requested.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            part => parts.push(part),
        }
    }
    Some(parts.iter().collect())
}

fn last_lines(text: &str, linesback: usize) -> String {
    let mut lines: Vec<&str> = text.split('\n').collect();
    if text.ends_with('\n') {
        lines.pop();
    }
    let start = lines.len().saturating_sub(linesback);
    lines[start..].iter().map(|line| format!("{line}\n")).collect()
}

/// 读取 `[start, end)` 区间；文件在读取期间继续增长时多出的部分忽略
async fn read_range(
    file: &mut tokio::fs::File,
    path: &Path,
    start: u64,
    end: u64,
) -> SyncResult<Vec<u8>> {
    file.seek(SeekFrom::Start(start))
        .await
        .map_err(|e| SyncError::io(path, e))?;
    let mut bytes = Vec::new();
    file.take(end - start)
        .read_to_end(&mut bytes)
        .await
        .map_err(|e| SyncError::io(path, e))?;
    Ok(bytes)
}

/// 从末尾向前按窗口读取，直到窗口内包含足够的完整行
async fn tail_lines(
    file: &mut tokio::fs::File,
    path: &Path,
    end: u64,
    linesback: usize,
) -> SyncResult<String> {
    if linesback == 0 {
        return Ok(String::new());
    }
    let mut window = TAIL_BYTES_PER_LINE * linesback as u64;
    loop {
        let start = end.saturating_sub(window);
        let bytes = read_range(file, path, start, end).await?;
        let newlines = bytes.iter().filter(|b| **b == b'\n').count();
        if start == 0 || newlines > linesback {
            // 窗口起点落在行中间时丢弃这一残行
            let complete = match (start, bytes.iter().position(|b| *b == b'\n')) {
                (0, _) | (_, None) => &bytes[..],
                (_, Some(first)) => &bytes[first + 1..],
            };
            return Ok(last_lines(&String::from_utf8_lossy(complete), linesback));
        }
        window += window * 3 / 10 + 1;
    }
}
