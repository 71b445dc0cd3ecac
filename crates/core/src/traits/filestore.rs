use std::path::{Path, PathBuf};

use crate::{SyncError, SyncResult};

/// 服务器文件仓库抽象
///
/// 文件系统操作均为同步阻塞调用，异步上下文中的大文件写入应放到
/// `tokio::task::spawn_blocking` 中执行。
pub trait Filestore: Send + Sync {
    /// 文件仓库根目录，同时作为客户端的 rootdir 下发
    fn root(&self) -> &Path;

    /// 测试路径是否存在（文件或目录，.d 数据目录也算）
    fn exists(&self, path: &Path) -> bool;

    /// 将字节写入根目录下的相对路径，必要时以共享组权限创建目录，
    /// 写完后修正文件属主与权限。返回写入的绝对路径。
    fn write(&self, relative: &str, bytes: &[u8]) -> SyncResult<PathBuf>;

    /// 列出根目录下某个相对目录中的文件名，目录不存在时返回空列表
    fn list(&self, relative: &str) -> SyncResult<Vec<String>> {
        list_file_names(&self.absolute(relative))
    }

    fn absolute(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }
}

/// 目录中普通文件的文件名，已排序；目录不存在时返回空列表
pub fn list_file_names(dir: &Path) -> SyncResult<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| SyncError::io(dir, e))? {
        let entry = entry.map_err(|e| SyncError::io(dir, e))?;
        if entry.path().is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}
