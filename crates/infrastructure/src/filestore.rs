use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use datasync_core::config::RepositoryConfig;
use datasync_core::traits::Filestore;
use datasync_core::{SyncError, SyncResult};

/// 本地磁盘文件仓库
///
/// 新建的目录使用共享组和 setgid 组可写权限，写入的文件随后修正属组和权限，
/// 保证同组的其他服务可以读取客户端上传的内容。
pub struct LocalFilestore {
    root: PathBuf,
    group_id: Option<u32>,
    dir_mode: u32,
    file_mode: u32,
}

impl LocalFilestore {
    pub fn new(root: impl Into<PathBuf>, group_id: Option<u32>, dir_mode: u32, file_mode: u32) -> Self {
        Self {
            root: root.into(),
            group_id,
            dir_mode,
            file_mode,
        }
    }

    pub fn from_config(config: &RepositoryConfig) -> Self {
        Self::new(
            config.root.clone(),
            config.group_id,
            config.dir_mode,
            config.file_mode,
        )
    }

    /// 逐级创建目录，只对本次新建的目录修正属组和权限
    fn ensure_dir(&self, relative: &Path) -> SyncResult<PathBuf> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root).map_err(|e| SyncError::io(&self.root, e))?;
            self.fix_ownership(&self.root, self.dir_mode)?;
        }

        let mut current = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => current.push(part),
                Component::CurDir => continue,
                _ => {
                    return Err(SyncError::Validation(format!(
                        "无效的相对路径: {}",
                        relative.display()
                    )))
                }
            }
            if !current.is_dir() {
                fs::create_dir(&current).map_err(|e| SyncError::io(&current, e))?;
                self.fix_ownership(&current, self.dir_mode)?;
                debug!(path = %current.display(), "创建目录");
            }
        }
        Ok(current)
    }

    #[cfg(unix)]
    fn fix_ownership(&self, path: &Path, mode: u32) -> SyncResult<()> {
        use std::os::unix::fs::PermissionsExt;

        if let Some(gid) = self.group_id {
            std::os::unix::fs::chown(path, None, Some(gid)).map_err(|e| SyncError::io(path, e))?;
        }
        let mut perms = fs::metadata(path)
            .map_err(|e| SyncError::io(path, e))?
            .permissions();
        perms.set_mode(mode);
        fs::set_permissions(path, perms).map_err(|e| SyncError::io(path, e))
    }

    #[cfg(not(unix))]
    fn fix_ownership(&self, _path: &Path, _mode: u32) -> SyncResult<()> {
        Ok(())
    }
}

impl Filestore for LocalFilestore {
    fn root(&self) -> &Path {
        &self.root
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn write(&self, relative: &str, bytes: &[u8]) -> SyncResult<PathBuf> {
        let relative = Path::new(relative);
        let file_name = relative
            .file_name()
            .ok_or_else(|| SyncError::Validation(format!("缺少文件名: {}", relative.display())))?;
        let dir = self.ensure_dir(relative.parent().unwrap_or(Path::new("")))?;

        let path = dir.join(file_name);
        fs::write(&path, bytes).map_err(|e| SyncError::io(&path, e))?;
        self.fix_ownership(&path, self.file_mode)?;
        debug!(path = %path.display(), size = bytes.len(), "文件写入完成");
        Ok(path)
    }
}
