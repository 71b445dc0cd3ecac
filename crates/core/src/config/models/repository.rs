use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 文件仓库配置
///
/// `root` 存放仪器数据、客户端日志和公钥；`persistent_root` 是管理端
/// 文件下载的根目录，未设置时与 `root` 相同。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    pub root: PathBuf,
    #[serde(default)]
    pub persistent_root: Option<PathBuf>,
    /// 共享用户组，新建目录和文件会 chown 到该组
    #[serde(default)]
    pub group_id: Option<u32>,
    pub dir_mode: u32,
    pub file_mode: u32,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("data/repository"),
            persistent_root: None,
            group_id: None,
            dir_mode: 0o2775,
            file_mode: 0o664,
        }
    }
}

impl RepositoryConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.root.as_os_str().is_empty() {
            return Err(anyhow::anyhow!("文件仓库根目录不能为空"));
        }

        if self.dir_mode > 0o7777 {
            return Err(anyhow::anyhow!("目录权限无效: {:o}", self.dir_mode));
        }

        if self.file_mode > 0o7777 {
            return Err(anyhow::anyhow!("文件权限无效: {:o}", self.file_mode));
        }

        if self.dir_mode & 0o700 != 0o700 {
            return Err(anyhow::anyhow!("目录权限必须允许属主读写执行"));
        }

        Ok(())
    }

    pub fn persistent_root(&self) -> PathBuf {
        self.persistent_root
            .clone()
            .unwrap_or_else(|| self.root.clone())
    }
}
