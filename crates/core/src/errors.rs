use thiserror::Error;

/// 同步服务错误类型定义
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("数据库操作错误: {0}")]
    DatabaseOperation(String),

    #[error("节点未找到: {key}")]
    NodeNotFound { key: String },

    #[error("节点ID未找到: {id}")]
    NodeIdNotFound { id: i64 },

    #[error("Run未找到: {id}")]
    RunNotFound { id: i64 },

    #[error("RunSample未找到: {id}")]
    RunSampleNotFound { id: i64 },

    #[error("文件不存在: {path}")]
    FileNotFound { path: String },

    #[error("节点已存在: {key}")]
    NodeAlreadyExists { key: String },

    #[error("参数验证失败: {0}")]
    Validation(String),

    #[error("文件操作失败 {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("序列化错误: {0}")]
    Serialization(String),

    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("通知发送失败: {0}")]
    Notification(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

impl SyncError {
    /// 包装文件系统错误并记录相关路径
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        SyncError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    /// 是否属于"记录不存在"类错误
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            SyncError::NodeNotFound { .. }
                | SyncError::NodeIdNotFound { .. }
                | SyncError::RunNotFound { .. }
                | SyncError::RunSampleNotFound { .. }
                | SyncError::FileNotFound { .. }
        )
    }
}

/// 统一的Result类型
pub type SyncResult<T> = std::result::Result<T, SyncError>;
