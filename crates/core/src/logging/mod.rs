//! 日志级别控制
//!
//! 日志级别是进程级状态：启动时由配置/命令行初始化，运行期间只能通过
//! [`LogLevelControl`] 句柄修改。句柄随应用状态传递，协议代码不直接访问全局订阅器。

pub mod log_level;

pub use log_level::LogLevel;

use crate::SyncResult;

/// 运行期日志级别控制句柄
pub trait LogLevelControl: Send + Sync {
    fn current(&self) -> LogLevel;

    fn set(&self, level: LogLevel) -> SyncResult<()>;
}
