//! # 数据模型
//!
//! 同步子系统使用的核心数据结构。
//!
//! ## 核心模型
//!
//! ### NodeClient - 仪器节点
//! 由 (机构, 站点, 工作站) 三元组唯一标识，携带主机名、用户名、能力标记和交付规则。
//!
//! ### Run / RunSample - 采集批次与期望文件
//! Run 分配给唯一节点；RunSample 记录期望的数据文件名及其 `complete` 标记。
//! `complete` 是最近一次对账时文件存在性的缓存，不是保证。
//!
//! ### ManifestEntry - 清单条目
//! 每次请求临时计算，文件名 -> `[run_id, runsample_id, relative_path, exists]`。
//!
//! ## 状态流转
//!
//! ```text
//! NEW → IN_PROGRESS → COMPLETE
//!          ↑              │
//!          └──────────────┘ (文件被删除后重新对账)
//! ```
//!
//! ## 文件布局
//!
//! ```text
//! <repository root>/runs/<YYYY>/<MM>/<run_id>/<filename>
//! <repository root>/synclogs/<node>_<logfile>
//! <repository root>/publickeys/<node>_id_rsa.pub
//! ```

pub mod manifest;
pub mod node;
pub mod run;

pub use manifest::*;
pub use node::*;
pub use run::*;
