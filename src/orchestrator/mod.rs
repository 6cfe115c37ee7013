//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责对账和上传调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量案例处理器
//! - 管理应用生命周期（初始化、运行）
//! - 逐个加载案例文件，等待每个案例的后台上传结束
//! - 保存台账、归档案例、输出全局统计
//!
//! ### `pipeline` - 对账入口
//! - 匹配 → 创建 → 分组，同步完成
//! - 把工作集交给后台上传任务后立即返回
//!
//! ### `assignment` - 文件分配协作方
//! - 人工分配界面的接口，以及按目录 / 固定表两种内置实现
//!
//! ### `upload_worker` - 后台上传任务
//! - 分配 → 组装 → 逐个申请人上传，可取消
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<ScrapedCase>)
//!     ↓
//! pipeline (处理一个案例的候选申请人)
//!     ↓
//! upload_worker (后台，逐个申请人)
//!     ↓
//! workflow::UploadFlow (处理单个申请人的批次)
//!     ↓
//! services (能力层：classify / match / write / assemble / warn)
//!     ↓
//! infrastructure (基础设施：RecordStore / ProcessingEndpoint / 本地文件 / 台账)
//! ```

pub mod assignment;
pub mod batch_processor;
pub mod pipeline;
pub mod upload_worker;

// 重新导出主要类型
pub use assignment::{AssignmentCollaborator, Assignments, FolderAssignment, StaticAssignment};
pub use batch_processor::App;
pub use pipeline::{PipelineCoordinator, ReconcileSummary};
pub use upload_worker::{UploadHandle, UploadReport, UploadWorker};
