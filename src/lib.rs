//! # Broker Intake
//!
//! 贷款申请人对账、文档分类与批量上传
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源，只暴露能力
//! - `RecordStore` / `ProcessingEndpoint` - 远程接口（`clients/` 中是 reqwest 实现）
//! - `LocalStorage` - 下载目录
//! - `ProcessedLedger` / `ProgressTracker` - 共享状态，由 `PipelineContext` 显式传递
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个对象
//! - `KeywordTable` - 文件名分类
//! - `Matcher` - 申请人查重
//! - `RecordWriter` - 创建申请人 / 贷款机构 / 申请记录
//! - `BatchAssembler` - 组装上传批次
//! - `WarnWriter` - 写失败记录
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一位申请人的批次"的完整上传流程
//! - `UploadCtx` - 上下文封装（申请人 + 序号）
//! - `UploadFlow` - 流程编排（切分 → 读取 → 提交 → 重试 → 台账）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/pipeline` - 对账并排队后台上传
//! - `orchestrator/batch_processor` - 批量案例处理器
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{PipelineContext, ProcessedLedger};
pub use models::{Applicant, Document, DocumentCategory, Lender, UploadBatch};
pub use orchestrator::{App, PipelineCoordinator, ReconcileSummary, UploadHandle, UploadReport};
pub use services::{classify, KeywordTable};
pub use workflow::{UploadCtx, UploadFlow, UploadOutcome};
