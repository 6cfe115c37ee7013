//! 基础设施层（Infrastructure Layer）
//!
//! 持有稀缺资源（远程连接、本地文件、共享状态），只暴露能力，不包含业务流程。
//!
//! - `RecordStore` - 记录库读写能力（GET / POST records）
//! - `ProcessingEndpoint` - 处理端点上传能力（multipart）
//! - `LocalStorage` - 下载目录中的文件发现与读取
//! - `ProcessedLedger` - 每位申请人已上传文件的台账（Mutex 保护）
//! - `ProgressTracker` - 每位申请人的上传进度（供轮询）
//! - `PipelineContext` - 以上共享状态的显式句柄，替代全局变量

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::AppResult;
use crate::models::{Datasheet, RemoteRecord, StoreResponse, UploadReceipt, UploadRequest};

#[cfg(any(test, feature = "test-util"))]
pub mod fakes;
pub mod local_storage;
pub mod processed_ledger;
pub mod progress;

pub use local_storage::LocalStorage;
pub use processed_ledger::ProcessedLedger;
pub use progress::{BatchProgress, BatchState, InFlightGuard, ProgressTracker};

/// 远程记录库
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// 拉取数据表中的全部记录
    async fn fetch_records(&self, datasheet: Datasheet) -> AppResult<Vec<RemoteRecord>>;

    /// 创建记录，返回状态码和响应体，由调用方判断是否成功
    async fn create_records(&self, datasheet: Datasheet, body: JsonValue)
        -> AppResult<StoreResponse>;
}

/// 下游处理端点
#[async_trait]
pub trait ProcessingEndpoint: Send + Sync {
    /// 提交一次 multipart 上传；非 2xx 或网络错误返回 Err
    async fn upload(&self, request: &UploadRequest) -> AppResult<UploadReceipt>;
}

/// 一次对账运行的共享状态
///
/// 由 `PipelineCoordinator` 持有，后台上传任务持有其克隆
#[derive(Clone, Default)]
pub struct PipelineContext {
    pub ledger: Arc<ProcessedLedger>,
    pub progress: Arc<ProgressTracker>,
    pub cancel: CancellationToken,
}

impl PipelineContext {
    /// 共享台账，新的进度表，取消信号挂在 `parent` 之下
    pub fn child_of(ledger: Arc<ProcessedLedger>, parent: &CancellationToken) -> Self {
        Self {
            ledger,
            progress: Arc::new(ProgressTracker::default()),
            cancel: parent.child_token(),
        }
    }
}
