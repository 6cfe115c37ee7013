//! 后台上传任务
//!
//! 对账完成后在独立的 tokio 任务中运行：分配文件 → 组装批次 → 逐个申请人上传。
//! 申请人之间顺序执行，每位申请人开始前检查取消信号。

use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::{AppError, AppResult};
use crate::infrastructure::{BatchProgress, PipelineContext, ProgressTracker};
use crate::models::Applicant;
use crate::orchestrator::assignment::AssignmentCollaborator;
use crate::services::BatchAssembler;
use crate::workflow::{UploadCtx, UploadFlow, UploadOutcome};

/// 一次后台上传的汇总
#[derive(Debug, Clone, Default)]
pub struct UploadReport {
    pub outcomes: Vec<UploadOutcome>,
    /// 没有可上传文件的申请人
    pub skipped: Vec<String>,
    /// 文件分配失败的原因
    pub assignment_error: Option<String>,
    pub cancelled: bool,
}

impl UploadReport {
    pub fn uploaded_files(&self) -> usize {
        self.outcomes.iter().map(|o| o.uploaded.len()).sum()
    }

    pub fn failed_files(&self) -> usize {
        self.outcomes.iter().map(|o| o.failed.len()).sum()
    }

    /// 没有失败、没有取消、分配正常
    pub fn is_clean(&self) -> bool {
        !self.cancelled && self.assignment_error.is_none() && self.outcomes.iter().all(UploadOutcome::is_success)
    }

    pub fn outcome_for(&self, applicant: &str) -> Option<&UploadOutcome> {
        self.outcomes.iter().find(|o| o.applicant == applicant)
    }
}

/// 后台上传任务的句柄
pub struct UploadHandle {
    progress: Arc<ProgressTracker>,
    cancel: CancellationToken,
    task: JoinHandle<UploadReport>,
}

impl UploadHandle {
    /// 当前各申请人的进度快照
    pub fn progress(&self) -> Vec<BatchProgress> {
        self.progress.snapshot()
    }

    /// 请求取消；正在进行的请求会完成，之后的申请人不再上传
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// 等待任务结束
    pub async fn wait(self) -> AppResult<UploadReport> {
        self.task
            .await
            .map_err(|e| AppError::Other(format!("后台上传任务异常退出: {}", e)))
    }
}

pub struct UploadWorker {
    collaborator: Arc<dyn AssignmentCollaborator>,
    assembler: Arc<BatchAssembler>,
    flow: Arc<UploadFlow>,
}

impl UploadWorker {
    pub fn new(
        collaborator: Arc<dyn AssignmentCollaborator>,
        assembler: Arc<BatchAssembler>,
        flow: Arc<UploadFlow>,
    ) -> Self {
        Self {
            collaborator,
            assembler,
            flow,
        }
    }

    /// 启动后台任务并立即返回句柄
    pub fn spawn(self: Arc<Self>, working_set: Vec<Applicant>, pipeline: PipelineContext) -> UploadHandle {
        let progress = pipeline.progress.clone();
        let cancel = pipeline.cancel.clone();
        let task = tokio::spawn(async move { self.run(working_set, pipeline).await });
        UploadHandle {
            progress,
            cancel,
            task,
        }
    }

    async fn run(&self, working_set: Vec<Applicant>, pipeline: PipelineContext) -> UploadReport {
        let mut report = UploadReport::default();

        let assignments = match self.collaborator.assign(&working_set).await {
            Ok(assignments) => assignments,
            Err(e) => {
                error!("❌ 文件分配失败，本次不上传: {}", e);
                report.assignment_error = Some(e.to_string());
                return report;
            }
        };

        let batches = self.assembler.assemble_all(&assignments, &working_set).await;
        let total = batches.len();

        for (index, (applicant, batch)) in batches.into_iter().enumerate() {
            let ctx = UploadCtx::new(applicant.full_name(), index + 1, total);

            if pipeline.cancel.is_cancelled() {
                warn!("{} ⏹️ 已取消，不再上传", ctx);
                report.cancelled = true;
                if !batch.is_empty() {
                    report.outcomes.push(UploadOutcome {
                        applicant: ctx.applicant_key.clone(),
                        pending: batch.file_names(),
                        cancelled: true,
                        ..Default::default()
                    });
                }
                continue;
            }

            if batch.is_empty() {
                info!("{} 没有待上传的文件", ctx);
                report.skipped.push(ctx.applicant_key.clone());
                continue;
            }

            let outcome = self.flow.submit(&ctx, &applicant, batch, &pipeline).await;
            report.cancelled |= outcome.cancelled;
            report.outcomes.push(outcome);
        }

        info!(
            "📊 后台上传结束: 成功 {} 个文件 | 失败 {} 个文件 | 跳过 {} 位申请人",
            report.uploaded_files(),
            report.failed_files(),
            report.skipped.len()
        );
        report
    }
}
