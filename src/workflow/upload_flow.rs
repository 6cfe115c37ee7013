//! 上传流程 - 流程层
//!
//! 核心职责：定义"一位申请人的批次"的完整上传流程
//!
//! 流程顺序：
//! 1. 按单次请求的文件上限切分子批次
//! 2. 读取文件 → 构建 multipart 请求 → 提交（网络错误按指数退避重试）
//! 3. 成功：更新进度、写入已处理台账；失败：写入失败记录，文件留待下次提交
//! 4. 结束时进度恰好为 100

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, BusinessError};
use crate::infrastructure::{
    BatchState, LocalStorage, PipelineContext, ProcessingEndpoint,
};
use crate::models::{
    Applicant, ApplicantPayload, Document, UploadBatch, UploadFile, UploadReceipt, UploadRequest,
};
use crate::services::WarnWriter;
use crate::workflow::upload_ctx::UploadCtx;

/// 单位申请人的上传结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadOutcome {
    pub applicant: String,
    /// 被端点接受的文件
    pub uploaded: Vec<String>,
    /// 失败的文件（已写入失败记录）
    pub failed: Vec<String>,
    /// 因取消而未提交的文件
    pub pending: Vec<String>,
    /// 每个成功子批次之后的进度
    pub progress_trail: Vec<f64>,
    /// 端点返回的最后一条状态
    pub status: Option<String>,
    pub cancelled: bool,
}

impl UploadOutcome {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && !self.cancelled
    }
}

/// 上传流程
///
/// - 只处理一位申请人的一个批次
/// - 不决定哪些文件属于哪位申请人
/// - 失败不会抛出，全部体现在 `UploadOutcome` 中
pub struct UploadFlow {
    endpoint: Arc<dyn ProcessingEndpoint>,
    storage: LocalStorage,
    warn_writer: WarnWriter,
    max_files_per_request: usize,
    max_retries: usize,
    retry_backoff: Duration,
    verbose_logging: bool,
}

impl UploadFlow {
    pub fn new(config: &Config, endpoint: Arc<dyn ProcessingEndpoint>) -> Self {
        Self {
            endpoint,
            storage: LocalStorage::new(&config.download_root),
            warn_writer: WarnWriter::with_path(&config.failure_log_file),
            max_files_per_request: config.max_files_per_request.max(1),
            max_retries: config.upload_max_retries,
            retry_backoff: config.retry_backoff(),
            verbose_logging: config.verbose_logging,
        }
    }

    pub async fn submit(
        &self,
        ctx: &UploadCtx,
        applicant: &Applicant,
        mut batch: UploadBatch,
        pipeline: &PipelineContext,
    ) -> UploadOutcome {
        let mut outcome = UploadOutcome {
            applicant: ctx.applicant_key.clone(),
            ..Default::default()
        };
        if batch.is_empty() {
            debug!("{} 批次为空，跳过", ctx);
            return outcome;
        }

        let guard = pipeline.progress.begin(&ctx.applicant_key, batch.total_count);
        let chunks: Vec<Vec<Document>> = batch
            .documents
            .chunks(self.max_files_per_request)
            .map(<[Document]>::to_vec)
            .collect();
        let chunk_total = chunks.len();

        info!(
            "{} 📤 开始上传 {} 个文件（{} 个请求）",
            ctx, batch.total_count, chunk_total
        );

        for (chunk_index, chunk) in chunks.into_iter().enumerate() {
            if pipeline.cancel.is_cancelled() {
                warn!("{} ⏹️ 上传已取消，剩余文件留待下次提交", ctx);
                outcome.cancelled = true;
                outcome.pending.extend(chunk.iter().map(|d| d.file_name.clone()));
                continue;
            }

            let files = self.read_files(ctx, &chunk, &mut outcome).await;
            if files.is_empty() {
                continue;
            }
            let names: Vec<String> = files.iter().map(|f| f.file_name.clone()).collect();
            let request = UploadRequest {
                applicant: ApplicantPayload::from(applicant),
                files,
            };

            if self.verbose_logging {
                debug!("{} 子批次 {}/{}: {:?}", ctx, chunk_index + 1, chunk_total, names);
            }

            match self.send_with_retry(ctx, &request, pipeline).await {
                Ok(receipt) => {
                    pipeline.ledger.mark_processed(&ctx.applicant_key, names.iter().cloned());
                    let percent = batch.record_submitted(names.len());
                    let status = receipt.status_line();
                    guard.advance(batch.processed_count, percent, status.clone());
                    info!(
                        "{} ✓ 子批次 {}/{} 已接受，进度 {:.0}% ({})",
                        ctx,
                        chunk_index + 1,
                        chunk_total,
                        percent,
                        status
                    );
                    outcome.progress_trail.push(percent);
                    outcome.status = Some(status);
                    outcome.uploaded.extend(names);
                }
                Err(AppError::Business(BusinessError::Cancelled)) => {
                    warn!("{} ⏹️ 重试等待中被取消", ctx);
                    outcome.cancelled = true;
                    outcome.pending.extend(names);
                }
                Err(e) => {
                    error!(
                        "{} ❌ 子批次 {}/{} 上传失败: {}",
                        ctx,
                        chunk_index + 1,
                        chunk_total,
                        e
                    );
                    for name in &names {
                        self.record_failure(ctx, name, &e.to_string());
                    }
                    outcome.failed.extend(names);
                }
            }
        }

        let final_percent = batch.complete();
        let (state, status) = if outcome.cancelled {
            (BatchState::Cancelled, "已取消".to_string())
        } else if !outcome.failed.is_empty() {
            (
                BatchState::Failed,
                format!("{} 个文件上传失败", outcome.failed.len()),
            )
        } else {
            (
                BatchState::Completed,
                outcome.status.clone().unwrap_or_else(|| "已完成".to_string()),
            )
        };
        guard.finish(state, status);

        info!(
            "{} 📊 上传结束: 成功 {} | 失败 {} | 未提交 {} | 进度 {:.0}%",
            ctx,
            outcome.uploaded.len(),
            outcome.failed.len(),
            outcome.pending.len(),
            final_percent
        );
        outcome
    }

    /// 读取子批次中的文件；读不到的文件记为失败
    async fn read_files(
        &self,
        ctx: &UploadCtx,
        chunk: &[Document],
        outcome: &mut UploadOutcome,
    ) -> Vec<UploadFile> {
        let mut files = Vec::with_capacity(chunk.len());
        for doc in chunk {
            match self.storage.read(&doc.path).await {
                Ok(bytes) => files.push(UploadFile {
                    file_name: doc.file_name.clone(),
                    mime_type: doc.mime_type.clone(),
                    category: doc.classified_type,
                    bytes,
                }),
                Err(e) => {
                    warn!("{} ⚠️ 读取文件失败，跳过 {}: {}", ctx, doc.file_name, e);
                    self.record_failure(ctx, &doc.file_name, &e.to_string());
                    outcome.failed.push(doc.file_name.clone());
                }
            }
        }
        files
    }

    /// 提交请求，网络错误按指数退避重试
    async fn send_with_retry(
        &self,
        ctx: &UploadCtx,
        request: &UploadRequest,
        pipeline: &PipelineContext,
    ) -> AppResult<UploadReceipt> {
        let mut attempt = 0;
        loop {
            match self.endpoint.upload(request).await {
                Ok(receipt) => return Ok(receipt),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = backoff_delay(self.retry_backoff, attempt);
                    attempt += 1;
                    warn!(
                        "{} ⚠️ 上传失败 (第 {}/{} 次重试，{:?} 后): {}",
                        ctx, attempt, self.max_retries, delay, e
                    );
                    tokio::select! {
                        _ = pipeline.cancel.cancelled() => {
                            return Err(BusinessError::Cancelled.into());
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn record_failure(&self, ctx: &UploadCtx, file_name: &str, reason: &str) {
        if let Err(e) = self.warn_writer.write(&ctx.applicant_key, Some(file_name), reason) {
            error!("{} 写入失败记录失败: {}", ctx, e);
        }
    }
}

/// 第 `attempt` 次重试前的等待：`base * 2^attempt`，溢出时取最大值
fn backoff_delay(base: Duration, attempt: usize) -> Duration {
    let factor = u32::try_from(attempt)
        .ok()
        .and_then(|n| 2u32.checked_pow(n))
        .unwrap_or(u32::MAX);
    base.saturating_mul(factor)
}
