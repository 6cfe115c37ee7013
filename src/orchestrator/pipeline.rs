//! 对账与上传入口
//!
//! `reconcile_and_queue` 同步完成对账（匹配 → 创建 → 分组），
//! 然后把工作集交给后台上传任务并立即返回。

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::AppResult;
use crate::infrastructure::{
    LocalStorage, PipelineContext, ProcessedLedger, ProcessingEndpoint, RecordStore,
};
use crate::models::{generate_grouping_id, Applicant, Application, Lender};
use crate::orchestrator::assignment::{AssignmentCollaborator, FolderAssignment};
use crate::orchestrator::upload_worker::{UploadHandle, UploadWorker};
use crate::services::{
    BatchAssembler, FetchFailurePolicy, KeywordTable, MatchOutcome, Matcher, RecordWriter,
    WarnWriter,
};
use crate::workflow::UploadFlow;

/// 对账结果
#[derive(Debug, Clone, Default)]
pub struct ReconcileSummary {
    /// 工作集人数（匹配到的 + 新建的）
    pub applicant_count: usize,
    pub working_set: Vec<Applicant>,
    /// 匹配到已有记录的候选人
    pub matched: Vec<String>,
    /// 新建记录的候选人
    pub created: Vec<String>,
    /// 因拉取失败或创建失败而跳过的候选人
    pub failed: Vec<String>,
    /// 有新建申请人时才会有
    pub application: Option<Application>,
}

pub struct PipelineCoordinator {
    matcher: Matcher,
    writer: RecordWriter,
    assembler: Arc<BatchAssembler>,
    flow: Arc<UploadFlow>,
    collaborator: Arc<dyn AssignmentCollaborator>,
    ledger: Arc<ProcessedLedger>,
    warn_writer: WarnWriter,
    shutdown: CancellationToken,
}

impl PipelineCoordinator {
    /// 默认按目录分配文件；配置了关键词表文件时加载它
    pub fn new(
        config: &Config,
        store: Arc<dyn RecordStore>,
        endpoint: Arc<dyn ProcessingEndpoint>,
        ledger: Arc<ProcessedLedger>,
    ) -> AppResult<Self> {
        let table = match &config.keyword_table_file {
            Some(path) => {
                info!("📋 使用自定义关键词表: {}", path);
                KeywordTable::load(Path::new(path))?
            }
            None => KeywordTable::default(),
        };
        let assembler = Arc::new(BatchAssembler::new(
            LocalStorage::new(&config.download_root),
            Arc::new(table),
            ledger.clone(),
        ));

        Ok(Self {
            matcher: Matcher::new(
                store.clone(),
                FetchFailurePolicy::from_legacy_flag(config.legacy_match_fallback),
            ),
            writer: RecordWriter::new(store),
            collaborator: Arc::new(FolderAssignment::new(assembler.clone())),
            assembler,
            flow: Arc::new(UploadFlow::new(config, endpoint)),
            ledger,
            warn_writer: WarnWriter::with_path(&config.failure_log_file),
            shutdown: CancellationToken::new(),
        })
    }

    /// 替换文件分配协作方
    pub fn with_collaborator(mut self, collaborator: Arc<dyn AssignmentCollaborator>) -> Self {
        self.collaborator = collaborator;
        self
    }

    pub fn assembler(&self) -> Arc<BatchAssembler> {
        self.assembler.clone()
    }

    pub fn ledger(&self) -> Arc<ProcessedLedger> {
        self.ledger.clone()
    }

    /// 取消它会取消所有已排队的后台上传
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// 对账并在后台开始上传
    pub async fn reconcile_and_queue(
        &self,
        candidates: &[Applicant],
        lenders: &[Lender],
    ) -> (ReconcileSummary, UploadHandle) {
        let summary = self.reconcile(candidates, lenders).await;
        let handle = self.queue(summary.working_set.clone());
        (summary, handle)
    }

    /// 启动后台上传，使用新的进度表和取消信号
    pub fn queue(&self, working_set: Vec<Applicant>) -> UploadHandle {
        self.queue_with(working_set, self.collaborator.clone())
    }

    /// 用指定的分配协作方启动后台上传
    pub fn queue_with(
        &self,
        working_set: Vec<Applicant>,
        collaborator: Arc<dyn AssignmentCollaborator>,
    ) -> UploadHandle {
        let pipeline = PipelineContext::child_of(self.ledger.clone(), &self.shutdown);
        let worker = Arc::new(UploadWorker::new(
            collaborator,
            self.assembler.clone(),
            self.flow.clone(),
        ));
        info!("🚚 后台上传已排队: {} 位申请人", working_set.len());
        worker.spawn(working_set, pipeline)
    }

    /// 对账：匹配到的并入工作集，未匹配的新建；有新建时创建一条申请记录并给工作集打上分组标识
    pub async fn reconcile(&self, candidates: &[Applicant], lenders: &[Lender]) -> ReconcileSummary {
        let mut summary = ReconcileSummary::default();
        let mut working_set: Vec<Applicant> = Vec::new();
        let mut seen_records: HashSet<String> = HashSet::new();
        let mut created_record_ids: Vec<String> = Vec::new();

        for candidate in candidates {
            let name = candidate.full_name();
            match self.matcher.find_existing(candidate).await {
                MatchOutcome::Matched(found) => {
                    info!("✓ {} 已存在 ({} 条记录)，不再创建", name, found.len());
                    for applicant in found {
                        let fresh = applicant
                            .record_id
                            .as_ref()
                            .map_or(true, |id| seen_records.insert(id.clone()));
                        if fresh {
                            working_set.push(applicant);
                        }
                    }
                    summary.matched.push(name);
                }
                MatchOutcome::NotFound => match self.writer.create_applicant(candidate).await {
                    Ok(record) => {
                        seen_records.insert(record.record_id.clone());
                        created_record_ids.push(record.record_id.clone());
                        working_set.push(candidate.with_record(&record));
                        summary.created.push(name);
                    }
                    Err(e) => {
                        error!("❌ 创建申请人 {} 失败: {}", name, e);
                        self.record_skipped(&name, &format!("创建记录失败: {}", e));
                        summary.failed.push(name);
                    }
                },
                MatchOutcome::FetchError(e) => {
                    error!("❌ 无法查询 {} 是否已存在，跳过以免重复创建: {}", name, e);
                    self.record_skipped(&name, &format!("查询记录失败: {}", e));
                    summary.failed.push(name);
                }
            }
        }

        if !created_record_ids.is_empty() {
            self.create_lenders(lenders).await;

            let grouping_id = generate_grouping_id();
            let mut application = Application::new(&grouping_id, created_record_ids.clone());
            match self.writer.create_application(&created_record_ids).await {
                Ok(ids) => application.record_ids = ids,
                Err(e) => warn!("⚠️ 创建申请记录失败，申请人仍按分组上传: {}", e),
            }

            for applicant in &mut working_set {
                applicant.application_id = Some(grouping_id.clone());
                applicant.application_record_id = application.record_ids.first().cloned();
            }
            info!(
                "📎 分组 {}: {} 位申请人（新建 {} 位）",
                grouping_id,
                working_set.len(),
                created_record_ids.len()
            );
            summary.application = Some(application);
        }

        summary.applicant_count = working_set.len();
        summary.working_set = working_set;
        summary
    }

    fn record_skipped(&self, applicant: &str, reason: &str) {
        if let Err(e) = self.warn_writer.write(applicant, None, reason) {
            error!("写入失败记录失败: {}", e);
        }
    }

    /// 贷款机构只在有新申请人时创建；不查询记录库是否已存在，同一次运行中同名只提交一次，失败只记录
    async fn create_lenders(&self, lenders: &[Lender]) {
        let mut posted: HashSet<&str> = HashSet::new();
        for lender in lenders {
            if !posted.insert(lender.company_name.as_str()) {
                continue;
            }
            if let Err(e) = self.writer.create_lender(lender).await {
                warn!("⚠️ 创建贷款机构 {} 失败: {}", lender.company_name, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::fakes::{FakeProcessingEndpoint, FakeRecordStore};
    use crate::models::Datasheet;
    use crate::orchestrator::assignment::StaticAssignment;
    use std::sync::atomic::Ordering;

    struct Fixture {
        _dir: tempfile::TempDir,
        store: Arc<FakeRecordStore>,
        endpoint: Arc<FakeProcessingEndpoint>,
        coordinator: PipelineCoordinator,
    }

    fn fixture(config: Config) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            download_root: dir.path().to_string_lossy().to_string(),
            failure_log_file: dir.path().join("failed.txt").to_string_lossy().to_string(),
            upload_retry_backoff_ms: 1,
            ..config
        };
        let store = Arc::new(FakeRecordStore::new());
        let endpoint = Arc::new(FakeProcessingEndpoint::new());
        let coordinator = PipelineCoordinator::new(
            &config,
            store.clone(),
            endpoint.clone(),
            Arc::new(ProcessedLedger::in_memory()),
        )
        .unwrap();
        Fixture {
            _dir: dir,
            store,
            endpoint,
            coordinator,
        }
    }

    fn candidate(first: &str, last: &str) -> Applicant {
        Applicant::candidate(first, last, Default::default())
    }

    #[tokio::test]
    async fn existing_applicant_is_never_created_again() {
        let f = fixture(Config::default());
        f.store.seed_applicant("rec1", "A-1", "Jane", "Doe").await;

        let summary = f
            .coordinator
            .reconcile(&[candidate("Jane", "Doe")], &[Lender::new("Harbour Bank")])
            .await;

        assert_eq!(summary.matched, vec!["Jane Doe".to_string()]);
        assert!(summary.application.is_none());
        assert!(f.store.created.lock().await.is_empty());
        assert_eq!(summary.working_set[0].application_id, None);
    }

    #[tokio::test]
    async fn new_applicants_are_grouped_with_matched_ones() {
        let f = fixture(Config::default());
        f.store.seed_applicant("rec1", "A-1", "Jane", "Doe").await;

        let summary = f
            .coordinator
            .reconcile(
                &[candidate("Jane", "Doe"), candidate("John", "Roe")],
                &[Lender::new("Harbour Bank"), Lender::new("Harbour Bank")],
            )
            .await;

        assert_eq!(summary.applicant_count, 2);
        assert_eq!(f.store.created_in(Datasheet::Applicants).await.len(), 1);
        assert_eq!(f.store.created_in(Datasheet::Applications).await.len(), 1);
        assert_eq!(f.store.created_in(Datasheet::Lenders).await.len(), 1);

        let application = summary.application.unwrap();
        assert_eq!(application.member_record_ids.len(), 1);
        let grouping = Some(application.grouping_id.clone());
        assert!(summary.working_set.iter().all(|a| a.application_id == grouping));
        assert!(summary
            .working_set
            .iter()
            .all(|a| a.application_record_id == application.record_ids.first().cloned()));
    }

    #[tokio::test]
    async fn duplicate_candidates_in_one_run_create_one_record() {
        let f = fixture(Config::default());

        let summary = f
            .coordinator
            .reconcile(&[candidate("John", "Roe"), candidate("John", "Roe")], &[])
            .await;

        assert_eq!(summary.created.len(), 1);
        assert_eq!(summary.matched.len(), 1);
        assert_eq!(summary.applicant_count, 1);
    }

    #[tokio::test]
    async fn fetch_failure_skips_creation_unless_legacy() {
        let f = fixture(Config::default());
        f.store.fail_fetch.store(true, Ordering::SeqCst);
        let summary = f.coordinator.reconcile(&[candidate("John", "Roe")], &[]).await;
        assert_eq!(summary.failed, vec!["John Roe".to_string()]);
        assert!(f.store.created.lock().await.is_empty());
        let failures = std::fs::read_to_string(f._dir.path().join("failed.txt")).unwrap();
        assert!(failures.contains("申请人 John Roe | 文件 -"));

        let legacy = fixture(Config {
            legacy_match_fallback: true,
            ..Config::default()
        });
        legacy.store.fail_fetch.store(true, Ordering::SeqCst);
        let summary = legacy.coordinator.reconcile(&[candidate("John", "Roe")], &[]).await;
        assert_eq!(summary.created, vec!["John Roe".to_string()]);
    }

    #[tokio::test]
    async fn queue_returns_before_uploads_finish_and_one_failure_does_not_block_others() {
        let f = fixture(Config::default());
        let root = f.coordinator.assembler().storage().root().to_path_buf();
        for folder in ["Jane Doe", "John Roe"] {
            std::fs::create_dir_all(root.join(folder)).unwrap();
            std::fs::write(root.join(folder).join("payslip1.pdf"), b"x").unwrap();
        }
        f.endpoint.fail_for("Jane Doe").await;

        let coordinator = f.coordinator.with_collaborator(Arc::new(
            StaticAssignment::default()
                .with("Jane Doe", &["payslip1.pdf"])
                .with("John Roe", &["payslip1.pdf"]),
        ));
        let handle = coordinator.queue(vec![candidate("Jane", "Doe"), candidate("John", "Roe")]);
        let report = handle.wait().await.unwrap();

        assert_eq!(report.failed_files(), 1);
        assert_eq!(report.uploaded_files(), 1);
        assert!(report.outcome_for("John Roe").unwrap().is_success());
        assert!(!report.is_clean());
        let ledger = coordinator.ledger();
        assert!(ledger.is_processed("John Roe", "payslip1.pdf"));
        assert!(!ledger.is_processed("Jane Doe", "payslip1.pdf"));
    }

    #[tokio::test]
    async fn cancel_during_upload_stops_before_next_applicant() {
        let f = fixture(Config::default());
        let root = f.coordinator.assembler().storage().root().to_path_buf();
        for (folder, name) in [("Jane Doe", "a.pdf"), ("John Roe", "b.pdf")] {
            std::fs::create_dir_all(root.join(folder)).unwrap();
            std::fs::write(root.join(folder).join(name), b"x").unwrap();
        }
        // Jane 的请求被接受后立即取消
        *f.endpoint.cancel_after_upload.lock().await = Some(f.coordinator.shutdown_token());

        let report = f
            .coordinator
            .queue(vec![candidate("Jane", "Doe"), candidate("John", "Roe")])
            .wait()
            .await
            .unwrap();

        assert!(report.cancelled);
        assert_eq!(report.outcome_for("Jane Doe").unwrap().uploaded, vec!["a.pdf".to_string()]);
        let john = report.outcome_for("John Roe").unwrap();
        assert!(john.cancelled);
        assert_eq!(john.pending, vec!["b.pdf".to_string()]);
        assert!(john.uploaded.is_empty());

        let requests = f.endpoint.requests.lock().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].applicant.first_name, "Jane");
        assert!(!f.coordinator.ledger().is_processed("John Roe", "b.pdf"));
    }

    #[tokio::test]
    async fn shutdown_cancels_every_queued_upload() {
        let f = fixture(Config::default());
        let root = f.coordinator.assembler().storage().root().to_path_buf();
        std::fs::create_dir_all(root.join("Jane Doe")).unwrap();
        std::fs::write(root.join("Jane Doe").join("a.pdf"), b"x").unwrap();

        f.coordinator.shutdown_token().cancel();
        let report = f
            .coordinator
            .queue(vec![candidate("Jane", "Doe")])
            .wait()
            .await
            .unwrap();

        assert!(report.cancelled);
        assert_eq!(f.endpoint.request_count().await, 0);
        assert_eq!(
            report.outcome_for("Jane Doe").unwrap().pending,
            vec!["a.pdf".to_string()]
        );
    }
}
