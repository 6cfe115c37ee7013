//! 批量案例处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责逐个处理抓取程序输出的案例文件。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：写日志头、加载已处理台账、创建记录库和处理端点客户端
//! 2. **批量加载**：扫描并加载所有待处理的案例（`Vec<ScrapedCase>`）
//! 3. **逐案处理**：对账 → 后台上传 → 等待上传结束 → 保存台账
//! 4. **归档**：没有任何失败的案例文件改名为 `.done`
//! 5. **中断处理**：Ctrl-C 取消所有后台上传，已完成的部分保留
//! 6. **全局统计**：汇总所有案例的上传结果

use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::clients::{ProcessingClient, RecordsClient};
use crate::config::Config;
use crate::infrastructure::ProcessedLedger;
use crate::models::{archive_case_file, load_all_case_files, ScrapedCase};
use crate::orchestrator::assignment::StaticAssignment;
use crate::orchestrator::pipeline::PipelineCoordinator;
use crate::utils::logging::{
    init_log_file, log_case_start, log_cases_loaded, log_startup, print_final_stats,
};

/// 应用主结构
pub struct App {
    config: Config,
    coordinator: PipelineCoordinator,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        // 初始化日志文件
        init_log_file(&config.output_log_file)?;

        log_startup(
            &config.records_api_base_url,
            &config.processing_endpoint_url,
            config.max_files_per_request,
        );

        if config.records_api_token.is_empty() {
            warn!("⚠️ 未设置 RECORDS_API_TOKEN，记录库请求可能被拒绝");
        }

        let ledger = match &config.processed_ledger_file {
            Some(path) => ProcessedLedger::load(path)?,
            None => ProcessedLedger::in_memory(),
        };

        let coordinator = PipelineCoordinator::new(
            &config,
            Arc::new(RecordsClient::new(&config)?),
            Arc::new(ProcessingClient::new(&config)?),
            Arc::new(ledger),
        )?;

        Ok(Self {
            config,
            coordinator,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<()> {
        let cases = self.load_cases().await?;

        if cases.is_empty() {
            warn!("⚠️ 没有找到待处理的案例文件，程序结束");
            return Ok(());
        }
        log_cases_loaded(cases.len());

        // Ctrl-C 取消所有后台上传
        let shutdown = self.coordinator.shutdown_token();
        let listener = tokio::spawn({
            let shutdown = shutdown.clone();
            async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("\n⏹️ 收到中断信号，正在取消上传...");
                    shutdown.cancel();
                }
            }
        });

        let mut stats = ProcessingStats::default();
        let total = cases.len();
        for (idx, case) in cases.iter().enumerate() {
            if shutdown.is_cancelled() {
                warn!("⏹️ 已中断，剩余 {} 个案例未处理", total - idx);
                break;
            }
            stats.cases += 1;
            if let Err(e) = self.process_case(idx + 1, total, case, &mut stats).await {
                error!("[案例 {}] ❌ 处理过程中发生错误: {}", idx + 1, e);
            }
        }
        listener.abort();

        print_final_stats(
            stats.uploaded,
            stats.failed,
            stats.cases,
            &self.config.output_log_file,
        );
        Ok(())
    }

    /// 加载案例
    async fn load_cases(&self) -> Result<Vec<ScrapedCase>> {
        info!("\n📁 正在扫描待处理的案例...");
        Ok(load_all_case_files(&self.config.case_folder).await?)
    }

    /// 处理单个案例
    async fn process_case(
        &self,
        case_index: usize,
        total: usize,
        case: &ScrapedCase,
        stats: &mut ProcessingStats,
    ) -> Result<()> {
        let candidates = case.candidates();
        let lenders = case.lenders();
        log_case_start(case_index, total, candidates.len());

        if candidates.is_empty() {
            warn!("[案例 {}] ⚠️ 没有可用的申请人，跳过", case_index);
            return Ok(());
        }

        let (summary, handle) = match case.assignment_map() {
            Some(map) => {
                info!("[案例 {}] 📋 使用案例文件中的人工分配", case_index);
                let summary = self.coordinator.reconcile(&candidates, &lenders).await;
                let handle = self.coordinator.queue_with(
                    summary.working_set.clone(),
                    Arc::new(StaticAssignment::new(map)),
                );
                (summary, handle)
            }
            None => {
                self.coordinator
                    .reconcile_and_queue(&candidates, &lenders)
                    .await
            }
        };

        info!(
            "[案例 {}] 👥 对账完成: 工作集 {} 位 | 已存在 {} | 新建 {} | 失败 {}",
            case_index,
            summary.applicant_count,
            summary.matched.len(),
            summary.created.len(),
            summary.failed.len()
        );

        let report = handle.wait().await?;
        stats.uploaded += report.uploaded_files();
        stats.failed += report.failed_files();

        if let Err(e) = self.coordinator.ledger().save() {
            error!("[案例 {}] ❌ 保存处理台账失败: {}", case_index, e);
        }

        if report.is_clean() && summary.failed.is_empty() {
            if let Some(path) = &case.file_path {
                let archived = archive_case_file(path).await?;
                info!("[案例 {}] ✓ 已归档: {}", case_index, archived.display());
            }
        } else {
            warn!(
                "[案例 {}] ⚠️ 有未完成的项目，案例文件保留以便重新提交",
                case_index
            );
        }
        Ok(())
    }
}

/// 处理统计
#[derive(Debug, Default)]
struct ProcessingStats {
    cases: usize,
    uploaded: usize,
    failed: usize,
}
