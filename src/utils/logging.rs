//! 日志工具模块
//!
//! 提供日志初始化、格式化和输出的辅助函数

use crate::error::{AppError, AppResult};
use std::fs;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化 tracing 日志
///
/// 默认级别为 info，可通过 `RUST_LOG` 覆盖；重复调用不会报错
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> AppResult<()> {
    let log_header = format!(
        "{}\n申请人处理日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)
        .map_err(|e| AppError::file_write_failed(log_file_path, e))?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(records_url: &str, endpoint_url: &str, max_files_per_request: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 申请人对账与文档上传");
    info!("🗂️ 记录库: {}", records_url);
    info!("📮 处理端点: {} (每次最多 {} 个文件)", endpoint_url, max_files_per_request);
    info!("{}", "=".repeat(60));
}

/// 记录案例加载信息
pub fn log_cases_loaded(total: usize) {
    info!("✓ 找到 {} 个待处理的案例", total);
    info!("💡 案例按顺序处理，上传在后台逐个申请人进行\n");
}

/// 记录案例开始信息
pub fn log_case_start(case_index: usize, total: usize, applicant_count: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始处理第 {}/{} 个案例", case_index, total);
    info!("👥 候选申请人: {} 位", applicant_count);
    info!("{}", "=".repeat(60));
}

/// 打印最终统计信息
pub fn print_final_stats(
    uploaded_files: usize,
    failed_files: usize,
    cases: usize,
    log_file_path: &str,
) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("📁 案例数: {}", cases);
    info!("✅ 上传成功文件: {}", uploaded_files);
    info!("❌ 上传失败文件: {}", failed_files);
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
