//! 失败记录服务 - 业务能力层
//!
//! 只负责"写失败记录文件"能力，不关心流程

use std::fs::OpenOptions;
use std::io::Write;
use tracing::debug;

use crate::error::{AppError, AppResult};

/// 失败记录服务
///
/// 职责：
/// - 将上传失败的文件、被跳过的申请人写入失败记录文件，便于之后重新提交
/// - 每次只写一行
pub struct WarnWriter {
    warn_file_path: String,
}

impl WarnWriter {
    /// 使用自定义文件路径创建
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            warn_file_path: path.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.warn_file_path
    }

    /// 写入失败信息
    ///
    /// # 参数
    /// - `applicant`: 申请人全名
    /// - `file_name`: 失败的文件，整个申请人被跳过时为 None
    /// - `reason`: 失败原因
    pub fn write(&self, applicant: &str, file_name: Option<&str>, reason: &str) -> AppResult<()> {
        debug!("写入失败记录: {} | {:?} | {}", applicant, file_name, reason);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.warn_file_path)
            .map_err(|e| AppError::file_write_failed(&self.warn_file_path, e))?;

        let line = format!(
            "{} | 申请人 {} | 文件 {} | 原因: {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            applicant,
            file_name.unwrap_or("-"),
            reason.replace('\n', " ")
        );

        file.write_all(line.as_bytes())
            .map_err(|e| AppError::file_write_failed(&self.warn_file_path, e))?;

        Ok(())
    }
}
