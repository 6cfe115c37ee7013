//! 上传处理上下文
//!
//! 封装"我正在上传第几位申请人的文件"这一信息

use std::fmt::Display;

/// 上传处理上下文
#[derive(Debug, Clone)]
pub struct UploadCtx {
    /// 申请人全名，同时是台账和进度表的键
    pub applicant_key: String,

    /// 申请人在本次上传中的序号（从1开始，仅用于日志显示）
    pub applicant_index: usize,

    /// 本次上传的申请人总数
    pub total_applicants: usize,
}

impl UploadCtx {
    pub fn new(applicant_key: String, applicant_index: usize, total_applicants: usize) -> Self {
        Self {
            applicant_key,
            applicant_index,
            total_applicants,
        }
    }
}

impl Display for UploadCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[申请人 {}/{} {}]",
            self.applicant_index, self.total_applicants, self.applicant_key
        )
    }
}
