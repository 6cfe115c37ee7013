use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;

/// 文档类别
///
/// 声明顺序就是默认关键词表的匹配顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCategory {
    BankStatement,
    DriversLicense,
    PassportId,
    NationalId,
    UtilityBill,
    ApplicationForm,
    Payslip,
    Insurance,
    #[serde(rename = "unknown_document")]
    Unknown,
}

impl DocumentCategory {
    /// 固定的类别列表（不含 unknown_document）
    pub const CANONICAL: [DocumentCategory; 8] = [
        DocumentCategory::BankStatement,
        DocumentCategory::DriversLicense,
        DocumentCategory::PassportId,
        DocumentCategory::NationalId,
        DocumentCategory::UtilityBill,
        DocumentCategory::ApplicationForm,
        DocumentCategory::Payslip,
        DocumentCategory::Insurance,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DocumentCategory::BankStatement => "bank_statement",
            DocumentCategory::DriversLicense => "drivers_license",
            DocumentCategory::PassportId => "passport_id",
            DocumentCategory::NationalId => "national_id",
            DocumentCategory::UtilityBill => "utility_bill",
            DocumentCategory::ApplicationForm => "application_form",
            DocumentCategory::Payslip => "payslip",
            DocumentCategory::Insurance => "insurance",
            DocumentCategory::Unknown => "unknown_document",
        }
    }
}

impl fmt::Display for DocumentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentCategory {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DocumentCategory::CANONICAL
            .iter()
            .copied()
            .chain(std::iter::once(DocumentCategory::Unknown))
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownCategory {
                name: s.to_string(),
            })
    }
}

/// 本地发现的一个待上传文档
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub file_name: String,
    pub extension: String,
    pub mime_type: String,
    pub classified_type: DocumentCategory,
    /// 本地完整路径
    pub path: PathBuf,
}

/// 单个申请人的一次上传批次
///
/// `processed_count` 只增不减，进度在批次结束时恰好为 100
#[derive(Debug, Clone, PartialEq)]
pub struct UploadBatch {
    pub applicant_key: String,
    pub documents: Vec<Document>,
    pub processed_count: usize,
    pub total_count: usize,
    progress: f64,
}

impl UploadBatch {
    pub fn new(applicant_key: impl Into<String>, documents: Vec<Document>) -> Self {
        let total_count = documents.len();
        Self {
            applicant_key: applicant_key.into(),
            documents,
            processed_count: 0,
            total_count,
            progress: 0.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn file_names(&self) -> Vec<String> {
        self.documents.iter().map(|d| d.file_name.clone()).collect()
    }

    /// 当前进度（0-100）
    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// 记录一个子批次上传成功，返回新的进度
    pub fn record_submitted(&mut self, files: usize) -> f64 {
        self.processed_count = (self.processed_count + files).min(self.total_count);
        let computed = if self.processed_count == self.total_count {
            100.0
        } else {
            self.processed_count as f64 / self.total_count as f64 * 100.0
        };
        self.progress = self.progress.max(computed);
        self.progress
    }

    /// 批次结束（成功或重试耗尽），进度置为 100
    pub fn complete(&mut self) -> f64 {
        self.progress = 100.0;
        self.progress
    }
}
