//! 处理端点（`POST {endpoint}/upload`）的数据结构

use serde::{Deserialize, Serialize};

use crate::models::applicant::Applicant;
use crate::models::document::DocumentCategory;

/// multipart 中 `applicant` 部分的 JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantPayload {
    #[serde(rename = "Applicant_ID")]
    pub applicant_id: Option<String>,
    #[serde(rename = "First Name")]
    pub first_name: String,
    #[serde(rename = "Last Name")]
    pub last_name: String,
    #[serde(rename = "recordId")]
    pub record_id: Option<String>,
    #[serde(rename = "application_recordId")]
    pub application_record_id: Option<String>,
}

impl From<&Applicant> for ApplicantPayload {
    fn from(applicant: &Applicant) -> Self {
        Self {
            applicant_id: applicant.applicant_id.clone(),
            first_name: applicant.first_name.clone(),
            last_name: applicant.last_name.clone(),
            record_id: applicant.record_id.clone(),
            application_record_id: applicant.application_record_id.clone(),
        }
    }
}

/// 一个已读入内存的上传文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub mime_type: String,
    pub category: DocumentCategory,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    /// 对应的类别字段名
    pub fn document_type_field(&self) -> String {
        format!("document_type_{}", self.file_name)
    }
}

/// 一次 multipart 上传请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub applicant: ApplicantPayload,
    pub files: Vec<UploadFile>,
}

impl UploadRequest {
    pub fn file_names(&self) -> Vec<String> {
        self.files.iter().map(|f| f.file_name.clone()).collect()
    }
}

/// 端点返回的队列状态
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatus {
    #[serde(rename = "remainingInQueue", default)]
    pub remaining_in_queue: Option<u64>,
    #[serde(rename = "totalFiles", default)]
    pub total_files: Option<u64>,
    #[serde(default)]
    pub processing: Option<bool>,
}

impl QueueStatus {
    /// 给界面显示的状态文字
    pub fn describe(&self) -> String {
        match (self.total_files, self.remaining_in_queue) {
            (Some(total), Some(remaining)) => {
                format!("已排队 {} 个文件，队列剩余 {} 个", total, remaining)
            }
            (None, Some(remaining)) => format!("队列剩余 {} 个文件", remaining),
            (Some(total), None) => format!("已排队 {} 个文件", total),
            (None, None) => "已提交".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadResponseBody {
    #[serde(rename = "queueStatus", default)]
    pub queue_status: Option<QueueStatus>,
    #[serde(default)]
    pub message: Option<String>,
}

/// 上传成功后的回执
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub status: u16,
    pub queue_status: Option<QueueStatus>,
}

impl UploadReceipt {
    pub fn status_line(&self) -> String {
        self.queue_status
            .as_ref()
            .map(QueueStatus::describe)
            .unwrap_or_else(|| "已提交".to_string())
    }
}
