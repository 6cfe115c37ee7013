//! 处理端点客户端
//!
//! `POST {endpoint}/upload`，multipart/form-data：
//! - 每个文件一个 `files` 部分
//! - 每个文件一个 `document_type_<文件名>` 文本部分
//! - 一个 `applicant` JSON 文本部分
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use tracing::debug;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::ProcessingEndpoint;
use crate::models::upload::UploadResponseBody;
use crate::models::{UploadReceipt, UploadRequest};
use crate::utils::logging::truncate_text;

pub struct ProcessingClient {
    http: reqwest::Client,
    upload_url: String,
}

impl ProcessingClient {
    pub fn new(config: &Config) -> AppResult<Self> {
        Ok(Self {
            http: super::http_client(config.request_timeout())?,
            upload_url: format!(
                "{}/upload",
                config.processing_endpoint_url.trim_end_matches('/')
            ),
        })
    }

    pub fn upload_url(&self) -> &str {
        &self.upload_url
    }

    /// 构建 multipart 表单
    pub fn build_form(request: &UploadRequest) -> AppResult<Form> {
        let mut form = Form::new();

        for file in &request.files {
            let part = Part::bytes(file.bytes.clone())
                .file_name(file.file_name.clone())
                .mime_str(&file.mime_type)
                .map_err(|e| AppError::api_request_failed("multipart", e))?;
            form = form
                .part("files", part)
                .text(file.document_type_field(), file.category.as_str().to_string());
        }

        let applicant_json = serde_json::to_string(&request.applicant)?;
        Ok(form.text("applicant", applicant_json))
    }
}

#[async_trait]
impl ProcessingEndpoint for ProcessingClient {
    async fn upload(&self, request: &UploadRequest) -> AppResult<UploadReceipt> {
        debug!(
            "上传 {} 个文件到 {}: {:?}",
            request.files.len(),
            self.upload_url,
            request.file_names()
        );

        let form = Self::build_form(request)?;
        let response = self
            .http
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::api_request_failed(&self.upload_url, e))?;

        let accepted = response.status().is_success();
        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();

        if !accepted {
            return Err(AppError::bad_response(
                &self.upload_url,
                Some(status),
                Some(truncate_text(&text, 200)),
            ));
        }

        // 没有 queueStatus 或响应不是 JSON 都视为已接受
        let body: UploadResponseBody = serde_json::from_str(&text).unwrap_or_default();
        Ok(UploadReceipt {
            status,
            queue_status: body.queue_status,
        })
    }
}
