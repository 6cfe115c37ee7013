//! 记录库 API 客户端
//!
//! `GET/POST {base}/{datasheet_id}/records`，Bearer token 认证
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::RecordStore;
use crate::models::record::{CreateRecordsResponse, RecordListResponse};
use crate::models::{Datasheet, RemoteRecord, StoreResponse};
use crate::utils::logging::truncate_text;

pub struct RecordsClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    applicant_datasheet_id: String,
    lender_datasheet_id: String,
    application_datasheet_id: String,
}

impl RecordsClient {
    /// 创建新的记录库客户端
    pub fn new(config: &Config) -> AppResult<Self> {
        Ok(Self {
            http: super::http_client(config.request_timeout())?,
            base_url: config.records_api_base_url.trim_end_matches('/').to_string(),
            token: config.records_api_token.clone(),
            applicant_datasheet_id: config.applicant_datasheet_id.clone(),
            lender_datasheet_id: config.lender_datasheet_id.clone(),
            application_datasheet_id: config.application_datasheet_id.clone(),
        })
    }

    fn datasheet_id(&self, datasheet: Datasheet) -> &str {
        match datasheet {
            Datasheet::Applicants => &self.applicant_datasheet_id,
            Datasheet::Lenders => &self.lender_datasheet_id,
            Datasheet::Applications => &self.application_datasheet_id,
        }
    }

    /// 数据表的 records 地址
    pub fn records_url(&self, datasheet: Datasheet) -> String {
        format!("{}/{}/records", self.base_url, self.datasheet_id(datasheet))
    }
}

#[async_trait]
impl RecordStore for RecordsClient {
    async fn fetch_records(&self, datasheet: Datasheet) -> AppResult<Vec<RemoteRecord>> {
        let url = self.records_url(datasheet);
        debug!("拉取 {} 记录: {}", datasheet.label(), url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| AppError::api_request_failed(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::bad_response(
                &url,
                Some(status.as_u16()),
                Some(truncate_text(&text, 200)),
            ));
        }

        let body: RecordListResponse = response
            .json()
            .await
            .map_err(|e| AppError::api_request_failed(&url, e))?;
        let records = body.into_records();
        debug!("{} 共 {} 条记录", datasheet.label(), records.len());
        Ok(records)
    }

    async fn create_records(
        &self,
        datasheet: Datasheet,
        body: JsonValue,
    ) -> AppResult<StoreResponse> {
        let url = self.records_url(datasheet);
        debug!("写入 {} Payload: {}", datasheet.label(), body);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::api_request_failed(&url, e))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| AppError::api_request_failed(&url, e))?;

        // 响应体无法解析时按 success=false 处理，由调用方记录
        let body = serde_json::from_str::<CreateRecordsResponse>(&text).unwrap_or_else(|_| {
            CreateRecordsResponse {
                message: Some(truncate_text(&text, 200)),
                ..Default::default()
            }
        });

        Ok(StoreResponse { status, body })
    }
}
