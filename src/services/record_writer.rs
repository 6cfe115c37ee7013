//! 记录写入服务 - 业务能力层
//!
//! 在记录库中创建申请人、贷款机构和申请记录。
//! 请求不带幂等键：同样的输入调用两次会产生两条记录，调用前必须先经过匹配。

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{ApiError, AppResult, BusinessError};
use crate::infrastructure::RecordStore;
use crate::models::record::{
    processed_records, ApplicantFields, ApplicationFields, CreateRecordsRequest, LenderFields,
};
use crate::models::{
    Applicant, ApplicationStatus, Datasheet, Lender, ProcessedRecord, StoreResponse,
};

pub struct RecordWriter {
    store: Arc<dyn RecordStore>,
}

impl RecordWriter {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    async fn post<F: Serialize>(&self, datasheet: Datasheet, fields: F) -> AppResult<StoreResponse> {
        let body = serde_json::to_value(CreateRecordsRequest::single(fields))?;
        let response = self.store.create_records(datasheet, body).await?;
        ensure_success(datasheet, &response)?;
        Ok(response)
    }

    /// 创建申请人，返回带 `recordId` / `Applicant_ID` 的完整记录
    pub async fn create_applicant(&self, applicant: &Applicant) -> AppResult<ProcessedRecord> {
        let response = self
            .post(Datasheet::Applicants, ApplicantFields::from(applicant))
            .await?;

        let created = extract_created(&response);
        debug!("{} 返回 {} 条完整记录", Datasheet::Applicants.label(), created.len());

        let record = created.into_iter().next().ok_or_else(|| BusinessError::MissingField {
            context: format!("创建申请人 {}", applicant.full_name()),
            field: "recordId / Applicant_ID".to_string(),
        })?;
        info!(
            "✓ 已创建申请人 {} (Applicant_ID: {}, recordId: {})",
            applicant.full_name(),
            record.applicant_id,
            record.record_id
        );
        Ok(record)
    }

    /// 创建贷款机构（不去重，不返回标识）
    pub async fn create_lender(&self, lender: &Lender) -> AppResult<()> {
        self.post(Datasheet::Lenders, LenderFields::from(lender)).await?;
        info!("✓ 已创建贷款机构 {}", lender.company_name);
        Ok(())
    }

    /// 创建申请记录，状态为 New，返回新记录的 recordId 列表
    pub async fn create_application(&self, record_ids: &[String]) -> AppResult<Vec<String>> {
        let fields = ApplicationFields {
            applicants: record_ids.to_vec(),
            status: ApplicationStatus::New.as_str().to_string(),
        };
        let response = self.post(Datasheet::Applications, fields).await?;

        let ids: Vec<String> = response
            .body
            .data
            .iter()
            .flat_map(|page| page.records.iter())
            .filter_map(|r| r.record_id.clone())
            .filter(|id| !id.is_empty())
            .collect();

        if ids.is_empty() {
            return Err(BusinessError::NoRecordsCreated {
                datasheet: Datasheet::Applications.label().to_string(),
            }
            .into());
        }
        info!("✓ 已创建申请记录 {:?}，包含 {} 位申请人", ids, record_ids.len());
        Ok(ids)
    }
}

/// 状态码为 200/201 且 success 为 true 才算成功
fn ensure_success(datasheet: Datasheet, response: &StoreResponse) -> AppResult<()> {
    if response.is_success() {
        return Ok(());
    }
    if matches!(response.status, 200 | 201) {
        return Err(ApiError::Rejected {
            endpoint: datasheet.label().to_string(),
            message: response.body.message.clone(),
        }
        .into());
    }
    Err(ApiError::BadResponse {
        endpoint: datasheet.label().to_string(),
        status: Some(response.status),
        message: response.body.message.clone(),
    }
    .into())
}

/// 响应中四个字段齐全的记录；缺字段的记录被丢弃
pub fn extract_created(response: &StoreResponse) -> Vec<ProcessedRecord> {
    response
        .body
        .data
        .as_ref()
        .map(|page| processed_records(&page.records))
        .unwrap_or_default()
}
