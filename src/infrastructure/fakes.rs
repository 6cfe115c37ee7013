//! 内存实现的记录库与处理端点
//!
//! 记录每一次调用，便于断言"没有发起创建请求"之类的行为。
//! 只在本 crate 的测试或开启 `test-util` feature 时编译。

use async_trait::async_trait;
use serde_json::{json, Map, Value as JsonValue};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicUsize, Ordering};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, AppResult};
use crate::infrastructure::{ProcessingEndpoint, RecordStore};
use crate::models::record::{CreateRecordsResponse, RecordPage, FIELD_APPLICANT_ID};
use crate::models::{
    Datasheet, QueueStatus, RemoteRecord, StoreResponse, UploadReceipt, UploadRequest,
};

/// 内存记录库
///
/// 创建申请人时自动分配 `recNNN` / `A-NNN`，创建的记录之后可以被拉取到
#[derive(Default)]
pub struct FakeRecordStore {
    pub records: Mutex<HashMap<Datasheet, Vec<RemoteRecord>>>,
    pub created: Mutex<Vec<(Datasheet, JsonValue)>>,
    pub fetch_calls: AtomicUsize,
    /// 拉取时返回网络错误
    pub fail_fetch: AtomicBool,
    /// 创建时返回 `success: false`
    pub reject_creates: AtomicBool,
    next_id: AtomicUsize,
}

impl FakeRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置一条申请人记录
    pub async fn seed_applicant(&self, record_id: &str, applicant_id: &str, first: &str, last: &str) {
        let fields = json!({
            "Applicant_ID": applicant_id,
            "First Name": first,
            "Last Name": last,
        });
        self.records
            .lock()
            .await
            .entry(Datasheet::Applicants)
            .or_default()
            .push(RemoteRecord {
                record_id: Some(record_id.to_string()),
                fields: fields.as_object().cloned().unwrap_or_default(),
            });
    }

    /// 某张表收到的创建请求体
    pub async fn created_in(&self, datasheet: Datasheet) -> Vec<JsonValue> {
        self.created
            .lock()
            .await
            .iter()
            .filter(|(sheet, _)| *sheet == datasheet)
            .map(|(_, body)| body.clone())
            .collect()
    }

    fn materialize(&self, datasheet: Datasheet, body: &JsonValue) -> Vec<RemoteRecord> {
        let posted = body
            .get("records")
            .and_then(JsonValue::as_array)
            .cloned()
            .unwrap_or_default();

        posted
            .iter()
            .map(|record| {
                let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
                let mut fields: Map<String, JsonValue> = record
                    .get("fields")
                    .and_then(JsonValue::as_object)
                    .cloned()
                    .unwrap_or_default();
                if datasheet == Datasheet::Applicants {
                    fields.insert(FIELD_APPLICANT_ID.to_string(), json!(format!("A-{n:03}")));
                }
                RemoteRecord {
                    record_id: Some(format!("rec{n:03}")),
                    fields,
                }
            })
            .collect()
    }
}

#[async_trait]
impl RecordStore for FakeRecordStore {
    async fn fetch_records(&self, datasheet: Datasheet) -> AppResult<Vec<RemoteRecord>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(AppError::bad_response(
                datasheet.label(),
                None,
                Some("connection refused".to_string()),
            ));
        }
        Ok(self
            .records
            .lock()
            .await
            .get(&datasheet)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_records(
        &self,
        datasheet: Datasheet,
        body: JsonValue,
    ) -> AppResult<StoreResponse> {
        self.created.lock().await.push((datasheet, body.clone()));

        if self.reject_creates.load(Ordering::SeqCst) {
            return Ok(StoreResponse {
                status: 200,
                body: CreateRecordsResponse {
                    success: false,
                    message: Some("rejected".to_string()),
                    ..Default::default()
                },
            });
        }

        let created = self.materialize(datasheet, &body);
        self.records
            .lock()
            .await
            .entry(datasheet)
            .or_default()
            .extend(created.iter().cloned());

        Ok(StoreResponse {
            status: 201,
            body: CreateRecordsResponse {
                success: true,
                code: Some(200),
                message: Some("SUCCESS".to_string()),
                data: Some(RecordPage {
                    total: Some(created.len() as u64),
                    records: created,
                }),
            },
        })
    }
}

/// 内存处理端点
#[derive(Default)]
pub struct FakeProcessingEndpoint {
    pub requests: Mutex<Vec<UploadRequest>>,
    /// 这些申请人（"名 姓"）的上传总是失败
    pub failing_applicants: Mutex<HashSet<String>>,
    /// 接下来 N 次调用失败，之后恢复
    pub fail_next: AtomicUsize,
    /// 失败时返回的状态码，0 表示 503
    pub failure_status: AtomicU16,
    pub queue_status: Mutex<Option<QueueStatus>>,
    /// 第一次上传被接受后取消这个信号
    pub cancel_after_upload: Mutex<Option<CancellationToken>>,
}

impl FakeProcessingEndpoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn fail_for(&self, full_name: &str) {
        self.failing_applicants
            .lock()
            .await
            .insert(full_name.to_string());
    }

    /// 收到的请求次数（含失败的）
    pub async fn request_count(&self) -> usize {
        self.requests.lock().await.len()
    }
}

#[async_trait]
impl ProcessingEndpoint for FakeProcessingEndpoint {
    async fn upload(&self, request: &UploadRequest) -> AppResult<UploadReceipt> {
        self.requests.lock().await.push(request.clone());

        let full_name = format!(
            "{} {}",
            request.applicant.first_name, request.applicant.last_name
        );
        let scripted_failure = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if scripted_failure || self.failing_applicants.lock().await.contains(&full_name) {
            let status = match self.failure_status.load(Ordering::SeqCst) {
                0 => 503,
                code => code,
            };
            return Err(AppError::bad_response(
                "/upload",
                Some(status),
                Some("upload rejected".to_string()),
            ));
        }

        if let Some(token) = self.cancel_after_upload.lock().await.take() {
            token.cancel();
        }

        Ok(UploadReceipt {
            status: 200,
            queue_status: self.queue_status.lock().await.clone(),
        })
    }
}
