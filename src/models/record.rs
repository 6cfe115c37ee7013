//! 记录库（datasheet records）接口的数据结构

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::models::applicant::{Applicant, Lender};

pub const FIELD_FIRST_NAME: &str = "First Name";
pub const FIELD_LAST_NAME: &str = "Last Name";
pub const FIELD_APPLICANT_ID: &str = "Applicant_ID";

/// 记录库中的数据表
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Datasheet {
    Applicants,
    Lenders,
    Applications,
}

impl Datasheet {
    pub fn label(self) -> &'static str {
        match self {
            Datasheet::Applicants => "Applicant Hub",
            Datasheet::Lenders => "Lender Hub",
            Datasheet::Applications => "Application Hub",
        }
    }
}

/// 一条远程记录
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteRecord {
    #[serde(rename = "recordId", default)]
    pub record_id: Option<String>,
    #[serde(default)]
    pub fields: Map<String, JsonValue>,
}

impl RemoteRecord {
    /// 读取字符串字段，数字会转成字符串，空串视为缺失
    pub fn field_string(&self, key: &str) -> Option<String> {
        match self.fields.get(key)? {
            JsonValue::String(s) if !s.is_empty() => Some(s.clone()),
            JsonValue::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// 按名和姓精确匹配（区分大小写）
    pub fn has_name(&self, first_name: &str, last_name: &str) -> bool {
        self.fields.get(FIELD_FIRST_NAME).and_then(JsonValue::as_str) == Some(first_name)
            && self.fields.get(FIELD_LAST_NAME).and_then(JsonValue::as_str) == Some(last_name)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordPage {
    #[serde(default)]
    pub records: Vec<RemoteRecord>,
    #[serde(default)]
    pub total: Option<u64>,
}

/// `GET {base}/records` 的响应
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordListResponse {
    #[serde(default)]
    pub data: Option<RecordPage>,
}

impl RecordListResponse {
    pub fn into_records(self) -> Vec<RemoteRecord> {
        self.data.map(|d| d.records).unwrap_or_default()
    }
}

/// `POST {base}/records` 的响应体
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateRecordsResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<RecordPage>,
}

/// 写入请求返回的原始结果：HTTP 状态码 + 解析后的响应体
#[derive(Debug, Clone)]
pub struct StoreResponse {
    pub status: u16,
    pub body: CreateRecordsResponse,
}

impl StoreResponse {
    /// 状态码为 200/201 且 success 为 true
    pub fn is_success(&self) -> bool {
        matches!(self.status, 200 | 201) && self.body.success
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewRecord<F> {
    pub fields: F,
}

/// `POST {base}/records` 的请求体
#[derive(Debug, Clone, Serialize)]
pub struct CreateRecordsRequest<F> {
    pub records: Vec<NewRecord<F>>,
    #[serde(rename = "fieldKey")]
    pub field_key: &'static str,
}

impl<F> CreateRecordsRequest<F> {
    pub fn single(fields: F) -> Self {
        Self {
            records: vec![NewRecord { fields }],
            field_key: "name",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplicantFields {
    #[serde(rename = "First Name")]
    pub first_name: String,
    #[serde(rename = "Last Name")]
    pub last_name: String,
    #[serde(rename = "Residential Address")]
    pub residential_address: Option<String>,
    #[serde(rename = "Primary Contact Number")]
    pub primary_contact_number: Option<String>,
    #[serde(rename = "Email Address")]
    pub email_address: Option<String>,
}

impl From<&Applicant> for ApplicantFields {
    fn from(applicant: &Applicant) -> Self {
        Self {
            first_name: applicant.first_name.clone(),
            last_name: applicant.last_name.clone(),
            residential_address: applicant.contact.address.clone(),
            primary_contact_number: applicant.contact.phone.clone(),
            email_address: applicant.contact.email.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LenderFields {
    #[serde(rename = "Company Name")]
    pub company_name: String,
    #[serde(rename = "Contact")]
    pub contact: Option<String>,
    #[serde(rename = "Website")]
    pub website: Option<String>,
    #[serde(rename = "Phone Number")]
    pub phone_number: Option<String>,
}

impl From<&Lender> for LenderFields {
    fn from(lender: &Lender) -> Self {
        Self {
            company_name: lender.company_name.clone(),
            contact: None,
            website: None,
            phone_number: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplicationFields {
    #[serde(rename = "Applicants")]
    pub applicants: Vec<String>,
    #[serde(rename = "Status")]
    pub status: String,
}

/// 创建申请人后提取的完整记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedRecord {
    #[serde(rename = "Applicant_ID")]
    pub applicant_id: String,
    #[serde(rename = "recordId")]
    pub record_id: String,
    #[serde(rename = "First Name")]
    pub first_name: String,
    #[serde(rename = "Last Name")]
    pub last_name: String,
}

impl ProcessedRecord {
    /// 四个字段齐全才返回
    pub fn from_remote(record: &RemoteRecord) -> Option<Self> {
        Some(Self {
            record_id: record.record_id.clone().filter(|id| !id.is_empty())?,
            applicant_id: record.field_string(FIELD_APPLICANT_ID)?,
            first_name: record.field_string(FIELD_FIRST_NAME)?,
            last_name: record.field_string(FIELD_LAST_NAME)?,
        })
    }
}

/// 提取所有字段齐全的记录，缺字段的记录直接丢弃
pub fn processed_records(records: &[RemoteRecord]) -> Vec<ProcessedRecord> {
    records.iter().filter_map(ProcessedRecord::from_remote).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records_from(value: JsonValue) -> Vec<RemoteRecord> {
        let response: CreateRecordsResponse = serde_json::from_value(value).unwrap();
        response.data.unwrap().records
    }

    #[test]
    fn complete_records_are_all_extracted() {
        let records = records_from(json!({
            "success": true,
            "data": { "records": [
                { "recordId": "rec1", "fields": { "Applicant_ID": "A-1", "First Name": "Jane", "Last Name": "Doe" } },
                { "recordId": "rec2", "fields": { "Applicant_ID": 42, "First Name": "John", "Last Name": "Roe" } }
            ]}
        }));

        let processed = processed_records(&records);
        assert_eq!(processed.len(), 2);
        assert_eq!(processed[1].applicant_id, "42");
        assert_eq!(processed[1].record_id, "rec2");
    }

    #[test]
    fn record_missing_any_field_is_dropped() {
        let records = records_from(json!({
            "success": true,
            "data": { "records": [
                { "recordId": "rec1", "fields": { "Applicant_ID": "A-1", "First Name": "Jane", "Last Name": "Doe" } },
                { "recordId": "rec2", "fields": { "First Name": "John", "Last Name": "Roe" } },
                { "fields": { "Applicant_ID": "A-3", "First Name": "Ann", "Last Name": "Poe" } },
                { "recordId": "rec4", "fields": { "Applicant_ID": "A-4", "First Name": "", "Last Name": "Loe" } }
            ]}
        }));

        let processed = processed_records(&records);
        assert_eq!(processed.len(), 1);
        assert_eq!(processed[0].first_name, "Jane");
    }

    #[test]
    fn name_match_is_case_sensitive() {
        let record = RemoteRecord {
            record_id: Some("rec1".to_string()),
            fields: json!({ "First Name": "Jane", "Last Name": "Doe" })
                .as_object()
                .cloned()
                .unwrap(),
        };
        assert!(record.has_name("Jane", "Doe"));
        assert!(!record.has_name("jane", "Doe"));
        assert!(!record.has_name("Jane", "Doe "));
    }

    #[test]
    fn create_request_uses_field_key_name() {
        let applicant = Applicant::candidate("Jane", "Doe", Default::default());
        let body =
            serde_json::to_value(CreateRecordsRequest::single(ApplicantFields::from(&applicant)))
                .unwrap();
        assert_eq!(body["fieldKey"], "name");
        assert_eq!(body["records"][0]["fields"]["First Name"], "Jane");
        assert!(body["records"][0]["fields"]["Email Address"].is_null());
    }

    #[test]
    fn success_needs_status_and_flag() {
        let ok = StoreResponse {
            status: 201,
            body: CreateRecordsResponse {
                success: true,
                ..Default::default()
            },
        };
        let flag_false = StoreResponse {
            status: 200,
            body: CreateRecordsResponse::default(),
        };
        let accepted = StoreResponse {
            status: 202,
            body: CreateRecordsResponse {
                success: true,
                ..Default::default()
            },
        };
        assert!(ok.is_success());
        assert!(!flag_false.is_success());
        assert!(!accepted.is_success());
    }
}
