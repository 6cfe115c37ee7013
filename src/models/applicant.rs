use serde::{Deserialize, Serialize};

use crate::models::record::ProcessedRecord;

/// 申请人联系方式（来自抓取，不参与匹配）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDetails {
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

/// 贷款申请人
///
/// 候选申请人只有姓名与联系方式；远程创建或匹配成功后才会带上 `record_id` / `applicant_id`，
/// 归入同一申请后再带上 `application_id`。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Applicant {
    pub first_name: String,
    pub last_name: String,
    /// 记录库分配的业务编号
    pub applicant_id: Option<String>,
    /// 记录库存储键
    pub record_id: Option<String>,
    /// 本地生成的分组标识
    pub application_id: Option<String>,
    /// 远程 Application 记录的存储键
    pub application_record_id: Option<String>,
    #[serde(default)]
    pub contact: ContactDetails,
}

impl Applicant {
    /// 创建候选申请人
    pub fn candidate(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        contact: ContactDetails,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            contact,
            ..Default::default()
        }
    }

    /// 从抓取到的全名构造候选申请人
    ///
    /// 第一个词作为名，最后一个词作为姓；空名返回 None
    pub fn from_full_name(full_name: &str, contact: ContactDetails) -> Option<Self> {
        let mut parts = full_name.split_whitespace();
        let first = parts.next()?;
        let last = parts.last().unwrap_or(first);
        Some(Self::candidate(first, last, contact))
    }

    /// 用远程记录补全标识字段，联系方式保留候选数据
    pub fn with_record(&self, record: &ProcessedRecord) -> Self {
        Self {
            first_name: record.first_name.clone(),
            last_name: record.last_name.clone(),
            applicant_id: Some(record.applicant_id.clone()),
            record_id: Some(record.record_id.clone()),
            application_id: self.application_id.clone(),
            application_record_id: self.application_record_id.clone(),
            contact: self.contact.clone(),
        }
    }

    /// 全名，同时也是本地文件夹名
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// 贷款机构
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Lender {
    pub company_name: String,
}

impl Lender {
    pub fn new(company_name: impl Into<String>) -> Self {
        Self {
            company_name: company_name.into(),
        }
    }
}

/// 申请状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplicationStatus {
    New,
}

impl ApplicationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationStatus::New => "New",
        }
    }
}

/// 一次对账中新建申请人的分组
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Application {
    /// 本地生成的分组标识（基于时间戳）
    pub grouping_id: String,
    pub status: ApplicationStatus,
    /// 成员申请人的 record_id
    pub member_record_ids: Vec<String>,
    /// 远程 Application 记录的存储键（创建失败时为空）
    pub record_ids: Vec<String>,
}

impl Application {
    pub fn new(grouping_id: impl Into<String>, member_record_ids: Vec<String>) -> Self {
        Self {
            grouping_id: grouping_id.into(),
            status: ApplicationStatus::New,
            member_record_ids,
            record_ids: Vec::new(),
        }
    }
}

/// 生成分组标识
pub fn generate_grouping_id() -> String {
    format!("APP-{}", chrono::Local::now().format("%Y%m%d%H%M%S%3f"))
}
