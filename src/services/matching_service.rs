//! 申请人匹配服务
//!
//! 每次查询都重新拉取完整的申请人列表，按（名，姓）做区分大小写的精确匹配。
//! 同名的多条记录全部返回。
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::infrastructure::RecordStore;
use crate::models::record::FIELD_APPLICANT_ID;
use crate::models::{Applicant, Datasheet, RemoteRecord};

/// 匹配结果
#[derive(Debug)]
pub enum MatchOutcome {
    /// 找到一条或多条同名记录
    Matched(Vec<Applicant>),
    NotFound,
    /// 拉取失败，无法判断是否存在
    FetchError(AppError),
}

impl MatchOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, MatchOutcome::Matched(_))
    }
}

/// 拉取失败时的处理方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetchFailurePolicy {
    /// 返回 `FetchError`
    #[default]
    Surface,
    /// 按"未找到"处理（旧行为）
    TreatAsNotFound,
}

impl FetchFailurePolicy {
    pub fn from_legacy_flag(legacy: bool) -> Self {
        if legacy {
            FetchFailurePolicy::TreatAsNotFound
        } else {
            FetchFailurePolicy::Surface
        }
    }
}

pub struct Matcher {
    store: Arc<dyn RecordStore>,
    policy: FetchFailurePolicy,
}

impl Matcher {
    pub fn new(store: Arc<dyn RecordStore>, policy: FetchFailurePolicy) -> Self {
        Self { store, policy }
    }

    /// 查找与候选人同名的已有申请人
    pub async fn find_existing(&self, candidate: &Applicant) -> MatchOutcome {
        let records = match self.store.fetch_records(Datasheet::Applicants).await {
            Ok(records) => records,
            Err(e) => {
                return match self.policy {
                    FetchFailurePolicy::Surface => MatchOutcome::FetchError(e),
                    FetchFailurePolicy::TreatAsNotFound => {
                        warn!(
                            "⚠️ 拉取申请人列表失败，按未找到处理: {} ({})",
                            candidate.full_name(),
                            e
                        );
                        MatchOutcome::NotFound
                    }
                };
            }
        };

        let matches: Vec<Applicant> = records
            .iter()
            .filter(|r| r.has_name(&candidate.first_name, &candidate.last_name))
            .map(|r| matched_applicant(candidate, r))
            .collect();

        debug!(
            "匹配 {}: {} 条记录中命中 {} 条",
            candidate.full_name(),
            records.len(),
            matches.len()
        );

        if matches.is_empty() {
            MatchOutcome::NotFound
        } else {
            MatchOutcome::Matched(matches)
        }
    }
}

/// 远程记录 + 候选人联系方式
fn matched_applicant(candidate: &Applicant, record: &RemoteRecord) -> Applicant {
    Applicant {
        first_name: candidate.first_name.clone(),
        last_name: candidate.last_name.clone(),
        applicant_id: record.field_string(FIELD_APPLICANT_ID),
        record_id: record.record_id.clone(),
        application_id: None,
        application_record_id: None,
        contact: candidate.contact.clone(),
    }
}
