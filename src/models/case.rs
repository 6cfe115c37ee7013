use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::applicant::{Applicant, ContactDetails, Lender};

/// 抓取到的一个联系人
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScrapedContact {
    pub applicant_name: String,
    #[serde(default)]
    pub contact_number: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// 人工分配结果：某个申请人对应的文件
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaseAssignment {
    /// 申请人全名（"名 姓"）
    pub applicant: String,
    #[serde(default)]
    pub files: Vec<String>,
}

/// 抓取程序输出的一个案例（一笔贷款）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScrapedCase {
    #[serde(default)]
    pub lender: Option<String>,
    /// 抵押物地址，作为申请人的居住地址
    #[serde(default)]
    pub security_addresses: Option<String>,
    #[serde(default)]
    pub deal_value: Option<f64>,
    #[serde(default)]
    pub total_loan_amount: Option<String>,
    #[serde(default)]
    pub estimated_settlement_date: Option<String>,
    #[serde(default)]
    pub deal_owner: Option<String>,
    #[serde(default)]
    pub applicants: Vec<ScrapedContact>,
    #[serde(default)]
    pub assignments: Vec<CaseAssignment>,
    #[serde(skip_serializing, skip_deserializing)]
    pub file_path: Option<String>,
}

impl ScrapedCase {
    /// 候选申请人列表，空名字会被忽略
    pub fn candidates(&self) -> Vec<Applicant> {
        self.applicants
            .iter()
            .filter_map(|contact| {
                Applicant::from_full_name(
                    &contact.applicant_name,
                    ContactDetails {
                        phone: contact.contact_number.clone(),
                        email: contact.email.clone(),
                        address: self.security_addresses.clone(),
                    },
                )
            })
            .collect()
    }

    /// 候选贷款机构
    pub fn lenders(&self) -> Vec<Lender> {
        self.lender
            .iter()
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .map(Lender::new)
            .collect()
    }

    /// 人工分配（全名 → 文件列表），没有分配时返回 None
    pub fn assignment_map(&self) -> Option<HashMap<String, Vec<String>>> {
        if self.assignments.is_empty() {
            return None;
        }
        let mut map: HashMap<String, Vec<String>> = HashMap::new();
        for assignment in &self.assignments {
            map.entry(assignment.applicant.trim().to_string())
                .or_default()
                .extend(assignment.files.iter().cloned());
        }
        Some(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CASE: &str = r#"
lender = "Harbour Bank"
security_addresses = "1 Example St, Sydney"

[[applicants]]
applicant_name = "Jane Doe"
contact_number = "0400 000 000"

[[applicants]]
applicant_name = ""

[[assignments]]
applicant = "Jane Doe"
files = ["id_card.jpg"]

[[assignments]]
applicant = "Jane Doe"
files = ["bankstmt_march.pdf"]
"#;

    #[test]
    fn parses_candidates_and_skips_blank_names() {
        let case: ScrapedCase = toml::from_str(CASE).unwrap();
        let candidates = case.candidates();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].full_name(), "Jane Doe");
        assert_eq!(
            candidates[0].contact.address.as_deref(),
            Some("1 Example St, Sydney")
        );
        assert_eq!(case.lenders(), vec![Lender::new("Harbour Bank")]);
    }

    #[test]
    fn assignments_for_same_applicant_are_merged() {
        let case: ScrapedCase = toml::from_str(CASE).unwrap();
        let map = case.assignment_map().unwrap();
        assert_eq!(
            map["Jane Doe"],
            vec!["id_card.jpg".to_string(), "bankstmt_march.pdf".to_string()]
        );
    }

    #[test]
    fn case_without_assignments_has_no_map() {
        let case: ScrapedCase = toml::from_str("lender = \"  \"").unwrap();
        assert!(case.assignment_map().is_none());
        assert!(case.lenders().is_empty());
    }
}
