//! 文件分配
//!
//! 决定哪些文件属于哪位申请人。实际由人工界面完成，这里只定义接口和两个内置实现。

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::AppResult;
use crate::models::Applicant;
use crate::services::BatchAssembler;

/// 分配结果：按工作集顺序的（申请人，文件名列表）
pub type Assignments = Vec<(Applicant, Vec<String>)>;

/// 文件分配协作方
#[async_trait]
pub trait AssignmentCollaborator: Send + Sync {
    async fn assign(&self, working_set: &[Applicant]) -> AppResult<Assignments>;
}

/// 按目录分配：每位申请人得到自己目录中尚未处理的文件
///
/// 目录不存在的申请人分到空列表；跨申请人的重复由组装阶段按路径排除
pub struct FolderAssignment {
    assembler: Arc<BatchAssembler>,
}

impl FolderAssignment {
    pub fn new(assembler: Arc<BatchAssembler>) -> Self {
        Self { assembler }
    }
}

#[async_trait]
impl AssignmentCollaborator for FolderAssignment {
    async fn assign(&self, working_set: &[Applicant]) -> AppResult<Assignments> {
        let mut assignments = Vec::with_capacity(working_set.len());

        for applicant in working_set {
            let files = match self.assembler.discover(applicant).await {
                Ok(files) => files,
                Err(e) => {
                    warn!("⚠️ {} 没有可用的下载目录: {}", applicant.full_name(), e);
                    Vec::new()
                }
            };
            info!("📂 {} 分配到 {} 个文件", applicant.full_name(), files.len());
            assignments.push((applicant.clone(), files));
        }
        Ok(assignments)
    }
}

/// 固定分配表（全名 → 文件名），来自案例文件或调用方
#[derive(Debug, Clone, Default)]
pub struct StaticAssignment {
    files_by_applicant: HashMap<String, Vec<String>>,
}

impl StaticAssignment {
    pub fn new(files_by_applicant: HashMap<String, Vec<String>>) -> Self {
        Self { files_by_applicant }
    }

    pub fn with(mut self, full_name: &str, files: &[&str]) -> Self {
        self.files_by_applicant
            .entry(full_name.to_string())
            .or_default()
            .extend(files.iter().map(|f| f.to_string()));
        self
    }
}

#[async_trait]
impl AssignmentCollaborator for StaticAssignment {
    async fn assign(&self, working_set: &[Applicant]) -> AppResult<Assignments> {
        Ok(working_set
            .iter()
            .map(|applicant| {
                let files = self
                    .files_by_applicant
                    .get(&applicant.full_name())
                    .cloned()
                    .unwrap_or_default();
                (applicant.clone(), files)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::{LocalStorage, ProcessedLedger};
    use crate::services::KeywordTable;

    fn applicant(first: &str, last: &str) -> Applicant {
        Applicant::candidate(first, last, Default::default())
    }

    #[tokio::test]
    async fn folder_assignment_offers_unprocessed_files_per_folder() {
        let dir = tempfile::tempdir().unwrap();
        for (folder, name) in [
            ("Jane Doe", "shared.pdf"),
            ("Jane Doe", "payslip1.pdf"),
            ("John Roe", "shared.pdf"),
            ("John Roe", "licence.jpg"),
        ] {
            std::fs::create_dir_all(dir.path().join(folder)).unwrap();
            std::fs::write(dir.path().join(folder).join(name), b"x").unwrap();
        }
        let ledger = Arc::new(ProcessedLedger::in_memory());
        ledger.mark_processed("Jane Doe", ["payslip1.pdf"]);
        let assembler = Arc::new(BatchAssembler::new(
            LocalStorage::new(dir.path()),
            Arc::new(KeywordTable::default()),
            ledger,
        ));

        let working_set = vec![
            applicant("Jane", "Doe"),
            applicant("John", "Roe"),
            applicant("Ann", "Poe"),
        ];
        let assignments = FolderAssignment::new(assembler)
            .assign(&working_set)
            .await
            .unwrap();

        assert_eq!(assignments[0].1, vec!["shared.pdf".to_string()]);
        assert_eq!(
            assignments[1].1,
            vec!["licence.jpg".to_string(), "shared.pdf".to_string()]
        );
        assert!(assignments[2].1.is_empty());
    }

    #[tokio::test]
    async fn static_assignment_follows_working_set_order() {
        let assignment = StaticAssignment::default()
            .with("John Roe", &["id_card.jpg"])
            .with("John Roe", &["bankstmt_march.pdf"]);

        let result = assignment
            .assign(&[applicant("Jane", "Doe"), applicant("John", "Roe")])
            .await
            .unwrap();

        assert!(result[0].1.is_empty());
        assert_eq!(result[1].1.len(), 2);
    }
}
