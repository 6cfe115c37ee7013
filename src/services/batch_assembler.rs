//! 批次组装服务 - 业务能力层
//!
//! 把分配给申请人的文件名变成待上传批次：
//! 找到本地文件，读取扩展名和 MIME 类型，按文件名分类。
//! 已处理过的文件、本次已归入前面申请人批次的文件、本地找不到的文件都不会进入批次。

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::error::AppResult;
use crate::infrastructure::local_storage::file_metadata;
use crate::infrastructure::{LocalStorage, ProcessedLedger};
use crate::models::{Applicant, Document, UploadBatch};
use crate::services::classifier::KeywordTable;

pub struct BatchAssembler {
    storage: LocalStorage,
    table: Arc<KeywordTable>,
    ledger: Arc<ProcessedLedger>,
}

impl BatchAssembler {
    pub fn new(storage: LocalStorage, table: Arc<KeywordTable>, ledger: Arc<ProcessedLedger>) -> Self {
        Self {
            storage,
            table,
            ledger,
        }
    }

    pub fn storage(&self) -> &LocalStorage {
        &self.storage
    }

    /// 申请人目录中尚未处理的文件
    pub async fn discover(&self, applicant: &Applicant) -> AppResult<Vec<String>> {
        let key = applicant.full_name();
        let folder = self.storage.applicant_folder(applicant);
        let processed = self.ledger.processed_for(&key);

        let files = self.storage.list_files(&folder).await?;
        Ok(files
            .into_iter()
            .filter(|name| !processed.contains(name))
            .collect())
    }

    /// 查找顺序：申请人自己的目录，工作集中其他人的目录，最后是下载根目录
    pub fn search_folders(&self, applicant: &Applicant, working_set: &[Applicant]) -> Vec<PathBuf> {
        let mut folders = vec![self.storage.applicant_folder(applicant)];
        for other in working_set {
            let folder = self.storage.applicant_folder(other);
            if !folders.contains(&folder) {
                folders.push(folder);
            }
        }
        folders.push(self.storage.root().to_path_buf());
        folders
    }

    /// 为单个申请人组装批次
    ///
    /// `claimed` 是本次运行中已归入其他申请人批次的文件路径
    pub async fn assemble(
        &self,
        applicant: &Applicant,
        assigned: &[String],
        claimed: &HashSet<PathBuf>,
        folders: &[PathBuf],
    ) -> UploadBatch {
        let key = applicant.full_name();
        let mut seen = HashSet::new();
        let mut documents = Vec::new();

        for name in assigned {
            if !seen.insert(name.as_str()) {
                continue;
            }
            if self.ledger.is_processed(&key, name) {
                debug!("[{}] 跳过已处理文件: {}", key, name);
                continue;
            }
            let Some(path) = self.storage.locate(folders, name).await else {
                debug!("[{}] 本地找不到文件，跳过: {}", key, name);
                continue;
            };
            if claimed.contains(&path) {
                debug!("[{}] 跳过已分配给其他申请人的文件: {}", key, path.display());
                continue;
            }

            let (extension, mime_type) = file_metadata(name);
            documents.push(Document {
                file_name: name.clone(),
                extension,
                mime_type,
                classified_type: self.table.classify(name),
                path,
            });
        }

        if !documents.is_empty() {
            let names = documents.iter().map(|d| d.file_name.as_str());
            for (category, files) in self.table.summarize(names) {
                if !files.is_empty() {
                    debug!("[{}] {}: {}", key, category, files);
                }
            }
        }

        UploadBatch::new(key, documents)
    }

    /// 按分配顺序为每位申请人组装批次，同一个本地文件只归第一个申请人
    pub async fn assemble_all(
        &self,
        assignments: &[(Applicant, Vec<String>)],
        working_set: &[Applicant],
    ) -> Vec<(Applicant, UploadBatch)> {
        let mut claimed: HashSet<PathBuf> = HashSet::new();
        let mut batches = Vec::with_capacity(assignments.len());

        for (applicant, files) in assignments {
            let folders = self.search_folders(applicant, working_set);
            let batch = self.assemble(applicant, files, &claimed, &folders).await;
            claimed.extend(batch.documents.iter().map(|d| d.path.clone()));
            batches.push((applicant.clone(), batch));
        }
        batches
    }
}
