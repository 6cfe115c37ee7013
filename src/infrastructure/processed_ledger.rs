//! 已处理文件台账
//!
//! 记录每位申请人已被处理端点接受的文件名，之后的发现不会再提供这些文件。
//! 只有上传流程写入；界面轮询或其他任务可以并发读取。

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::error::{AppError, AppResult};

#[derive(Debug, Default)]
pub struct ProcessedLedger {
    entries: Mutex<HashMap<String, HashSet<String>>>,
    path: Option<PathBuf>,
}

impl ProcessedLedger {
    /// 纯内存台账
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// 从 JSON 文件加载；文件不存在时返回空台账，保存时写回同一路径
    pub fn load(path: impl Into<PathBuf>) -> AppResult<Self> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => {
                let stored: BTreeMap<String, BTreeSet<String>> = serde_json::from_str(&content)?;
                info!("📒 已加载处理台账: {} 位申请人", stored.len());
                stored
                    .into_iter()
                    .map(|(k, v)| (k, v.into_iter().collect()))
                    .collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(AppError::file_read_failed(path.display().to_string(), e)),
        };
        Ok(Self {
            entries: Mutex::new(entries),
            path: Some(path),
        })
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, HashSet<String>>> {
        // 持锁期间不会 panic，中毒后的数据仍然可用
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn mark_processed<I, S>(&self, applicant_key: &str, file_names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut entries = self.lock();
        let set = entries.entry(applicant_key.to_string()).or_default();
        for name in file_names {
            set.insert(name.into());
        }
        debug!("台账更新: {} 已处理 {} 个文件", applicant_key, set.len());
    }

    pub fn is_processed(&self, applicant_key: &str, file_name: &str) -> bool {
        self.lock()
            .get(applicant_key)
            .is_some_and(|set| set.contains(file_name))
    }

    /// 某位申请人已处理文件的快照
    pub fn processed_for(&self, applicant_key: &str) -> HashSet<String> {
        self.lock().get(applicant_key).cloned().unwrap_or_default()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// 写回 JSON 文件；纯内存台账直接返回
    pub fn save(&self) -> AppResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let snapshot: BTreeMap<String, BTreeSet<String>> = self
            .lock()
            .iter()
            .map(|(k, v)| (k.clone(), v.iter().cloned().collect()))
            .collect();
        let content = serde_json::to_string_pretty(&snapshot)?;
        std::fs::write(path, content)
            .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;
        debug!("台账已保存: {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marks_are_per_applicant() {
        let ledger = ProcessedLedger::in_memory();
        ledger.mark_processed("Jane Doe", ["payslip1.pdf"]);

        assert!(ledger.is_processed("Jane Doe", "payslip1.pdf"));
        assert!(!ledger.is_processed("John Roe", "payslip1.pdf"));
        assert!(!ledger.is_processed("Jane Doe", "payslip2.pdf"));
    }

    #[test]
    fn save_and_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed.json");

        let ledger = ProcessedLedger::load(&path).unwrap();
        ledger.mark_processed("Jane Doe", ["a.pdf", "b.pdf"]);
        ledger.save().unwrap();

        let reloaded = ProcessedLedger::load(&path).unwrap();
        assert_eq!(reloaded.processed_for("Jane Doe").len(), 2);
        assert!(reloaded.is_processed("Jane Doe", "b.pdf"));
    }

    #[test]
    fn in_memory_save_is_a_no_op() {
        let ledger = ProcessedLedger::in_memory();
        ledger.mark_processed("Jane Doe", ["a.pdf"]);
        assert!(ledger.save().is_ok());
        assert!(ledger.path().is_none());
    }

    #[test]
    fn corrupt_ledger_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(ProcessedLedger::load(&path).is_err());
    }
}
