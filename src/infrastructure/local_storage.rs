//! 本地下载目录
//!
//! 每位申请人一个以全名命名的子目录，文件通过列目录发现，以二进制方式读取

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::error::{AppError, AppResult, FileError};
use crate::models::Applicant;

#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 申请人的下载目录：`<root>/<名 姓>`
    pub fn applicant_folder(&self, applicant: &Applicant) -> PathBuf {
        self.root.join(applicant.full_name())
    }

    /// 列出目录中的文件名（不含子目录），按名称排序
    pub async fn list_files(&self, folder: &Path) -> AppResult<Vec<String>> {
        if !fs::try_exists(folder).await.unwrap_or(false) {
            return Err(FileError::DirectoryNotFound {
                path: folder.display().to_string(),
            }
            .into());
        }

        let mut entries = fs::read_dir(folder)
            .await
            .map_err(|e| AppError::file_read_failed(folder.display().to_string(), e))?;

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// 按顺序在多个目录中查找文件，返回第一个存在的完整路径
    ///
    /// 只接受纯文件名，带路径分隔符或 `..` 的名字一律视为不存在
    pub async fn locate(&self, folders: &[PathBuf], file_name: &str) -> Option<PathBuf> {
        if Path::new(file_name).file_name() != Some(OsStr::new(file_name)) {
            debug!("忽略非法文件名: {}", file_name);
            return None;
        }
        for folder in folders {
            let candidate = folder.join(file_name);
            if let Ok(meta) = fs::metadata(&candidate).await {
                if meta.is_file() {
                    return Some(candidate);
                }
            }
        }
        None
    }

    /// 读取整个文件；文件句柄在返回前关闭
    pub async fn read(&self, path: &Path) -> AppResult<Vec<u8>> {
        fs::read(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                FileError::NotFound {
                    path: path.display().to_string(),
                }
                .into()
            } else {
                AppError::file_read_failed(path.display().to_string(), e)
            }
        })
    }
}

/// 文件扩展名（带点，小写）和按扩展名推断的 MIME 类型
pub fn file_metadata(file_name: &str) -> (String, String) {
    let extension = Path::new(file_name)
        .extension()
        .and_then(OsStr::to_str)
        .map(|ext| format!(".{}", ext.to_lowercase()))
        .unwrap_or_default();
    let mime_type = mime_guess::from_path(file_name)
        .first_or_octet_stream()
        .essence_str()
        .to_string();
    (extension, mime_type)
}
