use crate::error::{AppError, AppResult, FileError};
use crate::models::case::ScrapedCase;
use std::path::{Path, PathBuf};
use tokio::fs;

/// 从 TOML 文件加载一个抓取案例
pub async fn load_case_file(case_file_path: &Path) -> AppResult<ScrapedCase> {
    let content = fs::read_to_string(case_file_path)
        .await
        .map_err(|e| AppError::file_read_failed(case_file_path.display().to_string(), e))?;

    let mut case: ScrapedCase = toml::from_str(&content).map_err(|e| {
        AppError::File(FileError::TomlParseFailed {
            path: case_file_path.display().to_string(),
            source: Box::new(e),
        })
    })?;

    // 设置文件路径
    case.file_path = Some(case_file_path.to_string_lossy().to_string());

    Ok(case)
}

/// 从文件夹中加载所有案例文件，按文件名排序
///
/// 解析失败的文件会被跳过并记录警告
pub async fn load_all_case_files(folder_path: &str) -> AppResult<Vec<ScrapedCase>> {
    let folder = PathBuf::from(folder_path);

    if !folder.exists() {
        return Err(FileError::DirectoryNotFound {
            path: folder_path.to_string(),
        }
        .into());
    }

    let mut entries = fs::read_dir(&folder)
        .await
        .map_err(|e| AppError::file_read_failed(folder_path, e))?;

    let mut case_files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            case_files.push(path);
        }
    }
    case_files.sort();

    let mut cases = Vec::new();
    for path in case_files {
        tracing::info!(
            "正在加载: {}",
            path.file_name().unwrap_or_default().to_string_lossy()
        );

        match load_case_file(&path).await {
            Ok(case) => {
                tracing::info!("成功加载 {} 位申请人", case.applicants.len());
                cases.push(case);
            }
            Err(e) => {
                tracing::warn!("加载文件失败 {}: {}", path.display(), e);
            }
        }
    }

    Ok(cases)
}

/// 将处理完的案例文件改名为 `<name>.done`
pub async fn archive_case_file(case_file_path: &str) -> AppResult<PathBuf> {
    let archived = PathBuf::from(format!("{}.done", case_file_path));
    fs::rename(case_file_path, &archived)
        .await
        .map_err(|e| AppError::file_write_failed(case_file_path, e))?;
    Ok(archived)
}
