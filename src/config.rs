use std::time::Duration;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 下载根目录（每个申请人一个以全名命名的子目录）
    pub download_root: String,
    /// 抓取结果（案例 TOML 文件）存放目录
    pub case_folder: String,
    /// 输出日志文件
    pub output_log_file: String,
    /// 上传失败记录文件
    pub failure_log_file: String,
    /// 已处理文件台账（JSON），为空表示只保存在内存中
    pub processed_ledger_file: Option<String>,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    // --- 记录库 API 配置 ---
    pub records_api_base_url: String,
    pub records_api_token: String,
    pub applicant_datasheet_id: String,
    pub lender_datasheet_id: String,
    pub application_datasheet_id: String,
    /// 拉取失败时按"未找到"处理（兼容旧行为）
    pub legacy_match_fallback: bool,
    // --- 处理端点配置 ---
    pub processing_endpoint_url: String,
    pub request_timeout_secs: u64,
    /// 单个请求最多携带的文件数
    pub max_files_per_request: usize,
    pub upload_max_retries: usize,
    pub upload_retry_backoff_ms: u64,
    // --- 分类配置 ---
    /// 自定义关键词表（TOML），为空时使用内置表
    pub keyword_table_file: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            download_root: "docs".to_string(),
            case_folder: "output_cases".to_string(),
            output_log_file: "output.txt".to_string(),
            failure_log_file: "failed_uploads.txt".to_string(),
            processed_ledger_file: Some("processed_files.json".to_string()),
            verbose_logging: false,
            records_api_base_url: "https://records.example.com/fusion/v1/datasheets".to_string(),
            records_api_token: String::new(),
            applicant_datasheet_id: "dst_applicant_hub".to_string(),
            lender_datasheet_id: "dst_lender_hub".to_string(),
            application_datasheet_id: "dst_application_hub".to_string(),
            legacy_match_fallback: false,
            processing_endpoint_url: "http://localhost:3012".to_string(),
            request_timeout_secs: 30,
            max_files_per_request: 10,
            upload_max_retries: 2,
            upload_retry_backoff_ms: 500,
            keyword_table_file: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            download_root: std::env::var("DOWNLOAD_ROOT").unwrap_or(default.download_root),
            case_folder: std::env::var("CASE_FOLDER").unwrap_or(default.case_folder),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            failure_log_file: std::env::var("FAILURE_LOG_FILE").unwrap_or(default.failure_log_file),
            processed_ledger_file: match std::env::var("PROCESSED_LEDGER_FILE") {
                Ok(v) if v.trim().is_empty() => None,
                Ok(v) => Some(v),
                Err(_) => default.processed_ledger_file,
            },
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            records_api_base_url: std::env::var("RECORDS_API_BASE_URL").unwrap_or(default.records_api_base_url),
            records_api_token: std::env::var("RECORDS_API_TOKEN").unwrap_or(default.records_api_token),
            applicant_datasheet_id: std::env::var("APPLICANT_DATASHEET_ID").unwrap_or(default.applicant_datasheet_id),
            lender_datasheet_id: std::env::var("LENDER_DATASHEET_ID").unwrap_or(default.lender_datasheet_id),
            application_datasheet_id: std::env::var("APPLICATION_DATASHEET_ID").unwrap_or(default.application_datasheet_id),
            legacy_match_fallback: std::env::var("LEGACY_MATCH_FALLBACK").ok().and_then(|v| v.parse().ok()).unwrap_or(default.legacy_match_fallback),
            processing_endpoint_url: std::env::var("PROCESSING_ENDPOINT_URL").unwrap_or(default.processing_endpoint_url),
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.request_timeout_secs),
            max_files_per_request: std::env::var("MAX_FILES_PER_REQUEST").ok().and_then(|v| v.parse().ok()).filter(|n: &usize| *n > 0).unwrap_or(default.max_files_per_request),
            upload_max_retries: std::env::var("UPLOAD_MAX_RETRIES").ok().and_then(|v| v.parse().ok()).unwrap_or(default.upload_max_retries),
            upload_retry_backoff_ms: std::env::var("UPLOAD_RETRY_BACKOFF_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.upload_retry_backoff_ms),
            keyword_table_file: std::env::var("KEYWORD_TABLE_FILE").ok().filter(|v| !v.trim().is_empty()),
        }
    }

    /// 远程请求超时
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// 首次重试前的等待时间
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.upload_retry_backoff_ms)
    }
}
