pub mod processing_client;
pub mod records_client;

pub use processing_client::ProcessingClient;
pub use records_client::RecordsClient;

use std::time::Duration;

use crate::error::{AppResult, ConfigError};

/// 带超时的 HTTP 客户端
pub(crate) fn http_client(timeout: Duration) -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ConfigError::HttpClient { source: Box::new(e) }.into())
}
