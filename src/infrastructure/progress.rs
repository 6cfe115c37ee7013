//! 上传进度表
//!
//! 后台上传任务写入，调用方通过 `UploadHandle::progress()` 轮询快照。
//! 每个批次通过 `InFlightGuard` 登记，guard 释放时保证该批次进入终态且进度为 100。

use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};

/// 批次状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchState {
    Uploading,
    Completed,
    Failed,
    Cancelled,
}

impl BatchState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, BatchState::Uploading)
    }
}

/// 单个申请人批次的进度快照
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchProgress {
    pub applicant: String,
    pub processed_count: usize,
    pub total_count: usize,
    pub percent: f64,
    pub state: BatchState,
    /// 给界面显示的状态文字（队列深度等）
    pub status: String,
}

#[derive(Debug, Default)]
pub struct ProgressTracker {
    entries: Mutex<Vec<BatchProgress>>,
}

impl ProgressTracker {
    fn lock(&self) -> MutexGuard<'_, Vec<BatchProgress>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 登记一个批次，同名批次会被重置
    pub fn begin(self: &Arc<Self>, applicant: &str, total_count: usize) -> InFlightGuard {
        let fresh = BatchProgress {
            applicant: applicant.to_string(),
            processed_count: 0,
            total_count,
            percent: 0.0,
            state: BatchState::Uploading,
            status: "等待上传".to_string(),
        };
        {
            let mut entries = self.lock();
            match entries.iter_mut().find(|p| p.applicant == applicant) {
                Some(existing) => *existing = fresh,
                None => entries.push(fresh),
            }
        }
        InFlightGuard {
            tracker: Arc::clone(self),
            applicant: applicant.to_string(),
            finished: false,
        }
    }

    fn with_entry(&self, applicant: &str, f: impl FnOnce(&mut BatchProgress)) {
        if let Some(entry) = self.lock().iter_mut().find(|p| p.applicant == applicant) {
            f(entry);
        }
    }

    /// 所有批次的快照（按登记顺序）
    pub fn snapshot(&self) -> Vec<BatchProgress> {
        self.lock().clone()
    }

    pub fn get(&self, applicant: &str) -> Option<BatchProgress> {
        self.lock().iter().find(|p| p.applicant == applicant).cloned()
    }

    /// 是否所有已登记的批次都已进入终态
    pub fn is_idle(&self) -> bool {
        self.lock().iter().all(|p| p.state.is_terminal())
    }
}

/// 进行中批次的句柄
///
/// 未显式 `finish` 就被释放时，批次记为失败，进度置为 100
#[derive(Debug)]
pub struct InFlightGuard {
    tracker: Arc<ProgressTracker>,
    applicant: String,
    finished: bool,
}

impl InFlightGuard {
    /// 更新进度，百分比只增不减
    pub fn advance(&self, processed_count: usize, percent: f64, status: impl Into<String>) {
        let status = status.into();
        self.tracker.with_entry(&self.applicant, |entry| {
            entry.processed_count = processed_count;
            entry.percent = entry.percent.max(percent);
            entry.status = status;
        });
    }

    /// 批次结束（成功、失败或取消）
    pub fn finish(mut self, state: BatchState, status: impl Into<String>) {
        self.close(state, status.into());
    }

    fn close(&mut self, state: BatchState, status: String) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.tracker.with_entry(&self.applicant, |entry| {
            entry.state = state;
            entry.percent = 100.0;
            entry.status = status;
        });
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.close(BatchState::Failed, "上传中断".to_string());
    }
}
