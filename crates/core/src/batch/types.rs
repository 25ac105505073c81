//! Types for the batch orchestrator.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::task::ConversionTask;

/// Errors raised when starting a batch.
#[derive(Debug, Error)]
pub enum BatchError {
    /// The engine is an exclusive resource; only one batch may be active.
    #[error("A batch is already running")]
    AlreadyRunning,

    /// An empty task list was submitted.
    #[error("Batch has no tasks")]
    Empty,
}

/// Lifecycle state of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchState {
    /// Not started.
    Idle,
    /// Trying connection identities.
    Connecting,
    /// Tasks are being processed.
    Running,
    /// All tasks reached a terminal status.
    Completed,
    /// Cancellation was observed at a task boundary.
    Cancelled,
    /// No connection identity worked; nothing ran.
    Fatal,
}

/// Cooperative cancellation flag.
///
/// Set from any thread, observed by the worker only between tasks. An
/// individual conversion call has no timeout or preemption, so a stalled
/// engine stalls the remainder of the batch.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Creates an unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Final outcome of a batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    /// Batch id.
    pub batch_id: Uuid,
    /// Number of planned tasks.
    pub total: usize,
    /// Tasks that reached a terminal status before the batch ended.
    /// Equals `total` unless the batch was cancelled.
    pub processed: usize,
    /// Tasks that succeeded.
    pub succeeded: usize,
    /// The failed tasks, with their diagnostics.
    pub failed: Vec<ConversionTask>,
    /// When the task loop started.
    pub started_at: DateTime<Utc>,
    /// When the batch ended.
    pub finished_at: DateTime<Utc>,
}

impl BatchReport {
    /// Number of failed tasks.
    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }
}

/// Events published from the worker thread.
///
/// Delivered through an asynchronous channel; consumers (typically a UI
/// event loop) must never be called into directly from the worker.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BatchEvent {
    /// Connection identities are being tried.
    Connecting,
    /// An identity connected.
    Connected {
        /// The identity that succeeded.
        identity: String,
    },
    /// A task is about to be processed.
    Progress {
        /// Zero-based task index.
        index: usize,
        /// Number of planned tasks.
        total: usize,
        /// Input file name of the current task.
        file_name: String,
    },
    /// A task reached a terminal status.
    TaskFinished {
        /// Zero-based task index.
        index: usize,
        /// The task with its terminal status and any diagnostic.
        task: ConversionTask,
    },
    /// The batch ran to completion.
    Completed {
        /// Aggregated outcome.
        report: BatchReport,
    },
    /// Cancellation was observed; remaining tasks were skipped.
    /// Already-terminal tasks keep their status.
    Cancelled {
        /// Partial outcome at the point cancellation was observed.
        report: BatchReport,
    },
    /// No connection identity worked; the batch never started.
    Fatal {
        /// Combined diagnostics of every attempted identity.
        error: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_flag() {
        let flag = CancelFlag::new();
        assert!(!flag.is_cancelled());

        let clone = flag.clone();
        clone.cancel();
        assert!(flag.is_cancelled());
    }

    #[test]
    fn test_event_serialization() {
        let event = BatchEvent::Progress {
            index: 2,
            total: 10,
            file_name: "report.hwp".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"progress\""));
        assert!(json.contains("report.hwp"));
    }
}
