//! Conversion task types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Status of a single conversion task.
///
/// Transitions are monotonic: `Pending -> Running -> {Succeeded, Failed}`.
/// A terminal status never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Planned, not started yet.
    Pending,
    /// Currently being converted.
    Running,
    /// Converted successfully.
    Succeeded,
    /// Conversion failed; see [`ConversionTask::error`].
    Failed,
}

impl TaskStatus {
    /// Whether this status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// One planned file conversion.
///
/// Created by the planner with a collision-free output path; mutated only by
/// the batch orchestrator; immutable once terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionTask {
    /// Source document path.
    pub input_path: PathBuf,
    /// Resolved output path, unique within the batch.
    pub output_path: PathBuf,
    /// Current status.
    pub status: TaskStatus,
    /// Failure diagnostic, set when the status becomes `Failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConversionTask {
    /// Creates a new pending task.
    pub fn new(input_path: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: output_path.into(),
            status: TaskStatus::Pending,
            error: None,
        }
    }

    /// Returns the input file name, for progress display.
    pub fn file_name(&self) -> String {
        self.input_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.input_path.display().to_string())
    }

    /// Marks the task as running. No-op if the task is already terminal.
    pub fn mark_running(&mut self) {
        if !self.status.is_terminal() {
            self.status = TaskStatus::Running;
        }
    }

    /// Marks the task as succeeded. No-op if the task is already terminal.
    pub fn mark_succeeded(&mut self) {
        if !self.status.is_terminal() {
            self.status = TaskStatus::Succeeded;
        }
    }

    /// Marks the task as failed with a diagnostic. No-op if already terminal.
    pub fn mark_failed(&mut self, error: impl Into<String>) {
        if !self.status.is_terminal() {
            self.status = TaskStatus::Failed;
            self.error = Some(error.into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_task_is_pending() {
        let task = ConversionTask::new("in/a.hwp", "out/a.pdf");
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.error.is_none());
    }

    #[test]
    fn test_status_transitions() {
        let mut task = ConversionTask::new("a.hwp", "a.pdf");
        task.mark_running();
        assert_eq!(task.status, TaskStatus::Running);
        task.mark_succeeded();
        assert_eq!(task.status, TaskStatus::Succeeded);
    }

    #[test]
    fn test_terminal_status_is_immutable() {
        let mut task = ConversionTask::new("a.hwp", "a.pdf");
        task.mark_failed("open failed");
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.error.as_deref(), Some("open failed"));

        task.mark_succeeded();
        task.mark_running();
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.error.as_deref(), Some("open failed"));
    }

    #[test]
    fn test_file_name() {
        let task = ConversionTask::new("folder/report.hwp", "folder/report.pdf");
        assert_eq!(task.file_name(), "report.hwp");
    }

    #[test]
    fn test_is_terminal() {
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
        assert!(TaskStatus::Succeeded.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
    }
}
