use serde::{Deserialize, Serialize};

use super::errors::{ChimeraError, ErrorKind};

/// Final status of one execution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Complete,
    Rejected,
    Retry,
    Failed,
}

impl TaskStatus {
    /// `Retry` is the only status that sends a task back to dispatch.
    pub fn is_terminal(self) -> bool {
        !matches!(self, TaskStatus::Retry)
    }
}

/// Outcome of one attempt. Wire shape: `{status, output, error?, execution_time_ms?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub status: TaskStatus,
    #[serde(default)]
    pub output: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<u64>,
}

impl TaskResult {
    pub fn complete(output: serde_json::Value) -> Self {
        Self {
            status: TaskStatus::Complete,
            output,
            error: None,
            execution_time_ms: None,
        }
    }

    pub fn rejected(output: serde_json::Value, reason: impl Into<String>) -> Self {
        Self {
            status: TaskStatus::Rejected,
            output,
            error: Some(reason.into()),
            execution_time_ms: None,
        }
    }

    pub fn retry(error: impl Into<String>) -> Self {
        Self {
            status: TaskStatus::Retry,
            output: serde_json::Value::Null,
            error: Some(error.into()),
            execution_time_ms: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: TaskStatus::Failed,
            output: serde_json::Value::Null,
            error: Some(error.into()),
            execution_time_ms: None,
        }
    }

    /// Transient errors become `retry`; validation and fatal errors become `failed`.
    pub fn from_error(err: &ChimeraError) -> Self {
        match err.kind() {
            ErrorKind::Transient => Self::retry(err.to_string()),
            ErrorKind::Validation | ErrorKind::Fatal => Self::failed(err.to_string()),
        }
    }

    pub fn with_execution_time(mut self, millis: u64) -> Self {
        self.execution_time_ms = Some(millis);
        self
    }
}
