//! Error types and their operational classification.
//!
//! Collaborators speak `CollaboratorError`; every component converts those at
//! its own boundary into `ChimeraError`, whose `kind()` decides what the
//! pipeline does next (fail fast, retry, or surface to an operator).

use std::time::Duration;

use thiserror::Error;

use super::ids::TaskId;

/// Operational class of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input or violated constraint. Never retried.
    Validation,
    /// Timeout or temporarily unavailable collaborator. Eligible for retry.
    Transient,
    /// Unrecoverable task data. Surfaced, not retried.
    Fatal,
}

fn format_cycle(path: &[TaskId]) -> String {
    path.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[derive(Debug, Error)]
pub enum ChimeraError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("task dependency cycle detected: {}", format_cycle(.0))]
    DependencyCycle(Vec<TaskId>),

    #[error("invalid trend `{topic}`: {reason}")]
    InvalidTrend { topic: String, reason: String },

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("fatal: {0}")]
    Fatal(String),

    #[error("unknown task type: {0}")]
    UnknownTaskType(String),

    #[error("malformed task record: {0}")]
    MalformedRecord(String),
}

impl ChimeraError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ChimeraError::Validation(_)
            | ChimeraError::DependencyCycle(_)
            | ChimeraError::InvalidTrend { .. } => ErrorKind::Validation,
            ChimeraError::Transient(_) | ChimeraError::Timeout { .. } => ErrorKind::Transient,
            ChimeraError::Fatal(_)
            | ChimeraError::UnknownTaskType(_)
            | ChimeraError::MalformedRecord(_) => ErrorKind::Fatal,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}

pub type ChimeraResult<T> = Result<T, ChimeraError>;

/// Failure reported by an external collaborator (LLM, vector store,
/// moderation API, trend source, ledger, ...).
#[derive(Debug, Clone, Error)]
pub enum CollaboratorError {
    #[error("collaborator timed out")]
    Timeout,

    #[error("collaborator unavailable: {0}")]
    Unavailable(String),

    #[error("collaborator rejected request: {0}")]
    InvalidRequest(String),

    #[error("collaborator returned an unusable response: {0}")]
    InvalidResponse(String),
}

impl From<CollaboratorError> for ChimeraError {
    fn from(err: CollaboratorError) -> Self {
        match err {
            CollaboratorError::Timeout => ChimeraError::Transient(err.to_string()),
            CollaboratorError::Unavailable(_) => ChimeraError::Transient(err.to_string()),
            CollaboratorError::InvalidRequest(_) | CollaboratorError::InvalidResponse(_) => {
                ChimeraError::Fatal(err.to_string())
            }
        }
    }
}

impl From<serde_json::Error> for ChimeraError {
    fn from(err: serde_json::Error) -> Self {
        ChimeraError::MalformedRecord(err.to_string())
    }
}

/// Run a collaborator call under a deadline, reclassifying both the deadline
/// and the collaborator's own error.
pub async fn with_deadline<T, F>(
    operation: &'static str,
    after: Duration,
    call: F,
) -> ChimeraResult<T>
where
    F: std::future::Future<Output = Result<T, CollaboratorError>>,
{
    match tokio::time::timeout(after, call).await {
        Ok(result) => result.map_err(ChimeraError::from),
        Err(_) => Err(ChimeraError::Timeout { operation, after }),
    }
}
