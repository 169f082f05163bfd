use async_trait::async_trait;

use crate::domain::{CollaboratorError, Priority};

/// Ready queue carrying serialised task records.
///
/// `pop` is exclusive: a record is handed to exactly one consumer.
#[async_trait]
pub trait DispatchQueue: Send + Sync {
    async fn push(&self, priority: Priority, record: String) -> Result<(), CollaboratorError>;

    /// Wait for the next record. `Ok(None)` once the queue is closed and drained.
    async fn pop(&self) -> Result<Option<String>, CollaboratorError>;

    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Stop accepting records and wake every waiting consumer.
    async fn close(&self);
}
