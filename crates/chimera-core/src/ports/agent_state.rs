use async_trait::async_trait;

use crate::domain::{AgentId, AgentStatus, CollaboratorError};

/// Authoritative agent state. Read-only from the pipeline's side.
#[async_trait]
pub trait AgentStateStore: Send + Sync {
    async fn current_version(&self, agent: AgentId) -> Result<u64, CollaboratorError>;

    async fn status(&self, agent: AgentId) -> Result<AgentStatus, CollaboratorError>;
}
