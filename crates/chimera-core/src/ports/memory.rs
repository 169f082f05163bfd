use async_trait::async_trait;

use crate::domain::{AgentId, CollaboratorError};

/// Semantic memory lookup (a vector store in production).
#[async_trait]
pub trait MemorySearch: Send + Sync {
    /// Snippets for `agent` ranked by relevance to `query`, at most `limit`.
    async fn search(
        &self,
        agent: AgentId,
        query: &str,
        limit: usize,
    ) -> Result<Vec<String>, CollaboratorError>;
}
