use async_trait::async_trait;

use crate::domain::{AgentId, CollaboratorError, GeneratedContent};

/// Natural-language goal decomposition (an LLM in production).
#[async_trait]
pub trait GoalDecomposer: Send + Sync {
    /// Ordered, human-readable steps. An empty list is allowed.
    async fn decompose(&self, prompt: &str) -> Result<Vec<String>, CollaboratorError>;
}

/// Text/image generation backend.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<GeneratedContent, CollaboratorError>;
}

/// Social-platform publishing.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Returns the platform's reference for the created post.
    async fn publish(
        &self,
        agent: AgentId,
        payload: &serde_json::Value,
    ) -> Result<String, CollaboratorError>;
}
