use async_trait::async_trait;

use crate::domain::{CollaboratorError, Persona};

/// Moderation collaborator. Higher is safer, range [0, 1].
#[async_trait]
pub trait SafetyScorer: Send + Sync {
    async fn score(&self, text: &str) -> Result<f64, CollaboratorError>;
}

/// Optional model-backed persona alignment. Range [0, 1].
#[async_trait]
pub trait AlignmentScorer: Send + Sync {
    async fn score(&self, persona: &Persona, text: &str) -> Result<f64, CollaboratorError>;
}
