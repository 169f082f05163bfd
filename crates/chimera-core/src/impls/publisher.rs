use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{AgentId, CollaboratorError};
use crate::ports::Publisher;

/// Keeps every published payload in memory.
#[derive(Default)]
pub struct RecordingPublisher {
    posts: Mutex<Vec<(AgentId, serde_json::Value)>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn posts(&self) -> Vec<(AgentId, serde_json::Value)> {
        self.posts.lock().await.clone()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(
        &self,
        agent: AgentId,
        payload: &serde_json::Value,
    ) -> Result<String, CollaboratorError> {
        let mut posts = self.posts.lock().await;
        posts.push((agent, payload.clone()));
        Ok(format!("post-{}", posts.len()))
    }
}
