use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{AgentId, AgentStatus, CollaboratorError};
use crate::ports::AgentStateStore;

#[derive(Debug, Clone, Copy, Default)]
struct AgentState {
    version: u64,
    status: AgentStatus,
}

/// Agent-state store. Unknown agents read as active at version 0.
#[derive(Default)]
pub struct InMemoryAgentStateStore {
    agents: RwLock<HashMap<AgentId, AgentState>>,
}

impl InMemoryAgentStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_version(&self, agent: AgentId, version: u64) {
        self.agents.write().await.entry(agent).or_default().version = version;
    }

    /// Simulates a campaign update elsewhere; returns the new version.
    pub async fn bump_version(&self, agent: AgentId) -> u64 {
        let mut agents = self.agents.write().await;
        let state = agents.entry(agent).or_default();
        state.version += 1;
        state.version
    }

    pub async fn set_status(&self, agent: AgentId, status: AgentStatus) {
        self.agents.write().await.entry(agent).or_default().status = status;
    }
}

#[async_trait]
impl AgentStateStore for InMemoryAgentStateStore {
    async fn current_version(&self, agent: AgentId) -> Result<u64, CollaboratorError> {
        Ok(self
            .agents
            .read()
            .await
            .get(&agent)
            .map(|s| s.version)
            .unwrap_or_default())
    }

    async fn status(&self, agent: AgentId) -> Result<AgentStatus, CollaboratorError> {
        Ok(self
            .agents
            .read()
            .await
            .get(&agent)
            .map(|s| s.status)
            .unwrap_or_default())
    }
}
