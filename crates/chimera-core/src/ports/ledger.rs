use async_trait::async_trait;

use crate::domain::{AgentBudget, AgentId, CollaboratorError, Transaction};

/// Wallet ledger. `record` is only ever called after the budget gate approved.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn budget(&self, agent: AgentId) -> Result<AgentBudget, CollaboratorError>;

    /// Record an approved transaction and return its reference.
    async fn record(&self, agent: AgentId, tx: &Transaction) -> Result<String, CollaboratorError>;
}
