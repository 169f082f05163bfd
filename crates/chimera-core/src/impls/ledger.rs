use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{AgentBudget, AgentId, CollaboratorError, Transaction};
use crate::ports::Ledger;

#[derive(Default)]
struct LedgerState {
    budgets: HashMap<AgentId, AgentBudget>,
    recorded: Vec<(AgentId, Transaction)>,
}

/// Ledger with a shared default daily limit and per-agent overrides.
pub struct InMemoryLedger {
    default_limit: f64,
    state: Mutex<LedgerState>,
}

impl InMemoryLedger {
    pub fn new(default_limit: f64) -> Self {
        Self {
            default_limit,
            state: Mutex::new(LedgerState::default()),
        }
    }

    pub async fn set_budget(&self, agent: AgentId, budget: AgentBudget) {
        self.state.lock().await.budgets.insert(agent, budget);
    }

    pub async fn recorded(&self) -> Vec<(AgentId, Transaction)> {
        self.state.lock().await.recorded.clone()
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn budget(&self, agent: AgentId) -> Result<AgentBudget, CollaboratorError> {
        Ok(self
            .state
            .lock()
            .await
            .budgets
            .get(&agent)
            .copied()
            .unwrap_or(AgentBudget {
                daily_limit: self.default_limit,
                spent_today: 0.0,
            }))
    }

    async fn record(&self, agent: AgentId, tx: &Transaction) -> Result<String, CollaboratorError> {
        let mut state = self.state.lock().await;
        let default_limit = self.default_limit;
        let budget = state.budgets.entry(agent).or_insert(AgentBudget {
            daily_limit: default_limit,
            spent_today: 0.0,
        });
        budget.spent_today += tx.amount;
        state.recorded.push((agent, tx.clone()));
        Ok(format!("tx-{}", state.recorded.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn record_updates_spent_today() {
        let ledger = InMemoryLedger::new(50.0);
        let agent = AgentId::generate();

        ledger.record(agent, &Transaction::new(20.0)).await.unwrap();
        let budget = ledger.budget(agent).await.unwrap();

        assert_eq!(budget.daily_limit, 50.0);
        assert_eq!(budget.spent_today, 20.0);
        assert_eq!(ledger.recorded().await.len(), 1);
    }
}
