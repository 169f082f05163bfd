use crate::domain::{AgentBudget, Transaction};

/// Stateless spend gate for financial tasks. Never touches the ledger.
#[derive(Debug, Clone, Copy, Default)]
pub struct BudgetJudge;

impl BudgetJudge {
    /// Approves iff `amount + spent_today <= daily_limit`.
    pub fn validate_transaction(&self, tx: &Transaction, budget: &AgentBudget) -> bool {
        tx.amount + budget.spent_today <= budget.daily_limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(20.0, false)]
    #[case(5.0, true)]
    #[case(4.99, true)]
    #[case(5.01, false)]
    fn gate_against_remaining_budget(#[case] amount: f64, #[case] approved: bool) {
        let budget = AgentBudget {
            daily_limit: 50.0,
            spent_today: 45.0,
        };
        assert_eq!(
            BudgetJudge.validate_transaction(&Transaction::new(amount), &budget),
            approved
        );
    }

    #[test]
    fn nan_amount_is_never_approved() {
        let budget = AgentBudget {
            daily_limit: 50.0,
            spent_today: 0.0,
        };
        assert!(!BudgetJudge.validate_transaction(&Transaction::new(f64::NAN), &budget));
    }
}
