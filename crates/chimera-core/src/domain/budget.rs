use serde::{Deserialize, Serialize};

fn default_currency() -> String {
    "USDC".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
}

impl Transaction {
    pub fn new(amount: f64) -> Self {
        Self {
            amount,
            currency: default_currency(),
            purpose: None,
            recipient: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentBudget {
    pub daily_limit: f64,
    pub spent_today: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_defaults_to_usdc() {
        let tx: Transaction = serde_json::from_str(r#"{"amount": 12.5}"#).unwrap();
        assert_eq!(tx.currency, "USDC");
        assert_eq!(tx, Transaction::new(12.5));
    }
}
