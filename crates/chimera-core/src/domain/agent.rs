use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    #[default]
    Active,
    Paused,
    Stopped,
}

impl AgentStatus {
    pub fn is_active(self) -> bool {
        self == AgentStatus::Active
    }
}
