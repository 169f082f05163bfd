use serde::{Deserialize, Serialize};

/// Snapshot of what the swarm has seen so far.
///
/// `dispatched` counts executions reported by workers, retries included.
/// Every other field counts outcomes, so a task retried twice and then
/// completed adds 3 to `dispatched`, 2 to `retried` and 1 to `completed`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwarmCounts {
    pub dispatched: u64,
    pub completed: u64,
    pub awaiting_review: u64,
    pub rejected: u64,
    pub retried: u64,
    pub failed: u64,
}

impl SwarmCounts {
    /// Tasks that reached a final status.
    pub fn terminal(&self) -> u64 {
        self.completed + self.awaiting_review + self.rejected + self.failed
    }
}
