//! Ports: the collaborator seams of the pipeline.
//!
//! Every external system (LLM, vector store, moderation API, trend sources,
//! agent-state store, wallet ledger, social platform) is reached only through
//! one of these traits. Failures come back as `CollaboratorError` and are
//! reclassified by the calling component.

pub mod agent_state;
pub mod clock;
pub mod content;
pub mod dispatch_queue;
pub mod id_generator;
pub mod ledger;
pub mod memory;
pub mod scoring;
pub mod trend_discovery;

pub use self::agent_state::AgentStateStore;
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::content::{ContentGenerator, GoalDecomposer, Publisher};
pub use self::dispatch_queue::DispatchQueue;
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::ledger::Ledger;
pub use self::memory::MemorySearch;
pub use self::scoring::{AlignmentScorer, SafetyScorer};
pub use self::trend_discovery::{TrendDiscovery, TrendQuery};
