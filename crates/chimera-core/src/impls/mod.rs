//! In-memory and scripted implementations of the ports.
//!
//! Used by the demo binary and the tests. Production clients for the LLM,
//! vector store, moderation API, trend sources, ledger and social platforms
//! live outside this crate.

pub mod agent_state;
pub mod dispatch_queue;
pub mod ledger;
pub mod memory;
pub mod publisher;
pub mod safety;
pub mod scripted;
pub mod trends;

pub use self::agent_state::InMemoryAgentStateStore;
pub use self::dispatch_queue::InMemoryDispatchQueue;
pub use self::ledger::InMemoryLedger;
pub use self::memory::InMemoryMemoryStore;
pub use self::publisher::RecordingPublisher;
pub use self::safety::KeywordSafetyScorer;
pub use self::scripted::{ScriptedDecomposer, ScriptedGenerator};
pub use self::trends::StaticTrendDiscovery;
