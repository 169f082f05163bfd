//! chimera-core
//!
//! Planner / worker / judge pipeline for autonomous social-media agents.
//!
//! # Modules
//! - **domain**: tasks, results, judgments, trends, content, budgets, errors
//! - **ports**: async collaborator traits (queue, LLM, memory, trends, scorers, ledger, ...)
//! - **impls**: in-memory and scripted port implementations for development and tests
//! - **planner**: goal decomposition and dependency-gated dispatch
//! - **worker**: task execution and the worker pool
//! - **judge**: output validation, confidence routing and budget checks
//! - **trends**: TTL cache in front of trend discovery
//! - **swarm**: the runtime wiring workers, judge and planner together
//! - **config**, **retry**, **observability**

pub mod config;
pub mod domain;
pub mod impls;
pub mod judge;
pub mod observability;
pub mod planner;
pub mod ports;
pub mod retry;
pub mod swarm;
pub mod trends;
pub mod worker;

pub use config::{ChimeraConfig, ConfigError, ConfigLoader};
pub use domain::{ChimeraError, ChimeraResult};
pub use swarm::Swarm;
