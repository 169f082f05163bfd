//! Domain model (ids, tasks, results, judgments, trends, content, budgets, errors).

pub mod agent;
pub mod budget;
pub mod content;
pub mod errors;
pub mod ids;
pub mod judgment;
pub mod result;
pub mod task;
pub mod trend;

pub use agent::AgentStatus;
pub use budget::{AgentBudget, Transaction};
pub use content::{ContentOutput, GeneratedContent, JudgeContext, Persona};
pub use errors::{ChimeraError, ChimeraResult, CollaboratorError, ErrorKind, with_deadline};
pub use ids::{AgentId, TaskId, TrendId};
pub use judgment::{CheckScore, Judgment, Route, RoutingThresholds, STALE_STATE_REASON};
pub use result::{TaskResult, TaskStatus};
pub use task::{Priority, Task, TaskContext, TaskType};
pub use trend::{RawTrend, Trend, TrendSource};
