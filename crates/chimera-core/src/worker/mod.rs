//! Task execution.
//!
//! `TaskWorker::execute_task` dispatches on the task variant, one handler per
//! variant, and turns every error into a status: transient errors become
//! `retry`, validation and fatal errors become `failed`. Nothing is reported
//! `complete` for generated content unless the judge approved it.

pub mod group;
mod handlers;
pub mod prompt;

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info, instrument, warn};

use crate::config::ChimeraConfig;
use crate::domain::{
    ChimeraError, ChimeraResult, ErrorKind, Persona, Task, TaskResult, TaskType,
};
use crate::judge::{BudgetJudge, ContentValidator};
use crate::ports::{AgentStateStore, ContentGenerator, Ledger, MemorySearch, Publisher, TrendQuery};
use crate::trends::TrendCache;

pub use self::group::{WorkerGroup, WorkerReport};
pub use self::prompt::{build_content_prompt, build_reply_prompt};

#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub memory_limit: usize,
    pub call_timeout: Duration,
    /// Trend lookup used by `research_trends` when the task context names none.
    pub default_trend_query: TrendQuery,
    pub min_relevance: f64,
}

impl WorkerSettings {
    pub fn from_config(config: &ChimeraConfig) -> Self {
        Self {
            memory_limit: config.worker.memory_limit,
            call_timeout: config.worker.collaborator_timeout(),
            default_trend_query: TrendQuery::new(
                &config.agent.niche,
                &config.agent.region,
                config.agent.trend_window_hours,
            ),
            min_relevance: config.agent.min_relevance,
        }
    }
}

/// Collaborators a worker talks to.
#[derive(Clone)]
pub struct WorkerDeps {
    pub memory: Arc<dyn MemorySearch>,
    pub generator: Arc<dyn ContentGenerator>,
    pub validator: Arc<dyn ContentValidator>,
    pub agent_state: Arc<dyn AgentStateStore>,
    pub trends: Arc<TrendCache>,
    pub ledger: Arc<dyn Ledger>,
    pub publisher: Arc<dyn Publisher>,
}

pub struct TaskWorker {
    persona: Persona,
    settings: WorkerSettings,
    deps: WorkerDeps,
    budget: BudgetJudge,
}

impl TaskWorker {
    pub fn new(persona: Persona, settings: WorkerSettings, deps: WorkerDeps) -> Self {
        Self {
            persona,
            settings,
            deps,
            budget: BudgetJudge,
        }
    }

    /// Execute one attempt. Always returns a result, with its duration set.
    #[instrument(skip(self, task), fields(task = %task.task_id, agent = %task.agent_id, task_type = %task.task_type))]
    pub async fn execute_task(&self, task: &Task) -> TaskResult {
        let started = Instant::now();

        let outcome = match &task.task_type {
            TaskType::GenerateContent => self.generate_content(task).await,
            TaskType::ReplyComment => self.reply_comment(task).await,
            TaskType::ExecuteTransaction => self.execute_transaction(task).await,
            TaskType::ResearchTrends => self.research_trends(task).await,
            TaskType::PublishContent => self.publish_content(task).await,
            TaskType::Other(name) => Err(ChimeraError::UnknownTaskType(name.clone())),
        };

        let result = match outcome {
            Ok(result) => {
                info!(status = ?result.status, "task executed");
                result
            }
            Err(err) => {
                match err.kind() {
                    ErrorKind::Transient => warn!(error = %err, "transient failure; eligible for retry"),
                    ErrorKind::Validation | ErrorKind::Fatal => error!(error = %err, "task failed"),
                }
                TaskResult::from_error(&err)
            }
        };

        result.with_execution_time(elapsed_ms(started))
    }

    /// Decode a dispatch record and execute it. An undecodable record fails
    /// without a task.
    pub async fn execute_record(&self, record: &str) -> (Option<Task>, TaskResult) {
        let started = Instant::now();
        match Task::from_wire(record) {
            Ok(task) => {
                let result = self.execute_task(&task).await;
                (Some(task), result)
            }
            Err(err) => {
                error!(error = %err, "dropping malformed dispatch record");
                (
                    None,
                    TaskResult::from_error(&err).with_execution_time(elapsed_ms(started)),
                )
            }
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Required non-blank string from the task context, or a fatal error.
fn require_str<'a>(task: &'a Task, key: &str) -> ChimeraResult<&'a str> {
    task.context_str(key).ok_or_else(|| {
        ChimeraError::Fatal(format!(
            "{} task {} has no `{key}` in its context",
            task.task_type, task.task_id
        ))
    })
}
