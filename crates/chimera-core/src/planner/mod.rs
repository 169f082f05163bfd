//! Goal planning and dependency-gated dispatch.
//!
//! The planner is the only writer of the dependency index. Tasks reach the
//! dispatch queue through exactly two doors: `enqueue_task` (when every
//! dependency is already complete) and `release_ready` (once the last unmet
//! dependency of a held task completes). A released task whose push fails
//! stays in the index until a later `release_ready` gets it through.

pub mod dag;
pub mod decompose;
pub mod index;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::config::ChimeraConfig;
use crate::domain::{
    AgentId, ChimeraError, ChimeraResult, Priority, Task, TaskContext, TaskId, TaskType,
    with_deadline,
};
use crate::ports::{AgentStateStore, Clock, DispatchQueue, GoalDecomposer, IdGenerator, TrendQuery};
use crate::trends::TrendCache;

pub use self::dag::{DependencyGraph, validate_dag};
use self::decompose::{
    FALLBACK_STEPS, build_planning_prompt, infer_priority, infer_task_type, normalise_steps, stage,
};
use self::index::{Admission, DependencyIndex};

/// Relevance at or above which a trend task is dispatched as HIGH.
const HOT_TREND_RELEVANCE: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Pushed to the dispatch queue.
    Accepted,
    /// Parked in the dependency index.
    Held,
}

#[derive(Debug, Clone)]
pub struct PlannerSettings {
    pub niche: String,
    pub region: String,
    pub trend_window_hours: u32,
    pub min_relevance: f64,
    pub call_timeout: Duration,
}

impl PlannerSettings {
    pub fn from_config(config: &ChimeraConfig) -> Self {
        Self {
            niche: config.agent.niche.clone(),
            region: config.agent.region.clone(),
            trend_window_hours: config.agent.trend_window_hours,
            min_relevance: config.agent.min_relevance,
            call_timeout: config.worker.collaborator_timeout(),
        }
    }

    fn trend_query(&self) -> TrendQuery {
        TrendQuery::new(&self.niche, &self.region, self.trend_window_hours)
    }
}

/// Collaborators the planner talks to.
#[derive(Clone)]
pub struct PlannerDeps {
    pub queue: Arc<dyn DispatchQueue>,
    pub decomposer: Arc<dyn GoalDecomposer>,
    pub trends: Arc<TrendCache>,
    pub agent_state: Arc<dyn AgentStateStore>,
    pub ids: Arc<dyn IdGenerator>,
    pub clock: Arc<dyn Clock>,
}

pub struct TaskDagPlanner {
    agent_id: AgentId,
    settings: PlannerSettings,
    deps: PlannerDeps,
    index: Mutex<DependencyIndex>,
    dispatched: AtomicU64,
}

impl TaskDagPlanner {
    pub fn new(agent_id: AgentId, settings: PlannerSettings, deps: PlannerDeps) -> Self {
        Self {
            agent_id,
            settings,
            deps,
            index: Mutex::new(DependencyIndex::new()),
            dispatched: AtomicU64::new(0),
        }
    }

    pub fn agent_id(&self) -> AgentId {
        self.agent_id
    }

    /// Break `goal` into a validated task DAG. Nothing is enqueued.
    #[instrument(skip(self), fields(agent = %self.agent_id))]
    pub async fn decompose_goal(&self, goal: &str) -> ChimeraResult<Vec<Task>> {
        let goal = goal.trim();
        if goal.is_empty() {
            return Err(ChimeraError::Validation("goal must not be blank".into()));
        }

        let prompt = build_planning_prompt(goal);
        let steps = with_deadline(
            "goal decomposition",
            self.settings.call_timeout,
            self.deps.decomposer.decompose(&prompt),
        )
        .await?;

        let mut steps = normalise_steps(steps);
        if steps.is_empty() {
            warn!("decomposer returned no steps; using the default pipeline");
            steps = FALLBACK_STEPS.iter().map(|s| s.to_string()).collect();
        }

        let state_version = self.current_version().await?;
        let created_at = self.deps.clock.now();

        let mut tasks: Vec<Task> = steps
            .iter()
            .map(|step| {
                Task::new(
                    self.deps.ids.task_id(),
                    infer_task_type(step),
                    self.agent_id,
                    infer_priority(step),
                    created_at,
                    state_version,
                )
                .with_context("goal", json!(goal))
                .with_context("step", json!(step))
                .with_context("topic", json!(goal))
            })
            .collect();

        link_stages(&mut tasks);
        validate_dag(&tasks)?;

        info!(tasks = tasks.len(), state_version, "goal decomposed");
        Ok(tasks)
    }

    /// Reject any task set containing a dependency cycle.
    pub fn validate_dag(&self, tasks: &[Task]) -> ChimeraResult<()> {
        validate_dag(tasks).map(|_| ())
    }

    /// Push `task` if its dependencies are complete, otherwise hold it.
    #[instrument(skip(self, task), fields(task = %task.task_id, task_type = %task.task_type))]
    pub async fn enqueue_task(&self, task: Task) -> ChimeraResult<EnqueueOutcome> {
        if task.dependencies.contains(&task.task_id) {
            return Err(ChimeraError::DependencyCycle(vec![task.task_id, task.task_id]));
        }

        let mut index = self.index.lock().await;
        match index.admit(task) {
            Admission::Ready(task) => {
                if let Err(err) = self.push(&task).await {
                    index.forget(task.task_id);
                    return Err(err);
                }
                info!("task accepted");
                Ok(EnqueueOutcome::Accepted)
            }
            Admission::Held => {
                info!("task held on unmet dependencies");
                Ok(EnqueueOutcome::Held)
            }
            Admission::Duplicate => Err(ChimeraError::Validation(
                "task was already enqueued".into(),
            )),
        }
    }

    /// Validate the whole set, then enqueue in dependency order.
    pub async fn enqueue_all(&self, tasks: Vec<Task>) -> ChimeraResult<Vec<(TaskId, EnqueueOutcome)>> {
        let order = validate_dag(&tasks)?;
        let mut by_id: BTreeMap<TaskId, Task> =
            tasks.into_iter().map(|t| (t.task_id, t)).collect();

        let mut outcomes = Vec::with_capacity(by_id.len());
        for id in order {
            if let Some(task) = by_id.remove(&id) {
                outcomes.push((id, self.enqueue_task(task).await?));
            }
        }
        Ok(outcomes)
    }

    /// Record a completion and push every task it made ready.
    ///
    /// The approved `content` in `output` (caption, image, hashtags) is
    /// carried into the context of each dependent. Idempotent: a repeated
    /// completion records nothing new but still pushes whatever an earlier
    /// failed push left behind. Returns the ids released by this call.
    #[instrument(skip(self, output))]
    pub async fn complete_task(
        &self,
        task_id: TaskId,
        output: &serde_json::Value,
    ) -> ChimeraResult<Vec<TaskId>> {
        let mut index = self.index.lock().await;
        index.complete(task_id, handoff(output));
        self.push_ready(&mut index).await
    }

    /// Push released tasks left behind by a failed push.
    pub async fn release_ready(&self) -> ChimeraResult<Vec<TaskId>> {
        let mut index = self.index.lock().await;
        self.push_ready(&mut index).await
    }

    async fn push_ready(&self, index: &mut DependencyIndex) -> ChimeraResult<Vec<TaskId>> {
        let mut ready = index.take_ready().into_iter();
        let mut released = Vec::new();
        while let Some(task) = ready.next() {
            if let Err(err) = self.push(&task).await {
                warn!(task = %task.task_id, error = %err, "released task not pushed");
                index.defer(std::iter::once(task).chain(ready));
                return Err(err);
            }
            released.push(task.task_id);
        }

        if !released.is_empty() {
            info!(released = released.len(), "dependents released");
        }
        Ok(released)
    }

    /// Push a task straight back to dispatch. Only for the retry path: its
    /// dependencies were satisfied when it was first dispatched.
    pub async fn requeue(&self, task: &Task) -> ChimeraResult<()> {
        debug!(task = %task.task_id, "requeueing");
        self.push(task).await
    }

    /// Tasks admitted but not dispatched: held on dependencies, or released
    /// and waiting for a successful push.
    pub async fn pending_count(&self) -> usize {
        let index = self.index.lock().await;
        index.held_count() + index.ready_count()
    }

    pub async fn is_completed(&self, task_id: TaskId) -> bool {
        self.index.lock().await.is_completed(task_id)
    }

    /// Records pushed to dispatch so far, retries included.
    pub fn dispatched_total(&self) -> u64 {
        self.dispatched.load(Ordering::SeqCst)
    }

    /// Turn fresh trends into content tasks. A non-active agent returns
    /// immediately, before any collaborator is consulted.
    #[instrument(skip(self), fields(agent = %self.agent_id))]
    pub async fn poll_resources(&self) -> ChimeraResult<Vec<Task>> {
        let status = with_deadline(
            "agent status",
            self.settings.call_timeout,
            self.deps.agent_state.status(self.agent_id),
        )
        .await?;
        if !status.is_active() {
            debug!(?status, "agent not active; skipping poll");
            return Ok(Vec::new());
        }

        let state_version = self.current_version().await?;
        let trends = self
            .deps
            .trends
            .fetch_trends(&self.settings.trend_query(), self.settings.min_relevance)
            .await?;

        let created_at = self.deps.clock.now();
        let mut created = Vec::with_capacity(trends.len());
        for trend in trends {
            let priority = if trend.relevance_score() >= HOT_TREND_RELEVANCE {
                Priority::High
            } else {
                Priority::Medium
            };
            let mut task = Task::new(
                self.deps.ids.task_id(),
                TaskType::GenerateContent,
                self.agent_id,
                priority,
                created_at,
                state_version,
            )
            .with_context("topic", json!(trend.topic()))
            .with_context("trend_id", json!(trend.id()))
            .with_context("relevance_score", json!(trend.relevance_score()))
            .with_context("source", json!(trend.source()));
            if let Some(snippet) = trend.snippet() {
                task = task.with_context("snippet", json!(snippet));
            }

            self.enqueue_task(task.clone()).await?;
            created.push(task);
        }

        info!(created = created.len(), state_version, "resource poll complete");
        Ok(created)
    }

    async fn current_version(&self) -> ChimeraResult<u64> {
        with_deadline(
            "agent state version",
            self.settings.call_timeout,
            self.deps.agent_state.current_version(self.agent_id),
        )
        .await
    }

    async fn push(&self, task: &Task) -> ChimeraResult<()> {
        let record = task.to_wire()?;
        self.deps
            .queue
            .push(task.priority, record)
            .await
            .map_err(ChimeraError::from)?;
        self.dispatched.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// What a completed task hands to its dependents: the fields of its approved
/// `content`, if it produced any.
fn handoff(output: &serde_json::Value) -> TaskContext {
    let Some(content) = output.get("content").and_then(|c| c.as_object()) else {
        return TaskContext::new();
    };
    ["caption", "image_url", "hashtags"]
        .into_iter()
        .filter_map(|key| content.get(key).map(|v| (key.to_string(), v.clone())))
        .collect()
}

/// Each task depends on every task of the nearest earlier stage present.
fn link_stages(tasks: &mut [Task]) {
    let mut by_stage: BTreeMap<u8, Vec<TaskId>> = BTreeMap::new();
    for task in tasks.iter() {
        by_stage.entry(stage(&task.task_type)).or_default().push(task.task_id);
    }

    for task in tasks.iter_mut() {
        let own = stage(&task.task_type);
        if let Some((_, earlier)) = by_stage.range(..own).next_back() {
            task.dependencies.extend(earlier.iter().copied());
        }
    }
}
