//! Swarm runtime: a worker group plus the completion loop that feeds results
//! back into the planner.
//!
//! Workers only execute. Every report goes through one completion loop, which
//! is the single place that marks tasks complete, schedules retries and keeps
//! the counts.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, Notify, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::domain::{ChimeraError, ChimeraResult, Route, Task, TaskId, TaskResult, TaskStatus};
use crate::observability::SwarmCounts;
use crate::planner::TaskDagPlanner;
use crate::ports::DispatchQueue;
use crate::retry::RetryPolicy;
use crate::worker::{TaskWorker, WorkerGroup, WorkerReport};

#[derive(Default)]
struct SwarmState {
    counts: SwarmCounts,
    results: HashMap<TaskId, TaskResult>,
    attempts: HashMap<TaskId, u32>,
    reported: u64,
    /// Task retries and dependent releases waiting out a backoff.
    retries_pending: usize,
}

struct Shared {
    state: Mutex<SwarmState>,
    changed: Notify,
}

struct Running {
    group: WorkerGroup,
    completion: JoinHandle<()>,
    stop_retries: watch::Sender<bool>,
}

pub struct Swarm {
    planner: Arc<TaskDagPlanner>,
    worker: Arc<TaskWorker>,
    queue: Arc<dyn DispatchQueue>,
    retry: RetryPolicy,
    shared: Arc<Shared>,
    running: Option<Running>,
}

impl Swarm {
    /// `queue` must be the same queue the planner pushes to.
    pub fn new(
        planner: Arc<TaskDagPlanner>,
        worker: Arc<TaskWorker>,
        queue: Arc<dyn DispatchQueue>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            planner,
            worker,
            queue,
            retry,
            shared: Arc::new(Shared {
                state: Mutex::new(SwarmState::default()),
                changed: Notify::new(),
            }),
            running: None,
        }
    }

    pub fn planner(&self) -> &Arc<TaskDagPlanner> {
        &self.planner
    }

    /// Spawn `n` workers and the completion loop.
    pub fn start(&mut self, n: usize) -> ChimeraResult<()> {
        if self.running.is_some() {
            return Err(ChimeraError::Validation("swarm already started".into()));
        }
        if n == 0 {
            return Err(ChimeraError::Validation(
                "swarm needs at least one worker".into(),
            ));
        }

        let (reports_tx, reports_rx) = mpsc::unbounded_channel();
        let (stop_retries, stop_rx) = watch::channel(false);
        let group = WorkerGroup::spawn(
            n,
            Arc::clone(&self.queue),
            Arc::clone(&self.worker),
            reports_tx,
        );
        let completion = tokio::spawn(completion_loop(
            reports_rx,
            CompletionCtx {
                planner: Arc::clone(&self.planner),
                retry: self.retry.clone(),
                shared: Arc::clone(&self.shared),
                stop_rx,
            },
        ));

        info!(workers = n, "swarm started");
        self.running = Some(Running {
            group,
            completion,
            stop_retries,
        });
        Ok(())
    }

    pub async fn counts(&self) -> SwarmCounts {
        self.shared.state.lock().await.counts.clone()
    }

    /// Latest result recorded for a task, if it reached a final status.
    pub async fn result(&self, task_id: TaskId) -> Option<TaskResult> {
        self.shared.state.lock().await.results.get(&task_id).cloned()
    }

    /// True once every dispatched record has been reported and no retry or
    /// dependent release is waiting out its backoff. Held tasks whose
    /// dependencies never complete do not keep the swarm busy.
    pub async fn is_settled(&self) -> bool {
        let state = self.shared.state.lock().await;
        state.retries_pending == 0 && state.reported >= self.planner.dispatched_total()
    }

    /// Wait until `is_settled`.
    pub async fn wait_settled(&self) {
        loop {
            let notified = self.shared.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_settled().await {
                return;
            }
            notified.await;
        }
    }

    /// Stop taking new work and cancel pending retries. In-flight executions
    /// finish and are reported before this returns.
    pub async fn shutdown(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };
        let _ = running.stop_retries.send(true);
        running.group.shutdown_and_join().await;
        // every report sender is gone once the workers have exited
        if let Err(err) = running.completion.await {
            error!(error = %err, "completion loop panicked");
        }
        info!("swarm stopped");
    }
}

#[derive(Clone)]
struct CompletionCtx {
    planner: Arc<TaskDagPlanner>,
    retry: RetryPolicy,
    shared: Arc<Shared>,
    stop_rx: watch::Receiver<bool>,
}

async fn completion_loop(mut reports: mpsc::UnboundedReceiver<WorkerReport>, ctx: CompletionCtx) {
    while let Some(report) = reports.recv().await {
        handle_report(&ctx, report).await;

        ctx.shared.state.lock().await.reported += 1;
        ctx.shared.changed.notify_waiters();
    }
}

async fn handle_report(ctx: &CompletionCtx, report: WorkerReport) {
    let WorkerReport { task, result } = report;
    let Some(task) = task else {
        let mut state = ctx.shared.state.lock().await;
        state.counts.dispatched += 1;
        state.counts.failed += 1;
        return;
    };
    let task_id = task.task_id;

    match result.status {
        TaskStatus::Complete => {
            // release dependents before the report is counted
            if let Err(err) = ctx.planner.complete_task(task_id, &result.output).await {
                warn!(task = %task_id, error = %err, "dependents not released");
                schedule_release(ctx, task_id).await;
            }
            record(ctx, task_id, result, |c| c.completed += 1).await;
        }
        TaskStatus::Retry => schedule_retry(ctx, task, result).await,
        TaskStatus::Rejected if awaiting_review(&result) => {
            info!(task = %task_id, "task awaiting human review");
            record(ctx, task_id, result, |c| c.awaiting_review += 1).await;
        }
        TaskStatus::Rejected => {
            record(ctx, task_id, result, |c| c.rejected += 1).await;
        }
        TaskStatus::Failed => {
            record(ctx, task_id, result, |c| c.failed += 1).await;
        }
    }
}

async fn record(
    ctx: &CompletionCtx,
    task_id: TaskId,
    result: TaskResult,
    count: impl FnOnce(&mut SwarmCounts),
) {
    let mut state = ctx.shared.state.lock().await;
    state.counts.dispatched += 1;
    count(&mut state.counts);
    state.attempts.remove(&task_id);
    state.results.insert(task_id, result);
}

async fn schedule_retry(ctx: &CompletionCtx, task: Task, result: TaskResult) {
    let task_id = task.task_id;
    let mut state = ctx.shared.state.lock().await;
    let attempts = {
        let n = state.attempts.entry(task_id).or_insert(0);
        *n += 1;
        *n
    };

    let Some(delay) = ctx.retry.schedule(attempts) else {
        warn!(task = %task_id, attempts, "retry budget spent");
        let reason = result.error.unwrap_or_default();
        let gave_up = TaskResult::failed(format!("gave up after {attempts} attempts: {reason}"));
        state.counts.dispatched += 1;
        state.counts.failed += 1;
        state.attempts.remove(&task_id);
        state.results.insert(task_id, gave_up);
        return;
    };

    state.counts.dispatched += 1;
    state.counts.retried += 1;
    state.retries_pending += 1;
    drop(state);

    warn!(task = %task_id, attempts, ?delay, "retry scheduled");
    let ctx = ctx.clone();
    tokio::spawn(async move {
        let mut stop_rx = ctx.stop_rx.clone();
        let due = tokio::select! {
            _ = tokio::time::sleep(delay) => true,
            _ = stop_rx.changed() => false,
        };

        let requeued = if due {
            ctx.planner.requeue(&task).await
        } else {
            Err(ChimeraError::Transient("swarm stopped before retry".into()))
        };

        let mut state = ctx.shared.state.lock().await;
        if let Err(err) = requeued {
            error!(task = %task_id, error = %err, "retry not dispatched");
            state.counts.failed += 1;
            state.attempts.remove(&task_id);
            state.results.insert(task_id, TaskResult::failed(err.to_string()));
        }
        state.retries_pending -= 1;
        drop(state);
        ctx.shared.changed.notify_waiters();
    });
}

/// Keep pushing released dependents with the retry policy's backoff until
/// one attempt gets them all through. The completion itself already stands.
async fn schedule_release(ctx: &CompletionCtx, task_id: TaskId) {
    ctx.shared.state.lock().await.retries_pending += 1;

    let ctx = ctx.clone();
    tokio::spawn(async move {
        let mut stop_rx = ctx.stop_rx.clone();
        let mut attempts = 1;
        loop {
            let Some(delay) = ctx.retry.schedule(attempts) else {
                error!(task = %task_id, attempts, "gave up releasing dependents");
                break;
            };
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = stop_rx.changed() => {
                    warn!(task = %task_id, "swarm stopped before dependents were released");
                    break;
                }
            }

            attempts += 1;
            match ctx.planner.release_ready().await {
                Ok(released) => {
                    info!(task = %task_id, released = released.len(), attempts, "dependents released on retry");
                    break;
                }
                Err(err) => warn!(task = %task_id, attempts, error = %err, "dependent release failed"),
            }
        }

        ctx.shared.state.lock().await.retries_pending -= 1;
        ctx.shared.changed.notify_waiters();
    });
}

/// A rejection routed to `hitl` waits for a reviewer instead of being final.
fn awaiting_review(result: &TaskResult) -> bool {
    result
        .output
        .get("judgment")
        .and_then(|j| j.get("route"))
        .and_then(|r| serde_json::from_value::<Route>(r.clone()).ok())
        == Some(Route::Hitl)
}
