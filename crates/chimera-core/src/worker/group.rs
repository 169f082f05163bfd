use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error};

use super::TaskWorker;
use crate::domain::{Task, TaskResult};
use crate::ports::DispatchQueue;

/// What a worker hands back after one attempt. `task` is `None` when the
/// dispatch record could not be decoded.
#[derive(Debug, Clone)]
pub struct WorkerReport {
    pub task: Option<Task>,
    pub result: TaskResult,
}

/// Handle over a pool of workers consuming one shared dispatch queue.
/// - `request_shutdown` stops every worker from taking new records
/// - `shutdown_and_join` also waits for in-flight executions to finish
pub struct WorkerGroup {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
}

impl WorkerGroup {
    /// Spawn `n` workers.
    pub fn spawn(
        n: usize,
        queue: Arc<dyn DispatchQueue>,
        worker: Arc<TaskWorker>,
        reports: mpsc::UnboundedSender<WorkerReport>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut joins = Vec::with_capacity(n);
        for worker_id in 0..n {
            let q = Arc::clone(&queue);
            let w = Arc::clone(&worker);
            let tx = reports.clone();
            let mut rx = shutdown_rx.clone();

            let join = tokio::spawn(async move {
                worker_loop(worker_id, q, w, tx, &mut rx).await;
            });
            joins.push(join);
        }

        Self { shutdown_tx, joins }
    }

    /// Stop taking new records. In-flight executions are not cancelled.
    pub fn request_shutdown(&self) {
        // receivers may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        for j in self.joins {
            if let Err(err) = j.await {
                error!(error = %err, "worker task panicked");
            }
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    queue: Arc<dyn DispatchQueue>,
    worker: Arc<TaskWorker>,
    reports: mpsc::UnboundedSender<WorkerReport>,
    shutdown_rx: &mut watch::Receiver<bool>,
) {
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        // pop may wait, so race it against shutdown
        let popped = tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            popped = queue.pop() => popped,
        };

        let record = match popped {
            Ok(Some(record)) => record,
            Ok(None) => {
                debug!(worker_id, "dispatch queue closed");
                break;
            }
            Err(err) => {
                error!(worker_id, error = %err, "dispatch pop failed");
                tokio::task::yield_now().await;
                continue;
            }
        };

        let (task, result) = worker.execute_record(&record).await;
        if reports.send(WorkerReport { task, result }).is_err() {
            debug!(worker_id, "report channel closed");
            break;
        }
    }
}
