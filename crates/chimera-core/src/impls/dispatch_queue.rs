//! In-memory dispatch queue.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use crate::domain::{CollaboratorError, Priority};
use crate::ports::DispatchQueue;

#[derive(Default)]
struct QueueState {
    /// One FIFO lane per priority, indexed HIGH, MEDIUM, LOW.
    lanes: [VecDeque<String>; 3],
    closed: bool,
    pushed_total: u64,
    /// Errors returned by the next pushes, in order.
    push_failures: VecDeque<CollaboratorError>,
}

impl QueueState {
    fn lane(priority: Priority) -> usize {
        match priority {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }

    fn pop_next(&mut self) -> Option<String> {
        self.lanes.iter_mut().find_map(VecDeque::pop_front)
    }

    fn len(&self) -> usize {
        self.lanes.iter().map(VecDeque::len).sum()
    }
}

/// Priority-ordered queue shared by every worker of a process.
///
/// HIGH drains before MEDIUM before LOW; FIFO within a priority. A pop takes
/// the record out under the lock, so no two consumers see the same record.
#[derive(Clone, Default)]
pub struct InMemoryDispatchQueue {
    state: Arc<Mutex<QueueState>>,
    notify: Arc<Notify>,
}

impl InMemoryDispatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records ever accepted by `push`.
    pub async fn pushed_total(&self) -> u64 {
        self.state.lock().await.pushed_total
    }

    /// Make the next push fail with `err` without accepting its record.
    /// Queued failures are consumed one push at a time.
    pub async fn fail_next_push(&self, err: CollaboratorError) {
        self.state.lock().await.push_failures.push_back(err);
    }

    /// Non-blocking pop, for tests and draining.
    pub async fn try_pop(&self) -> Option<String> {
        self.state.lock().await.pop_next()
    }
}

#[async_trait]
impl DispatchQueue for InMemoryDispatchQueue {
    async fn push(&self, priority: Priority, record: String) -> Result<(), CollaboratorError> {
        {
            let mut state = self.state.lock().await;
            if state.closed {
                return Err(CollaboratorError::Unavailable("dispatch queue closed".into()));
            }
            if let Some(err) = state.push_failures.pop_front() {
                return Err(err);
            }
            state.lanes[QueueState::lane(priority)].push_back(record);
            state.pushed_total += 1;
        }
        self.notify.notify_one();
        Ok(())
    }

    async fn pop(&self) -> Result<Option<String>, CollaboratorError> {
        loop {
            // Register interest before checking, so a push between the check
            // and the await is not missed.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.state.lock().await;
                if let Some(record) = state.pop_next() {
                    let more = state.len() > 0;
                    drop(state);
                    if more {
                        self.notify.notify_one();
                    }
                    return Ok(Some(record));
                }
                if state.closed {
                    return Ok(None);
                }
            }

            notified.await;
        }
    }

    async fn len(&self) -> usize {
        self.state.lock().await.len()
    }

    async fn close(&self) {
        self.state.lock().await.closed = true;
        self.notify.notify_waiters();
    }
}
