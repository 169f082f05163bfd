//! Dependency index: which held tasks wait on which unmet dependency.
//!
//! Owned by the planner behind a single lock; nothing else mutates it.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::domain::{Task, TaskContext, TaskId};

struct HeldTask {
    task: Task,
    unmet: BTreeSet<TaskId>,
}

/// What happened to a task offered to the index.
#[derive(Debug)]
pub enum Admission {
    /// Every dependency is complete; push it now.
    Ready(Task),
    /// Waiting on at least one dependency.
    Held,
    /// Already admitted earlier; nothing to do.
    Duplicate,
}

#[derive(Default)]
pub struct DependencyIndex {
    /// Completed task -> context it hands to its dependents.
    completed: HashMap<TaskId, TaskContext>,
    admitted: HashSet<TaskId>,
    held: HashMap<TaskId, HeldTask>,
    /// Unmet dependency -> tasks held on it.
    waiters: HashMap<TaskId, BTreeSet<TaskId>>,
    /// Released by a completion but not pushed yet.
    ready: BTreeMap<TaskId, Task>,
}

impl DependencyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn admit(&mut self, mut task: Task) -> Admission {
        if !self.admitted.insert(task.task_id) {
            return Admission::Duplicate;
        }

        let mut unmet = BTreeSet::new();
        for dep in &task.dependencies {
            match self.completed.get(dep) {
                Some(handoff) => carry(&mut task.context, handoff),
                None => {
                    unmet.insert(*dep);
                }
            }
        }

        if unmet.is_empty() {
            return Admission::Ready(task);
        }

        for dep in &unmet {
            self.waiters.entry(*dep).or_default().insert(task.task_id);
        }
        self.held.insert(task.task_id, HeldTask { task, unmet });
        Admission::Held
    }

    /// Undo `admit` for a task that could not be pushed.
    pub fn forget(&mut self, id: TaskId) {
        self.admitted.remove(&id);
    }

    /// Record `id` as complete. Every task held on it receives `handoff`, and
    /// the ones with nothing left unmet move to the ready set.
    ///
    /// Returns false for a repeated completion, which changes nothing.
    pub fn complete(&mut self, id: TaskId, handoff: TaskContext) -> bool {
        if self.completed.contains_key(&id) {
            return false;
        }

        for task_id in self.waiters.remove(&id).unwrap_or_default() {
            let now_ready = match self.held.get_mut(&task_id) {
                Some(held) => {
                    carry(&mut held.task.context, &handoff);
                    held.unmet.remove(&id);
                    held.unmet.is_empty()
                }
                None => false,
            };
            if now_ready && let Some(held) = self.held.remove(&task_id) {
                self.ready.insert(task_id, held.task);
            }
        }
        self.completed.insert(id, handoff);
        true
    }

    /// Drain the ready set, oldest task first. Whatever the caller fails to
    /// push goes back through `defer`.
    pub fn take_ready(&mut self) -> Vec<Task> {
        std::mem::take(&mut self.ready).into_values().collect()
    }

    /// Return released tasks whose push failed; the next drain offers them again.
    pub fn defer(&mut self, tasks: impl IntoIterator<Item = Task>) {
        for task in tasks {
            self.ready.insert(task.task_id, task);
        }
    }

    pub fn is_completed(&self, id: TaskId) -> bool {
        self.completed.contains_key(&id)
    }

    pub fn is_held(&self, id: TaskId) -> bool {
        self.held.contains_key(&id)
    }

    pub fn held_count(&self) -> usize {
        self.held.len()
    }

    pub fn ready_count(&self) -> usize {
        self.ready.len()
    }
}

/// Keys already set on the dependent win over what a dependency hands over.
fn carry(context: &mut TaskContext, handoff: &TaskContext) {
    for (key, value) in handoff {
        context.entry(key.clone()).or_insert_with(|| value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AgentId, Priority, TaskType};
    use chrono::Utc;
    use serde_json::json;

    fn task(deps: &[TaskId]) -> Task {
        let mut t = Task::new(
            TaskId::generate(),
            TaskType::PublishContent,
            AgentId::generate(),
            Priority::Low,
            Utc::now(),
            0,
        );
        t.dependencies = deps.iter().copied().collect();
        t
    }

    fn caption(text: &str) -> TaskContext {
        let mut handoff = TaskContext::new();
        handoff.insert("caption".into(), json!(text));
        handoff
    }

    #[test]
    fn task_without_dependencies_is_ready() {
        let mut index = DependencyIndex::new();
        assert!(matches!(index.admit(task(&[])), Admission::Ready(_)));
    }

    #[test]
    fn releases_only_after_every_dependency_completes() {
        let mut index = DependencyIndex::new();
        let a = TaskId::generate();
        let b = TaskId::generate();
        let c = task(&[a, b]);
        let c_id = c.task_id;

        assert!(matches!(index.admit(c), Admission::Held));
        assert!(index.complete(a, TaskContext::new()));
        assert!(index.take_ready().is_empty());
        assert!(index.is_held(c_id));

        assert!(index.complete(b, TaskContext::new()));
        let released = index.take_ready();
        assert_eq!(released.len(), 1);
        assert_eq!(released[0].task_id, c_id);
        assert_eq!(index.held_count(), 0);
    }

    #[test]
    fn repeated_completion_releases_nothing_twice() {
        let mut index = DependencyIndex::new();
        let a = TaskId::generate();
        index.admit(task(&[a]));

        assert!(index.complete(a, TaskContext::new()));
        assert_eq!(index.take_ready().len(), 1);
        assert!(!index.complete(a, TaskContext::new()));
        assert!(index.take_ready().is_empty());
    }

    #[test]
    fn deferred_tasks_are_offered_again() {
        let mut index = DependencyIndex::new();
        let a = TaskId::generate();
        let b = task(&[a]);
        let b_id = b.task_id;
        index.admit(b);
        index.complete(a, TaskContext::new());

        let released = index.take_ready();
        index.defer(released);
        assert_eq!(index.ready_count(), 1);
        assert!(!index.complete(a, TaskContext::new()));

        let again = index.take_ready();
        assert_eq!(again.len(), 1);
        assert_eq!(again[0].task_id, b_id);
        assert_eq!(index.ready_count(), 0);
    }

    #[test]
    fn dependency_already_complete_at_admission() {
        let mut index = DependencyIndex::new();
        let a = TaskId::generate();
        index.complete(a, caption("Linen, slowly"));
        match index.admit(task(&[a])) {
            Admission::Ready(t) => assert_eq!(t.context_str("caption"), Some("Linen, slowly")),
            other => panic!("expected ready, got {other:?}"),
        }
    }

    #[test]
    fn handoff_reaches_dependent_without_overwriting_its_context() {
        let mut index = DependencyIndex::new();
        let a = TaskId::generate();
        let mut handoff = caption("Approved words");
        handoff.insert("hashtags".into(), json!(["#linen"]));
        let b = task(&[a]).with_context("hashtags", json!(["#mine"]));
        index.admit(b);

        index.complete(a, handoff);

        let released = index.take_ready();
        assert_eq!(released[0].context_str("caption"), Some("Approved words"));
        assert_eq!(released[0].context["hashtags"], json!(["#mine"]));
    }

    #[test]
    fn duplicate_admission_is_ignored() {
        let mut index = DependencyIndex::new();
        let t = task(&[]);
        assert!(matches!(index.admit(t.clone()), Admission::Ready(_)));
        assert!(matches!(index.admit(t), Admission::Duplicate));
    }
}
