//! Dependency graph over a task set.
//!
//! - Forward edges: task -> tasks it depends on
//! - Reverse edges: task -> tasks waiting for it
//! - Invariant: both maps describe the same edge set
//!
//! B-tree maps keep traversal order, and so reported cycles, deterministic.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::domain::{ChimeraError, ChimeraResult, Task, TaskId};

#[derive(Debug, Default)]
pub struct DependencyGraph {
    edges: BTreeMap<TaskId, BTreeSet<TaskId>>,
    reverse_edges: BTreeMap<TaskId, BTreeSet<TaskId>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    OnPath,
    Done,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tasks<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        let mut graph = Self::new();
        for task in tasks {
            graph.add_task(task.task_id);
            for dep in &task.dependencies {
                graph.add_dependency(task.task_id, *dep);
            }
        }
        graph
    }

    pub fn add_task(&mut self, task: TaskId) {
        self.edges.entry(task).or_default();
        self.reverse_edges.entry(task).or_default();
    }

    /// `task` waits for `depends_on`.
    pub fn add_dependency(&mut self, task: TaskId, depends_on: TaskId) {
        self.add_task(task);
        self.add_task(depends_on);
        self.edges.entry(task).or_default().insert(depends_on);
        self.reverse_edges.entry(depends_on).or_default().insert(task);
    }

    pub fn dependencies(&self, task: TaskId) -> impl Iterator<Item = TaskId> + '_ {
        self.edges.get(&task).into_iter().flatten().copied()
    }

    pub fn waiting_tasks(&self, task: TaskId) -> impl Iterator<Item = TaskId> + '_ {
        self.reverse_edges.get(&task).into_iter().flatten().copied()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Kahn's algorithm: dependencies come before their dependents.
    ///
    /// `Err` carries the nodes that never reached in-degree zero, i.e. the
    /// nodes on or behind a cycle.
    pub fn topological_order(&self) -> Result<Vec<TaskId>, BTreeSet<TaskId>> {
        let mut remaining: BTreeMap<TaskId, usize> = self
            .edges
            .iter()
            .map(|(task, deps)| (*task, deps.len()))
            .collect();

        let mut ready: VecDeque<TaskId> = remaining
            .iter()
            .filter(|(_, deg)| **deg == 0)
            .map(|(task, _)| *task)
            .collect();

        let mut order = Vec::with_capacity(remaining.len());
        while let Some(task) = ready.pop_front() {
            remaining.remove(&task);
            order.push(task);
            for waiting in self.waiting_tasks(task) {
                if let Some(deg) = remaining.get_mut(&waiting) {
                    *deg -= 1;
                    if *deg == 0 {
                        ready.push_back(waiting);
                    }
                }
            }
        }

        if remaining.is_empty() {
            Ok(order)
        } else {
            Err(remaining.into_keys().collect())
        }
    }

    /// First cycle found, as a closed path `a -> b -> ... -> a`.
    pub fn detect_cycle(&self) -> Option<Vec<TaskId>> {
        let candidates = match self.topological_order() {
            Ok(_) => return None,
            Err(stuck) => stuck,
        };

        let mut marks = BTreeMap::new();
        let mut path = Vec::new();
        candidates
            .iter()
            .find_map(|start| self.visit(*start, &candidates, &mut marks, &mut path))
    }

    fn visit(
        &self,
        node: TaskId,
        scope: &BTreeSet<TaskId>,
        marks: &mut BTreeMap<TaskId, Mark>,
        path: &mut Vec<TaskId>,
    ) -> Option<Vec<TaskId>> {
        match marks.get(&node) {
            Some(Mark::Done) => return None,
            Some(Mark::OnPath) => {
                let start = path.iter().position(|t| *t == node)?;
                let mut cycle = path[start..].to_vec();
                cycle.push(node);
                return Some(cycle);
            }
            None => {}
        }

        marks.insert(node, Mark::OnPath);
        path.push(node);
        for dep in self.dependencies(node).filter(|d| scope.contains(d)) {
            if let Some(cycle) = self.visit(dep, scope, marks, path) {
                return Some(cycle);
            }
        }
        path.pop();
        marks.insert(node, Mark::Done);
        None
    }
}

/// Validate that `tasks` form a DAG and return them in dependency order.
///
/// Dependencies on ids outside the set are treated as already satisfied.
pub fn validate_dag(tasks: &[Task]) -> ChimeraResult<Vec<TaskId>> {
    let graph = DependencyGraph::from_tasks(tasks);
    match graph.detect_cycle() {
        Some(cycle) => Err(ChimeraError::DependencyCycle(cycle)),
        None => graph
            .topological_order()
            .map_err(|stuck| ChimeraError::DependencyCycle(stuck.into_iter().collect())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AgentId, Priority, TaskType};
    use chrono::Utc;

    fn ids(n: usize) -> Vec<TaskId> {
        let mut ids: Vec<TaskId> = (0..n).map(|_| TaskId::generate()).collect();
        ids.sort();
        ids
    }

    fn task(id: TaskId, deps: &[TaskId]) -> Task {
        let mut t = Task::new(
            id,
            TaskType::GenerateContent,
            AgentId::generate(),
            Priority::Medium,
            Utc::now(),
            1,
        );
        t.dependencies = deps.iter().copied().collect();
        t
    }

    #[test]
    fn add_dependency_keeps_both_directions() {
        let [a, b] = ids(2)[..] else { unreachable!() };
        let mut graph = DependencyGraph::new();
        graph.add_dependency(b, a);

        assert_eq!(graph.dependencies(b).collect::<Vec<_>>(), vec![a]);
        assert_eq!(graph.waiting_tasks(a).collect::<Vec<_>>(), vec![b]);
        assert_eq!(graph.dependencies(a).count(), 0);
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn mutual_dependency_is_a_cycle() {
        let [a, b] = ids(2)[..] else { unreachable!() };
        let err = validate_dag(&[task(a, &[b]), task(b, &[a])]).unwrap_err();

        match err {
            ChimeraError::DependencyCycle(path) => {
                assert_eq!(path.len(), 3);
                assert_eq!(path.first(), path.last());
                assert!(path.contains(&a) && path.contains(&b));
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let [a] = ids(1)[..] else { unreachable!() };
        let mut graph = DependencyGraph::new();
        graph.add_dependency(a, a);
        assert_eq!(graph.detect_cycle(), Some(vec![a, a]));
    }

    #[test]
    fn longer_cycle_reports_only_cycle_members() {
        // a <- b <- c <- d <- b
        let [a, b, c, d] = ids(4)[..] else { unreachable!() };
        let tasks = [task(a, &[]), task(b, &[a, d]), task(c, &[b]), task(d, &[c])];

        let Err(ChimeraError::DependencyCycle(path)) = validate_dag(&tasks) else {
            panic!("expected cycle");
        };
        assert!(!path.contains(&a));
        assert_eq!(path.len(), 4);
    }

    #[test]
    fn diamond_is_acyclic_and_ordered() {
        // a <- b, a <- c, {b, c} <- d
        let [a, b, c, d] = ids(4)[..] else { unreachable!() };
        let tasks = [task(d, &[b, c]), task(c, &[a]), task(b, &[a]), task(a, &[])];

        let order = validate_dag(&tasks).unwrap();
        let pos = |id| order.iter().position(|t| *t == id).unwrap();

        assert_eq!(order.len(), 4);
        assert!(pos(a) < pos(b) && pos(a) < pos(c));
        assert!(pos(b) < pos(d) && pos(c) < pos(d));
    }

    #[test]
    fn external_dependencies_are_allowed() {
        let [outside, a] = ids(2)[..] else { unreachable!() };
        assert!(validate_dag(&[task(a, &[outside])]).is_ok());
    }

    #[test]
    fn empty_set_is_valid() {
        assert!(validate_dag(&[]).unwrap().is_empty());
    }
}
