use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::{ChimeraError, ChimeraResult};
use super::ids::{AgentId, TaskId};

/// What a task asks a worker to do.
///
/// Known variants have one handler each in the worker; anything else arrives
/// as `Other` and is failed explicitly instead of guessed at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskType {
    ResearchTrends,
    GenerateContent,
    ReplyComment,
    ExecuteTransaction,
    PublishContent,
    Other(String),
}

impl TaskType {
    pub fn as_str(&self) -> &str {
        match self {
            TaskType::ResearchTrends => "research_trends",
            TaskType::GenerateContent => "generate_content",
            TaskType::ReplyComment => "reply_comment",
            TaskType::ExecuteTransaction => "execute_transaction",
            TaskType::PublishContent => "publish_content",
            TaskType::Other(name) => name,
        }
    }
}

impl From<String> for TaskType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "research_trends" => TaskType::ResearchTrends,
            "generate_content" => TaskType::GenerateContent,
            "reply_comment" => TaskType::ReplyComment,
            "execute_transaction" => TaskType::ExecuteTransaction,
            "publish_content" => TaskType::PublishContent,
            _ => TaskType::Other(value),
        }
    }
}

impl From<TaskType> for String {
    fn from(value: TaskType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// Free-form key/value payload travelling with a task.
pub type TaskContext = serde_json::Map<String, serde_json::Value>;

/// A planned unit of work.
///
/// Serialises to the dispatch wire shape:
/// `{task_id, task_type, agent_id, priority, context, dependencies, created_at, state_version}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: TaskId,
    pub task_type: TaskType,
    pub agent_id: AgentId,
    pub priority: Priority,
    #[serde(default)]
    pub context: TaskContext,
    #[serde(default)]
    pub dependencies: BTreeSet<TaskId>,
    pub created_at: DateTime<Utc>,
    /// Agent state version observed when the task was planned.
    pub state_version: u64,
}

impl Task {
    pub fn new(
        task_id: TaskId,
        task_type: TaskType,
        agent_id: AgentId,
        priority: Priority,
        created_at: DateTime<Utc>,
        state_version: u64,
    ) -> Self {
        Self {
            task_id,
            task_type,
            agent_id,
            priority,
            context: TaskContext::new(),
            dependencies: BTreeSet::new(),
            created_at,
            state_version,
        }
    }

    pub fn with_context(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }

    pub fn depends_on(mut self, task_id: TaskId) -> Self {
        self.dependencies.insert(task_id);
        self
    }

    /// String field from the context, if present and non-blank.
    pub fn context_str(&self, key: &str) -> Option<&str> {
        self.context
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn to_wire(&self) -> ChimeraResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_wire(record: &str) -> ChimeraResult<Self> {
        serde_json::from_str(record).map_err(|e| ChimeraError::MalformedRecord(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn sample() -> Task {
        Task::new(
            TaskId::generate(),
            TaskType::GenerateContent,
            AgentId::generate(),
            Priority::High,
            Utc::now(),
            42,
        )
        .with_context("topic", json!("Ethiopian fashion week"))
    }

    #[rstest]
    #[case("research_trends", TaskType::ResearchTrends)]
    #[case("generate_content", TaskType::GenerateContent)]
    #[case("reply_comment", TaskType::ReplyComment)]
    #[case("execute_transaction", TaskType::ExecuteTransaction)]
    #[case("publish_content", TaskType::PublishContent)]
    #[case("summon_dragon", TaskType::Other("summon_dragon".into()))]
    fn task_type_from_wire_name(#[case] name: &str, #[case] expected: TaskType) {
        assert_eq!(TaskType::from(name.to_string()), expected);
        assert_eq!(expected.as_str(), name);
    }

    #[test]
    fn wire_shape_has_expected_fields() {
        let task = sample();
        let v: serde_json::Value = serde_json::from_str(&task.to_wire().unwrap()).unwrap();

        for field in [
            "task_id",
            "task_type",
            "agent_id",
            "priority",
            "context",
            "dependencies",
            "created_at",
            "state_version",
        ] {
            assert!(v.get(field).is_some(), "missing {field}");
        }
        assert_eq!(v["task_type"], "generate_content");
        assert_eq!(v["priority"], "high");
        assert_eq!(v["state_version"], 42);
    }

    #[test]
    fn from_wire_rejects_garbage_as_malformed() {
        let err = Task::from_wire("{\"task_id\": 7}").unwrap_err();
        assert!(matches!(err, ChimeraError::MalformedRecord(_)));
    }

    #[test]
    fn context_str_ignores_blank_values() {
        let task = sample().with_context("goal", json!("   "));
        assert_eq!(task.context_str("topic"), Some("Ethiopian fashion week"));
        assert_eq!(task.context_str("goal"), None);
        assert_eq!(task.context_str("missing"), None);
    }
}
