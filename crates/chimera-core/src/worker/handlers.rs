//! One handler per task variant.

use serde_json::json;
use tracing::{debug, info};

use super::prompt::{build_content_prompt, build_reply_prompt};
use super::{TaskWorker, require_str};
use crate::domain::{
    ChimeraError, ChimeraResult, ContentOutput, JudgeContext, Route, Task, TaskResult,
    Transaction, with_deadline,
};
use crate::ports::TrendQuery;

impl TaskWorker {
    pub(super) async fn generate_content(&self, task: &Task) -> ChimeraResult<TaskResult> {
        let topic = require_str(task, "topic")?;
        let memories = self.recall(task, topic).await?;
        let prompt = build_content_prompt(&self.persona, topic, &memories);
        self.generate_and_judge(task, topic, &prompt).await
    }

    pub(super) async fn reply_comment(&self, task: &Task) -> ChimeraResult<TaskResult> {
        let comment = require_str(task, "comment")?;
        let topic = task.context_str("topic").unwrap_or(comment);
        let memories = self.recall(task, comment).await?;
        let prompt = build_reply_prompt(&self.persona, comment, &memories);
        self.generate_and_judge(task, topic, &prompt).await
    }

    pub(super) async fn execute_transaction(&self, task: &Task) -> ChimeraResult<TaskResult> {
        let source = task
            .context
            .get("transaction")
            .cloned()
            .unwrap_or_else(|| serde_json::Value::Object(task.context.clone()));
        let tx: Transaction = serde_json::from_value(source)
            .map_err(|e| ChimeraError::Fatal(format!("malformed transaction: {e}")))?;
        if !tx.amount.is_finite() || tx.amount <= 0.0 {
            return Err(ChimeraError::Fatal(format!(
                "transaction amount must be positive, got {}",
                tx.amount
            )));
        }

        let budget = with_deadline(
            "ledger budget",
            self.settings.call_timeout,
            self.deps.ledger.budget(task.agent_id),
        )
        .await?;

        if !self.budget.validate_transaction(&tx, &budget) {
            let remaining = (budget.daily_limit - budget.spent_today).max(0.0);
            info!(amount = tx.amount, remaining, "transaction denied by budget");
            return Ok(TaskResult::rejected(
                json!({ "transaction": tx, "budget": budget }),
                format!(
                    "transaction of {} {} exceeds remaining daily budget {remaining}",
                    tx.amount, tx.currency
                ),
            ));
        }

        let reference = with_deadline(
            "ledger record",
            self.settings.call_timeout,
            self.deps.ledger.record(task.agent_id, &tx),
        )
        .await?;

        Ok(TaskResult::complete(
            json!({ "transaction": tx, "reference": reference }),
        ))
    }

    pub(super) async fn research_trends(&self, task: &Task) -> ChimeraResult<TaskResult> {
        let defaults = &self.settings.default_trend_query;
        let window_hours = match task.context.get("window_hours") {
            Some(v) => v
                .as_u64()
                .and_then(|w| u32::try_from(w).ok())
                .ok_or_else(|| ChimeraError::Fatal(format!("invalid window_hours: {v}")))?,
            None => defaults.window_hours,
        };
        let query = TrendQuery::new(
            task.context_str("niche").unwrap_or(&defaults.niche),
            task.context_str("region").unwrap_or(&defaults.region),
            window_hours,
        );
        let min_relevance = task
            .context
            .get("min_relevance")
            .and_then(|v| v.as_f64())
            .unwrap_or(self.settings.min_relevance);

        let trends = self.deps.trends.fetch_trends(&query, min_relevance).await?;
        debug!(found = trends.len(), "trends researched");
        Ok(TaskResult::complete(json!({ "trends": trends })))
    }

    pub(super) async fn publish_content(&self, task: &Task) -> ChimeraResult<TaskResult> {
        require_str(task, "caption")?;
        let payload = serde_json::Value::Object(task.context.clone());
        let post_ref = with_deadline(
            "publish",
            self.settings.call_timeout,
            self.deps.publisher.publish(task.agent_id, &payload),
        )
        .await?;
        Ok(TaskResult::complete(json!({ "post_ref": post_ref })))
    }

    async fn recall(&self, task: &Task, query: &str) -> ChimeraResult<Vec<String>> {
        with_deadline(
            "memory search",
            self.settings.call_timeout,
            self.deps
                .memory
                .search(task.agent_id, query, self.settings.memory_limit),
        )
        .await
    }

    /// Generate, then submit to the judge exactly once.
    async fn generate_and_judge(
        &self,
        task: &Task,
        topic: &str,
        prompt: &str,
    ) -> ChimeraResult<TaskResult> {
        let generated = with_deadline(
            "content generation",
            self.settings.call_timeout,
            self.deps.generator.generate(prompt),
        )
        .await?;
        let content = serde_json::to_value(ContentOutput::from(generated))?;

        let current_version = with_deadline(
            "agent state version",
            self.settings.call_timeout,
            self.deps.agent_state.current_version(task.agent_id),
        )
        .await?;

        let context = JudgeContext {
            persona: self.persona.clone(),
            topic: Some(topic.to_string()),
            state_version: task.state_version,
        };
        let judgment = self
            .deps
            .validator
            .validate(&content, &context, Some(current_version))
            .await;

        let route = judgment.route;
        let reason = judgment.reason.clone().unwrap_or_default();
        let output = json!({ "content": content, "judgment": judgment });
        Ok(match route {
            Route::Auto => TaskResult::complete(output),
            Route::Hitl | Route::Reject => TaskResult::rejected(output, reason),
        })
    }
}
