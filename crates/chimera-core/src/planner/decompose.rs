//! Turning free-text goal steps into typed, prioritised, staged tasks.

use crate::domain::{Priority, TaskType};

const URGENCY_WORDS: &[&str] = &["urgent", "asap", "immediately", "breaking", "now", "today"];

const RESEARCH_WORDS: &[&str] = &["research", "trend", "analy", "discover", "monitor", "find"];
const REPLY_WORDS: &[&str] = &["reply", "respond", "comment", "engage", "answer"];
const TRANSACTION_WORDS: &[&str] = &["pay", "transaction", "purchase", "transfer", "tip", "buy"];
const PUBLISH_WORDS: &[&str] = &["publish", "post", "schedule", "share", "upload"];

/// Steps used when the decomposer returns nothing usable.
pub const FALLBACK_STEPS: [&str; 3] = [
    "Research current trends for the goal",
    "Generate content for the goal",
    "Publish the generated content",
];

pub fn build_planning_prompt(goal: &str) -> String {
    format!(
        "You are planning work for an autonomous social media agent.\n\
         Goal: {goal}\n\n\
         Break the goal into a short ordered list of atomic steps, one per line.\n\
         Research comes before content generation, and generation before publishing.\n\
         Mark time-critical steps with the word \"urgent\"."
    )
}

fn words(step: &str) -> impl Iterator<Item = String> + '_ {
    step.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

fn mentions(step: &str, vocabulary: &[&str]) -> bool {
    words(step).any(|w| vocabulary.iter().any(|v| w.starts_with(v)))
}

/// Task type by keyword. Unmatched steps are content generation.
pub fn infer_task_type(step: &str) -> TaskType {
    if mentions(step, TRANSACTION_WORDS) {
        TaskType::ExecuteTransaction
    } else if mentions(step, REPLY_WORDS) {
        TaskType::ReplyComment
    } else if mentions(step, PUBLISH_WORDS) {
        TaskType::PublishContent
    } else if mentions(step, RESEARCH_WORDS) {
        TaskType::ResearchTrends
    } else {
        TaskType::GenerateContent
    }
}

pub fn infer_priority(step: &str) -> Priority {
    if words(step).any(|w| URGENCY_WORDS.contains(&w.as_str())) {
        Priority::High
    } else {
        Priority::Medium
    }
}

/// Logical ordering: research, then generation, then publication.
pub fn stage(task_type: &TaskType) -> u8 {
    match task_type {
        TaskType::ResearchTrends => 0,
        TaskType::PublishContent => 2,
        _ => 1,
    }
}

/// Cleaned non-empty steps: surrounding list markers and numbering stripped.
pub fn normalise_steps(steps: Vec<String>) -> Vec<String> {
    steps
        .into_iter()
        .map(|s| {
            s.trim()
                .trim_start_matches(|c: char| {
                    c.is_ascii_digit() || matches!(c, '-' | '*' | '.' | ')' | ' ')
                })
                .trim()
                .to_string()
        })
        .filter(|s| !s.is_empty())
        .collect()
}
