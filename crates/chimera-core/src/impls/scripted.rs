//! Scripted LLM stand-ins: replay queued responses, then fall back to a default.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{CollaboratorError, GeneratedContent};
use crate::ports::{ContentGenerator, GoalDecomposer};

pub struct ScriptedDecomposer {
    steps: Vec<String>,
    calls: AtomicUsize,
}

impl ScriptedDecomposer {
    pub fn new<I, S>(steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            steps: steps.into_iter().map(Into::into).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Decomposer that returns no steps.
    pub fn empty() -> Self {
        Self::new(Vec::<String>::new())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GoalDecomposer for ScriptedDecomposer {
    async fn decompose(&self, _prompt: &str) -> Result<Vec<String>, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.steps.clone())
    }
}

pub struct ScriptedGenerator {
    fallback: GeneratedContent,
    script: Mutex<VecDeque<Result<GeneratedContent, CollaboratorError>>>,
    prompts: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl ScriptedGenerator {
    pub fn new(fallback: GeneratedContent) -> Self {
        Self {
            fallback,
            script: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Responses served, in order, before the fallback.
    pub fn with_script<I>(self, responses: I) -> Self
    where
        I: IntoIterator<Item = Result<GeneratedContent, CollaboratorError>>,
    {
        Self {
            script: Mutex::new(responses.into_iter().collect()),
            ..self
        }
    }

    /// Sleep before answering, to exercise caller deadlines.
    pub fn with_delay(self, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..self
        }
    }

    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }
}

#[async_trait]
impl ContentGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<GeneratedContent, CollaboratorError> {
        self.prompts.lock().await.push(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.script.lock().await.pop_front() {
            Some(response) => response,
            None => Ok(self.fallback.clone()),
        }
    }
}
