use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{AgentId, CollaboratorError};
use crate::ports::MemorySearch;

/// Per-agent snippet store ranked by shared-word count with the query.
#[derive(Default)]
pub struct InMemoryMemoryStore {
    snippets: RwLock<HashMap<AgentId, Vec<String>>>,
}

fn words(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 2)
        .map(str::to_lowercase)
        .collect()
}

impl InMemoryMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn remember(&self, agent: AgentId, snippet: impl Into<String>) {
        self.snippets
            .write()
            .await
            .entry(agent)
            .or_default()
            .push(snippet.into());
    }
}

#[async_trait]
impl MemorySearch for InMemoryMemoryStore {
    async fn search(
        &self,
        agent: AgentId,
        query: &str,
        limit: usize,
    ) -> Result<Vec<String>, CollaboratorError> {
        let snippets = self.snippets.read().await;
        let Some(snippets) = snippets.get(&agent) else {
            return Ok(Vec::new());
        };

        let query = words(query);
        let mut ranked: Vec<(usize, &String)> = snippets
            .iter()
            .map(|s| (words(s).intersection(&query).count(), s))
            .filter(|(hits, _)| *hits > 0)
            .collect();
        // stable sort keeps insertion order among ties
        ranked.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(ranked
            .into_iter()
            .take(limit)
            .map(|(_, s)| s.clone())
            .collect())
    }
}
