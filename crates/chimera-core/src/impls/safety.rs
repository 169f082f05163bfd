use async_trait::async_trait;

use crate::domain::CollaboratorError;
use crate::ports::SafetyScorer;

const DEFAULT_BLOCKLIST: &[&str] = &["hate", "kill", "scam", "nsfw", "violence", "slur"];

/// Blocklist scorer: 1.0 for clean text, minus 0.35 per blocked term found.
pub struct KeywordSafetyScorer {
    blocked: Vec<String>,
}

impl KeywordSafetyScorer {
    pub fn new<I, S>(blocked: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            blocked: blocked
                .into_iter()
                .map(|s| s.into().to_lowercase())
                .collect(),
        }
    }
}

impl Default for KeywordSafetyScorer {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCKLIST.iter().copied())
    }
}

#[async_trait]
impl SafetyScorer for KeywordSafetyScorer {
    async fn score(&self, text: &str) -> Result<f64, CollaboratorError> {
        let text = text.to_lowercase();
        let hits = self
            .blocked
            .iter()
            .filter(|term| text.contains(term.as_str()))
            .count();
        Ok((1.0 - 0.35 * hits as f64).max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn penalises_blocked_terms() {
        let scorer = KeywordSafetyScorer::default();
        assert_eq!(scorer.score("Golden hour in Addis").await.unwrap(), 1.0);
        assert!(scorer.score("this is a SCAM").await.unwrap() < 0.7);
        assert_eq!(scorer.score("hate kill scam violence").await.unwrap(), 0.0);
    }
}
