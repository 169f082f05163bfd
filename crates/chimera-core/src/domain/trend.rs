use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::{ChimeraError, ChimeraResult};
use super::ids::TrendId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendSource {
    Twitter,
    GoogleTrends,
    News,
    Reddit,
    Tiktok,
}

/// Unvalidated candidate as reported by a trend-discovery collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTrend {
    pub topic: String,
    pub relevance_score: f64,
    pub volume: i64,
    pub source: TrendSource,
    #[serde(default)]
    pub snippet: Option<String>,
}

/// A discovered topic. Immutable once built; range checks happen in `new`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TrendRecord")]
pub struct Trend {
    id: TrendId,
    topic: String,
    relevance_score: f64,
    volume: u64,
    source: TrendSource,
    snippet: Option<String>,
    discovered_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct TrendRecord {
    id: TrendId,
    topic: String,
    relevance_score: f64,
    volume: i64,
    source: TrendSource,
    #[serde(default)]
    snippet: Option<String>,
    discovered_at: DateTime<Utc>,
}

impl TryFrom<TrendRecord> for Trend {
    type Error = ChimeraError;

    fn try_from(r: TrendRecord) -> Result<Self, Self::Error> {
        let raw = RawTrend {
            topic: r.topic,
            relevance_score: r.relevance_score,
            volume: r.volume,
            source: r.source,
            snippet: r.snippet,
        };
        Trend::new(r.id, raw, r.discovered_at)
    }
}

impl Trend {
    /// Rejects (never clamps) a relevance outside [0, 1], a negative volume
    /// and a blank topic.
    pub fn new(id: TrendId, raw: RawTrend, discovered_at: DateTime<Utc>) -> ChimeraResult<Self> {
        let topic = raw.topic.trim().to_string();
        let invalid = |reason: String| ChimeraError::InvalidTrend {
            topic: topic.clone(),
            reason,
        };

        if topic.is_empty() {
            return Err(invalid("topic is blank".into()));
        }
        if !(0.0..=1.0).contains(&raw.relevance_score) {
            return Err(invalid(format!(
                "relevance_score {} outside [0, 1]",
                raw.relevance_score
            )));
        }
        let volume = u64::try_from(raw.volume)
            .map_err(|_| invalid(format!("volume {} is negative", raw.volume)))?;

        Ok(Self {
            id,
            topic,
            relevance_score: raw.relevance_score,
            volume,
            source: raw.source,
            snippet: raw.snippet,
            discovered_at,
        })
    }

    pub fn id(&self) -> TrendId {
        self.id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn relevance_score(&self) -> f64 {
        self.relevance_score
    }

    pub fn volume(&self) -> u64 {
        self.volume
    }

    pub fn source(&self) -> TrendSource {
        self.source
    }

    pub fn snippet(&self) -> Option<&str> {
        self.snippet.as_deref()
    }

    pub fn discovered_at(&self) -> DateTime<Utc> {
        self.discovered_at
    }
}
