use async_trait::async_trait;

use crate::domain::{CollaboratorError, RawTrend};

/// Key of one trend lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrendQuery {
    pub niche: String,
    pub region: String,
    pub window_hours: u32,
}

impl TrendQuery {
    pub fn new(niche: impl Into<String>, region: impl Into<String>, window_hours: u32) -> Self {
        Self {
            niche: niche.into(),
            region: region.into(),
            window_hours,
        }
    }
}

#[async_trait]
pub trait TrendDiscovery: Send + Sync {
    /// Ranked, unvalidated candidates.
    async fn discover(&self, query: &TrendQuery) -> Result<Vec<RawTrend>, CollaboratorError>;
}
