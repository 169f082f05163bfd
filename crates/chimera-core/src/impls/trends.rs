use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::domain::{CollaboratorError, RawTrend};
use crate::ports::{TrendDiscovery, TrendQuery};

/// Fixed trend list for every query; counts upstream calls.
pub struct StaticTrendDiscovery {
    trends: Vec<RawTrend>,
    calls: AtomicUsize,
}

impl StaticTrendDiscovery {
    pub fn new(trends: Vec<RawTrend>) -> Self {
        Self {
            trends,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TrendDiscovery for StaticTrendDiscovery {
    async fn discover(&self, _query: &TrendQuery) -> Result<Vec<RawTrend>, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.trends.clone())
    }
}
