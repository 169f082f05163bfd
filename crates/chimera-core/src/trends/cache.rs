use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::domain::{ChimeraError, ChimeraResult, Trend, with_deadline};
use crate::ports::{Clock, IdGenerator, TrendDiscovery, TrendQuery};

struct CacheEntry {
    fetched_at: DateTime<Utc>,
    trends: Arc<Vec<Trend>>,
}

/// Empty until the first successful fetch for its key.
type Slot = Arc<Mutex<Option<CacheEntry>>>;

/// Memoised trend lookups keyed by `(niche, region, window)`.
///
/// Each key has its own slot, locked across an upstream fetch: concurrent
/// misses on one key produce a single upstream call, and other keys are
/// served meanwhile.
pub struct TrendCache {
    discovery: Arc<dyn TrendDiscovery>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    ttl: chrono::Duration,
    call_timeout: Duration,
    slots: Mutex<HashMap<TrendQuery, Slot>>,
}

impl TrendCache {
    pub fn new(
        discovery: Arc<dyn TrendDiscovery>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        ttl: Duration,
        call_timeout: Duration,
    ) -> Self {
        Self {
            discovery,
            clock,
            ids,
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
            call_timeout,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Trends for `query` with `relevance_score >= min_relevance`, served from
    /// cache while the entry is younger than the TTL.
    #[instrument(skip(self, query), fields(niche = %query.niche, region = %query.region, window = query.window_hours))]
    pub async fn fetch_trends(
        &self,
        query: &TrendQuery,
        min_relevance: f64,
    ) -> ChimeraResult<Vec<Trend>> {
        if !(0.0..=1.0).contains(&min_relevance) {
            return Err(ChimeraError::Validation(format!(
                "min_relevance {min_relevance} outside [0, 1]"
            )));
        }

        let slot = self.slot(query).await;
        let trends = {
            let mut entry = slot.lock().await;
            let now = self.clock.now();
            let fresh = entry
                .as_ref()
                .filter(|cached| now - cached.fetched_at < self.ttl)
                .map(|cached| Arc::clone(&cached.trends));
            match fresh {
                Some(trends) => {
                    debug!(cached = trends.len(), "trend cache hit");
                    trends
                }
                None => {
                    let trends = Arc::new(self.refresh(query, now).await?);
                    info!(count = trends.len(), "trends refreshed");
                    *entry = Some(CacheEntry {
                        fetched_at: now,
                        trends: Arc::clone(&trends),
                    });
                    trends
                }
            }
        };

        Ok(trends
            .iter()
            .filter(|t| t.relevance_score() >= min_relevance)
            .cloned()
            .collect())
    }

    async fn slot(&self, query: &TrendQuery) -> Slot {
        let mut slots = self.slots.lock().await;
        Arc::clone(slots.entry(query.clone()).or_default())
    }

    async fn refresh(&self, query: &TrendQuery, now: DateTime<Utc>) -> ChimeraResult<Vec<Trend>> {
        let raw = with_deadline(
            "trend discovery",
            self.call_timeout,
            self.discovery.discover(query),
        )
        .await?;

        let mut trends = Vec::with_capacity(raw.len());
        for candidate in raw {
            match Trend::new(self.ids.trend_id(), candidate, now) {
                Ok(trend) => trends.push(trend),
                Err(err) => warn!(error = %err, "dropping invalid trend"),
            }
        }
        Ok(trends)
    }

    /// Drop every cached entry. A fetch already in flight completes for its
    /// caller but is not kept.
    pub async fn invalidate(&self) {
        self.slots.lock().await.clear();
    }

    /// Keys holding a fetched entry, fresh or expired.
    pub async fn len(&self) -> usize {
        let slots: Vec<Slot> = self.slots.lock().await.values().cloned().collect();
        let mut filled = 0;
        for slot in slots {
            if slot.lock().await.is_some() {
                filled += 1;
            }
        }
        filled
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
