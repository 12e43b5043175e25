//! Query optimizer
//!
//! Turns an `AnalyticsFilters` into hydrated matches, minimizing redundant
//! work through selectivity-aware planning and result caching.
//!
//! # Execution Pipeline
//!
//! ```text
//! Filters → Cache lookup → Plan → Index lookup → Hydrate → Re-validate
//!         → Sort newest-first → Truncate → Cache write → Result
//! ```
//!
//! The index only answers the indexable dimensions; every candidate is
//! re-validated against the full filter set (date range and win-only
//! included) before it reaches the caller.

use crate::index::MatchIndex;
use crate::query::cache::{QueryCache, QueryCacheConfig};
use crate::query::error::{QueryError, QueryResult};
use crate::query::filters::AnalyticsFilters;
use crate::query::plan::{QueryKind, QueryPlan};
use crate::store::{Match, MatchStore};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Running execution statistics for one query kind
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryKindStats {
    /// Total calls, hit or miss
    pub executions: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// Matches returned across all calls
    pub total_results: u64,
    /// Running mean latency in milliseconds
    pub avg_latency_ms: f64,
    pub last_executed: Option<DateTime<Utc>>,
}

/// Selectivity-aware query executor over the match index and store
pub struct QueryOptimizer {
    index: Arc<MatchIndex>,
    store: Arc<dyn MatchStore>,
    cache: Arc<QueryCache>,
    stats: Mutex<HashMap<QueryKind, QueryKindStats>>,
}

impl QueryOptimizer {
    /// Create an optimizer with default cache settings
    pub fn new(index: Arc<MatchIndex>, store: Arc<dyn MatchStore>) -> Self {
        Self::with_cache_config(index, store, QueryCacheConfig::default())
    }

    /// Create an optimizer with custom cache settings
    pub fn with_cache_config(
        index: Arc<MatchIndex>,
        store: Arc<dyn MatchStore>,
        cache_config: QueryCacheConfig,
    ) -> Self {
        Self {
            index,
            store,
            cache: Arc::new(QueryCache::with_config(cache_config)),
            stats: Mutex::new(HashMap::new()),
        }
    }

    /// Build the cost-ordered plan for a filter set without executing it
    pub fn optimize(&self, filters: &AnalyticsFilters, kind: QueryKind) -> QueryPlan {
        QueryPlan::build(filters, kind)
    }

    /// Execute a filtered query, consulting and feeding the result cache
    ///
    /// A store failure for a single candidate drops that candidate
    /// silently; an index failure aborts the call.
    pub async fn execute(
        &self,
        filters: &AnalyticsFilters,
        kind: QueryKind,
    ) -> QueryResult<Vec<Match>> {
        let started = Instant::now();
        let key = filters.cache_key(&kind.to_string());

        if let Some(hit) = self.cache.get(&key) {
            let count = hit.len();
            self.record(kind, started.elapsed(), true, count);
            tracing::debug!(%kind, results = count, "query served from cache");
            return Ok(hit);
        }

        let plan = QueryPlan::build(filters, kind);

        let candidates = self
            .index
            .find_matches(filters)
            .map_err(|e| QueryError::Optimization(format!("index lookup failed: {}", e)))?;

        let mut results = Vec::with_capacity(candidates.len());
        for match_id in candidates {
            match self.store.get_match(&match_id).await {
                Ok(Some(m)) => {
                    if filters.matches(&m) {
                        results.push(m);
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!(%match_id, error = %e, "skipping candidate that failed to hydrate");
                }
            }
        }

        results.sort_by(|a, b| b.game_creation.cmp(&a.game_creation));
        if let Some(limit) = filters.limit {
            results.truncate(limit);
        }

        if plan.should_cache() {
            self.cache.insert(key, results.clone());
        }

        self.record(kind, started.elapsed(), false, results.len());
        tracing::debug!(
            %kind,
            results = results.len(),
            cost = plan.estimated_cost,
            tier = ?plan.cache_tier,
            "query executed"
        );
        Ok(results)
    }

    /// Per-kind execution statistics
    pub fn statistics(&self) -> HashMap<QueryKind, QueryKindStats> {
        self.stats.lock().clone()
    }

    /// The result cache, shareable as a `CacheInvalidator`
    pub fn cache(&self) -> Arc<QueryCache> {
        Arc::clone(&self.cache)
    }

    fn record(&self, kind: QueryKind, latency: Duration, cache_hit: bool, results: usize) {
        let mut stats = self.stats.lock();
        let entry = stats.entry(kind).or_default();
        entry.executions += 1;
        if cache_hit {
            entry.cache_hits += 1;
        } else {
            entry.cache_misses += 1;
        }
        entry.total_results += results as u64;

        let latency_ms = latency.as_secs_f64() * 1000.0;
        entry.avg_latency_ms += (latency_ms - entry.avg_latency_ms) / entry.executions as f64;
        entry.last_executed = Some(Utc::now());
    }
}
