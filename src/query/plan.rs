//! Query planning
//!
//! Builds a cost-ordered execution plan from filter selectivity estimates.
//! The plan is transient: created, executed and discarded within one
//! optimizer call, never persisted.

use crate::query::filters::AnalyticsFilters;
use serde::{Deserialize, Serialize};

/// What kind of analytics question a query answers
///
/// Used to key the per-kind execution statistics and namespace cache keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    PlayerPerformance,
    ChampionPerformance,
    TeamSynergy,
    TrendAnalysis,
    MatchLookup,
}

impl QueryKind {
    /// All kinds, for iteration in reports
    pub fn all() -> &'static [QueryKind] {
        &[
            QueryKind::PlayerPerformance,
            QueryKind::ChampionPerformance,
            QueryKind::TeamSynergy,
            QueryKind::TrendAnalysis,
            QueryKind::MatchLookup,
        ]
    }
}

impl std::fmt::Display for QueryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryKind::PlayerPerformance => write!(f, "player_performance"),
            QueryKind::ChampionPerformance => write!(f, "champion_performance"),
            QueryKind::TeamSynergy => write!(f, "team_synergy"),
            QueryKind::TrendAnalysis => write!(f, "trend_analysis"),
            QueryKind::MatchLookup => write!(f, "match_lookup"),
        }
    }
}

/// Which dimension a plan step evaluates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterDimension {
    Player,
    Champion,
    Role,
    Queue,
    Date,
}

impl FilterDimension {
    /// Relative cost of evaluating one value in this dimension
    fn cost_weight(self) -> f64 {
        match self {
            FilterDimension::Player => 1.0,
            FilterDimension::Champion => 2.0,
            FilterDimension::Role => 2.0,
            FilterDimension::Queue => 1.5,
            FilterDimension::Date => 3.0,
        }
    }
}

/// Where the optimizer should cache the result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheTier {
    /// Too cheap to be worth caching
    None,
    /// In-memory TTL cache
    Memory,
    /// Flagged for a persistent tier; backed by the same in-memory cache
    Persistent,
}

/// One ordered execution step of a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    pub dimension: FilterDimension,
    /// Estimated fraction of candidates surviving this step (lower = more
    /// selective, evaluated earlier)
    pub selectivity: f64,
    /// Estimated scalar cost of evaluating this step
    pub cost: f64,
}

/// Cost-ordered plan for one query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPlan {
    pub kind: QueryKind,
    /// Steps sorted ascending by selectivity
    pub steps: Vec<PlanStep>,
    /// Sum of step costs
    pub estimated_cost: f64,
    pub cache_tier: CacheTier,
    /// Advisory flag: a plan this expensive would benefit from fan-out.
    /// The synchronous executor does not itself parallelize.
    pub parallel_execution: bool,
}

impl QueryPlan {
    /// Build a plan from active filter dimensions
    ///
    /// Selectivity per dimension is `1 / value_count` (date ranges use
    /// `1 / days_span`); the cost of a step is its dimension weight scaled
    /// by the number of values it must look up.
    pub fn build(filters: &AnalyticsFilters, kind: QueryKind) -> Self {
        let mut steps = Vec::new();

        if !filters.player_puuids.is_empty() {
            steps.push(step(FilterDimension::Player, filters.player_puuids.len()));
        }
        if !filters.champions.is_empty() {
            steps.push(step(FilterDimension::Champion, filters.champions.len()));
        }
        if !filters.roles.is_empty() {
            steps.push(step(FilterDimension::Role, filters.roles.len()));
        }
        if !filters.queues.is_empty() {
            steps.push(step(FilterDimension::Queue, filters.queues.len()));
        }
        if let Some(range) = &filters.date_range {
            steps.push(step(FilterDimension::Date, range.days_span() as usize));
        }

        steps.sort_by(|a, b| {
            a.selectivity
                .partial_cmp(&b.selectivity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let estimated_cost: f64 = steps.iter().map(|s| s.cost).sum();

        let cache_tier = if estimated_cost > 10.0 {
            CacheTier::Persistent
        } else if estimated_cost > 5.0 {
            CacheTier::Memory
        } else {
            CacheTier::None
        };

        Self {
            kind,
            steps,
            estimated_cost,
            cache_tier,
            parallel_execution: estimated_cost > 20.0,
        }
    }

    /// Whether the executed result should be cached at all
    pub fn should_cache(&self) -> bool {
        self.cache_tier != CacheTier::None
    }
}

fn step(dimension: FilterDimension, value_count: usize) -> PlanStep {
    let count = value_count.max(1);
    PlanStep {
        dimension,
        selectivity: 1.0 / count as f64,
        cost: dimension.cost_weight() * count as f64,
    }
}
