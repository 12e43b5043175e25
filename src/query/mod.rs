//! Query planning and execution
//!
//! Answers typed filter queries over the match index and store:
//!
//! - **Filters**: `AnalyticsFilters` builder, the shared query input
//! - **Plan**: selectivity-ordered steps with a cache-tier decision
//! - **Cache**: bounded TTL result cache with pattern invalidation
//! - **Optimizer**: the executor tying index, store and cache together

mod cache;
mod error;
mod filters;
mod optimizer;
mod plan;

pub use cache::{QueryCache, QueryCacheConfig};
pub use error::{QueryError, QueryResult};
pub use filters::{AnalyticsFilters, DateRange};
pub use optimizer::{QueryKindStats, QueryOptimizer};
pub use plan::{CacheTier, FilterDimension, PlanStep, QueryKind, QueryPlan};
