//! # Rift
//!
//! League of Legends match analytics core: indexes match history, answers
//! filtered queries through a cost-ordered planner with result caching,
//! runs analytics batches on a bounded worker pool, and keeps per-player
//! checkpoints so recomputation stays incremental.
//!
//! ## Modules
//!
//! - [`store`]: Match records and the match-store seam
//! - [`index`]: Multi-key set-valued indexes over match ids
//! - [`query`]: Filters, query planning, result cache, optimizer
//! - [`batch`]: Dependency-aware batch execution with cancellation
//! - [`incremental`]: Checkpoints and incremental recomputation
//! - [`engine`]: Analytics-engine and cache-invalidator seams
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rift::index::MatchIndex;
//! use rift::query::{AnalyticsFilters, QueryKind, QueryOptimizer};
//! use rift::store::{InMemoryMatchStore, Match, Participant, BLUE_TEAM};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(InMemoryMatchStore::new());
//!     let index = Arc::new(MatchIndex::new());
//!
//!     let m = Match::new("NA1_1", 1_700_000_000_000, 420)
//!         .participant(Participant::new("p1", 103, BLUE_TEAM, "MID"))
//!         .winner(BLUE_TEAM);
//!     index.add_match(&m)?;
//!     store.insert(m)?;
//!
//!     let optimizer = QueryOptimizer::new(index, store);
//!     let matches = optimizer
//!         .execute(&AnalyticsFilters::new().player("p1"), QueryKind::PlayerPerformance)
//!         .await?;
//!
//!     println!("Found {} matches", matches.len());
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod config;
pub mod engine;
pub mod incremental;
pub mod index;
pub mod query;
pub mod store;

// Re-export top-level types for convenience
pub use store::{InMemoryMatchStore, Match, MatchStore, Participant, StoreError, StoreResult};

pub use index::{IndexError, IndexStats, MatchIndex};

pub use query::{
    AnalyticsFilters, CacheTier, DateRange, QueryCache, QueryCacheConfig, QueryError, QueryKind,
    QueryKindStats, QueryOptimizer, QueryPlan,
};

pub use batch::{
    AnalyticsBatchProcessor, BatchError, BatchOptions, BatchProcessor, BatchProgress, BatchReport,
    BatchTask, CancellationMode, CancellationToken, ChampionRoleRequest, ProcessorMetrics,
    TaskOutcome,
};

pub use incremental::{
    CheckpointManager, IncrementalAnalyticsUpdater, IncrementalUpdaterConfig, UpdateCheckpoint,
    UpdateError, UpdateReport,
};

pub use engine::{
    AnalysisKind, AnalysisSummary, AnalyticsEngine, BasicAnalyticsEngine, CacheInvalidator,
};

pub use config::{Config, ConfigError};
