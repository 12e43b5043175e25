//! Match index structures
//!
//! Provides fast set-membership lookups over the match store without
//! re-scanning it:
//!
//! - Five primary indexes: player, champion, role, queue, date-bucket
//! - Four composite indexes for common combined filters
//!
//! # Architecture
//!
//! ```text
//! Query: "matches where p1 played champion 103 in ranked solo"
//!        ↓
//! Composite index (player, champion): exact candidate set, no intersection
//!        ↓
//! Queue index: intersect with queue 420
//!        ↓
//! Hydrate only the surviving match ids from the store
//! ```

mod match_index;

pub use match_index::MatchIndex;

use thiserror::Error;

/// Errors that can occur during index operations
#[derive(Error, Debug)]
pub enum IndexError {
    /// Lock acquisition failed
    #[error("Lock error: {0}")]
    Lock(String),
}

/// Result type alias for index operations
pub type IndexResult<T> = Result<T, IndexError>;

/// Statistics about index contents
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexStats {
    /// Distinct players indexed
    pub players: usize,
    /// Distinct champions indexed
    pub champions: usize,
    /// Distinct roles indexed
    pub roles: usize,
    /// Distinct queues indexed
    pub queues: usize,
    /// Distinct calendar days indexed
    pub days: usize,
    /// Entries across the four composite indexes
    pub composite_keys: usize,
    /// Running count of `add_match` calls
    pub total_matches_indexed: u64,
}
