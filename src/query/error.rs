//! Query error types
//!
//! Defines all error conditions that can occur while planning and
//! executing an optimized match query.

use thiserror::Error;

/// Errors that can occur during query operations
#[derive(Error, Debug)]
pub enum QueryError {
    /// Index lookup or another execution stage failed; single-candidate
    /// hydration misses are skipped, never raised
    #[error("Query optimization failed: {0}")]
    Optimization(String),

    /// Invalid filter combination
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// Invalid date range (start >= end)
    #[error("Invalid date range: start must be less than end")]
    InvalidDateRange,
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;
