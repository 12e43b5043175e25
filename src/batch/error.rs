//! Batch processing error types
//!
//! Configuration errors (empty batch, bad dependency graph) are detected
//! up front and raised; individual task failures never surface here - they
//! are recorded per-task in the batch report.

use thiserror::Error;

/// Errors that can occur while configuring or running a batch
#[derive(Error, Debug)]
pub enum BatchError {
    /// Submitted batch contains no tasks
    #[error("Batch contains no tasks")]
    EmptyBatch,

    /// A task id appears more than once in the batch
    #[error("Duplicate task id '{0}'")]
    DuplicateTaskId(String),

    /// A task references a dependency id not present in the batch
    #[error("Task '{task_id}' depends on unknown task '{dependency}'")]
    MissingDependency { task_id: String, dependency: String },

    /// The dependency graph contains a cycle
    #[error("Dependency cycle involving task '{0}'")]
    DependencyCycle(String),

    /// Match store failure while assembling domain batches
    #[error("Match store error: {0}")]
    Store(#[from] crate::store::StoreError),

    /// Unexpected failure inside the dispatch machinery
    #[error("Internal batch failure: {0}")]
    Internal(String),
}
