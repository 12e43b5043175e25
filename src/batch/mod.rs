//! Batch execution
//!
//! Generic dependency-aware batch processing plus the domain wrapper that
//! feeds it analytics work:
//!
//! - **Task**: `BatchTask` callables with priority and dependencies,
//!   executed through a checked-call wrapper reporting tagged outcomes
//! - **Schedule**: up-front graph validation and priority-stable ordering
//! - **Processor**: bounded dispatch with progress, metrics, cancellation
//! - **Analytics**: player/champion/trend batches for the analytics engine

mod analytics;
mod error;
mod processor;
mod progress;
mod schedule;
mod task;

pub use analytics::{AnalyticsBatchProcessor, ChampionRoleRequest};
pub use error::BatchError;
pub use processor::{BatchOptions, BatchProcessor, ProgressCallback};
pub use progress::{BatchProgress, BatchReport, ProcessorMetrics};
pub use task::{BatchTask, CancellationMode, CancellationToken, CheckedCall, TaskFn, TaskOutcome};
