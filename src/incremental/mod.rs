//! Incremental recomputation
//!
//! Avoids re-running analytics over matches already processed:
//!
//! - **Checkpoint**: one durable "last processed match" marker per player,
//!   persisted as a single atomically-rewritten JSON document
//! - **Updater**: walks matches newer than the checkpoint in fixed-size
//!   batches, records per-batch failures without aborting, advances the
//!   checkpoint and invalidates the player's cached queries

mod checkpoint;
mod error;
mod updater;

pub use checkpoint::{CheckpointManager, UpdateCheckpoint, ANALYTICS_VERSION};
pub use error::{UpdateError, UpdateResult};
pub use updater::{IncrementalAnalyticsUpdater, IncrementalUpdaterConfig, UpdateReport};
