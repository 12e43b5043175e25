//! Match store layer
//!
//! The rest of the crate treats match history as a keyed collection of
//! immutable records behind the [`MatchStore`] trait. The in-memory
//! implementation here is what the binaries and tests use; a game-API
//! client implements the same trait in deployments that pull live data.

mod error;
mod memory;
mod types;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryMatchStore;
pub use types::{date_bucket, normalize_role, Match, Participant, BLUE_TEAM, RED_TEAM};

use async_trait::async_trait;

/// Keyed collection of immutable match records
///
/// `get_matches_for_player` makes no ordering promise; callers that need
/// "newest first" must sort.
#[async_trait]
pub trait MatchStore: Send + Sync {
    /// Fetch one match by id, `None` if it is no longer present
    async fn get_match(&self, match_id: &str) -> StoreResult<Option<Match>>;

    /// All matches a player appears in, any order
    async fn get_matches_for_player(&self, puuid: &str) -> StoreResult<Vec<Match>>;

    /// Matches created in the last `days` days, newest first
    async fn get_recent_matches(&self, days: i64, limit: Option<usize>) -> StoreResult<Vec<Match>>;
}
