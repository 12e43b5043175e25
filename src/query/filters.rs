//! Analytics query filters
//!
//! `AnalyticsFilters` is the typed query input shared by the index and the
//! optimizer: values within one dimension union, dimensions intersect.

use crate::store::normalize_role;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Date range for queries (half-open interval over epoch milliseconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// Start timestamp (inclusive), in milliseconds
    pub start: i64,
    /// End timestamp (exclusive), in milliseconds
    pub end: i64,
}

impl DateRange {
    /// Create a date range, returning None if invalid
    pub fn try_new(start: i64, end: i64) -> Option<Self> {
        if start < end {
            Some(Self { start, end })
        } else {
            None
        }
    }

    /// Range covering the last N days from now
    pub fn last_days(days: i64) -> Self {
        let end = Utc::now().timestamp_millis();
        let start = end - days * 24 * 3600 * 1000;
        Self { start, end }
    }

    /// Check if a timestamp falls within this range
    pub fn contains(&self, timestamp: i64) -> bool {
        timestamp >= self.start && timestamp < self.end
    }

    /// Number of calendar days this range spans, at least 1
    pub fn days_span(&self) -> i64 {
        ((self.end - self.start) / (24 * 3600 * 1000)).max(1)
    }
}

/// Typed filter set for match queries
///
/// Within one dimension, values union ("p1 or p2"); across dimensions,
/// filters intersect ("p1, on champion 103"). Player, champion and role
/// constrain the *same participant*: `player("p1").champion(103)` means
/// p1 played 103, not "p1 played and someone played 103".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsFilters {
    /// Match must contain a participant with one of these puuids
    #[serde(default)]
    pub player_puuids: Vec<String>,
    /// Champion ids the matching participant must be playing
    #[serde(default)]
    pub champions: Vec<i32>,
    /// Normalized roles the matching participant must occupy
    #[serde(default)]
    pub roles: Vec<String>,
    /// Queue ids the match must be in
    #[serde(default)]
    pub queues: Vec<i32>,
    /// Game-creation window
    #[serde(default)]
    pub date_range: Option<DateRange>,
    /// Keep only matches the matching participant won
    #[serde(default)]
    pub win_only: bool,
    /// Truncate results after sorting newest-first
    #[serde(default)]
    pub limit: Option<usize>,
}

impl AnalyticsFilters {
    /// Create an empty filter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add one player
    pub fn player(mut self, puuid: impl Into<String>) -> Self {
        self.player_puuids.push(puuid.into());
        self
    }

    /// Builder: add several players
    pub fn players<I, S>(mut self, puuids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.player_puuids.extend(puuids.into_iter().map(Into::into));
        self
    }

    /// Builder: add one champion
    pub fn champion(mut self, champion_id: i32) -> Self {
        self.champions.push(champion_id);
        self
    }

    /// Builder: add one role (normalized on entry)
    pub fn role(mut self, role: impl AsRef<str>) -> Self {
        self.roles.push(normalize_role(role.as_ref()));
        self
    }

    /// Builder: add one queue
    pub fn queue(mut self, queue_id: i32) -> Self {
        self.queues.push(queue_id);
        self
    }

    /// Builder: constrain to a date range
    pub fn date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    /// Builder: constrain to the last N days
    pub fn last_days(self, days: i64) -> Self {
        self.date_range(DateRange::last_days(days))
    }

    /// Builder: keep only wins
    pub fn wins_only(mut self) -> Self {
        self.win_only = true;
        self
    }

    /// Builder: cap the result count
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether any index-answerable dimension is set
    pub fn has_index_dimensions(&self) -> bool {
        !self.player_puuids.is_empty()
            || !self.champions.is_empty()
            || !self.roles.is_empty()
            || !self.queues.is_empty()
    }

    /// Whether no filter at all is set
    pub fn is_empty(&self) -> bool {
        !self.has_index_dimensions() && self.date_range.is_none() && !self.win_only
    }

    /// Full validation of one match against every filter dimension
    ///
    /// This is the source of truth the optimizer applies to hydrated
    /// candidates; the index only produces a candidate superset. The
    /// participant-level dimensions (player, champion, role, win) must all
    /// hold for a single participant. `win_only` without a participant
    /// dimension has nothing to anchor to and is ignored.
    pub fn matches(&self, m: &crate::store::Match) -> bool {
        if let Some(range) = &self.date_range {
            if !range.contains(m.game_creation) {
                return false;
            }
        }
        if !self.queues.is_empty() && !self.queues.contains(&m.queue_id) {
            return false;
        }

        let participant_dims = !self.player_puuids.is_empty()
            || !self.champions.is_empty()
            || !self.roles.is_empty();
        if participant_dims {
            let found = m.participants.iter().any(|p| {
                let role = normalize_role(&p.role);
                (self.player_puuids.is_empty() || self.player_puuids.contains(&p.puuid))
                    && (self.champions.is_empty() || self.champions.contains(&p.champion_id))
                    && (self.roles.is_empty()
                        || self.roles.iter().any(|r| normalize_role(r) == role))
                    && (!self.win_only || p.win)
            });
            if !found {
                return false;
            }
        }

        true
    }

    /// Stable cache key for this filter set
    ///
    /// The key keeps puuids in plaintext so pattern invalidation
    /// (`*{puuid}*`) can target a player's cached queries.
    pub fn cache_key(&self, prefix: &str) -> String {
        let mut players = self.player_puuids.clone();
        players.sort();
        let mut champions = self.champions.clone();
        champions.sort_unstable();
        let mut roles = self.roles.clone();
        roles.sort();
        let mut queues = self.queues.clone();
        queues.sort_unstable();

        let mut hasher = DefaultHasher::new();
        champions.hash(&mut hasher);
        roles.hash(&mut hasher);
        queues.hash(&mut hasher);
        if let Some(range) = &self.date_range {
            range.start.hash(&mut hasher);
            range.end.hash(&mut hasher);
        }
        self.win_only.hash(&mut hasher);
        self.limit.hash(&mut hasher);

        format!("{}:{}:{:016x}", prefix, players.join(","), hasher.finish())
    }
}
