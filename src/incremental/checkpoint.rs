//! Update checkpoints
//!
//! One durable marker per player recording the newest match already folded
//! into analytics. All checkpoints live in a single JSON document; every
//! mutation rewrites the whole file atomically (temp file + rename). That
//! is one full-file rewrite per update - a known throughput ceiling,
//! accepted for crash-safety.

use crate::incremental::error::{UpdateError, UpdateResult};
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

/// Analytics schema version stamped into new checkpoints
pub const ANALYTICS_VERSION: &str = "1.0";

/// Per-player marker of the last processed match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateCheckpoint {
    /// `"player_{puuid}"`
    pub checkpoint_id: String,
    pub player_puuid: String,
    pub last_processed_match_id: Option<String>,
    pub last_processed_timestamp: Option<DateTime<Utc>>,
    /// Running total of matches folded into analytics
    pub processed_match_count: u64,
    pub analytics_version: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UpdateCheckpoint {
    /// Fresh checkpoint for a player with nothing processed yet
    pub fn new(puuid: &str) -> Self {
        let now = Utc::now();
        Self {
            checkpoint_id: format!("player_{}", puuid),
            player_puuid: puuid.to_string(),
            last_processed_match_id: None,
            last_processed_timestamp: None,
            processed_match_count: 0,
            analytics_version: ANALYTICS_VERSION.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Advance past a newly processed match
    pub fn advance(&mut self, match_id: &str, game_creation_ms: i64, newly_processed: u64) {
        self.last_processed_match_id = Some(match_id.to_string());
        self.last_processed_timestamp = DateTime::from_timestamp_millis(game_creation_ms);
        self.processed_match_count += newly_processed;
        self.updated_at = Utc::now();
    }

    /// Whether this checkpoint was last updated more than `hours` ago
    pub fn is_older_than_hours(&self, hours: i64) -> bool {
        Utc::now() - self.updated_at > Duration::hours(hours)
    }

    /// Whether a match timestamp is strictly newer than this checkpoint
    pub fn is_match_unprocessed(&self, game_creation_ms: i64) -> bool {
        match self.last_processed_timestamp {
            Some(ts) => game_creation_ms > ts.timestamp_millis(),
            None => true,
        }
    }
}

/// Durable registry of all player checkpoints
///
/// Loads the full document at open; every mutation re-serializes it
/// atomically before returning.
#[derive(Debug)]
pub struct CheckpointManager {
    path: PathBuf,
    checkpoints: Mutex<HashMap<String, UpdateCheckpoint>>,
}

impl CheckpointManager {
    /// Open a manager backed by the given file, loading existing state
    pub fn open(path: impl Into<PathBuf>) -> UpdateResult<Self> {
        let path = path.into();
        let checkpoints = if path.exists() {
            let file = File::open(&path)?;
            let reader = BufReader::new(file);
            let list: Vec<UpdateCheckpoint> = serde_json::from_reader(reader)
                .map_err(|e| UpdateError::Serialization(format!("failed to load checkpoints: {}", e)))?;
            list.into_iter()
                .map(|c| (c.player_puuid.clone(), c))
                .collect()
        } else {
            HashMap::new()
        };

        Ok(Self {
            path,
            checkpoints: Mutex::new(checkpoints),
        })
    }

    /// Checkpoint for a player, if one exists
    pub fn get(&self, puuid: &str) -> Option<UpdateCheckpoint> {
        self.checkpoints.lock().get(puuid).cloned()
    }

    /// Create or advance a player's checkpoint and persist immediately
    pub fn upsert(
        &self,
        puuid: &str,
        match_id: &str,
        game_creation_ms: i64,
        newly_processed: u64,
    ) -> UpdateResult<UpdateCheckpoint> {
        let mut checkpoints = self.checkpoints.lock();
        let checkpoint = checkpoints
            .entry(puuid.to_string())
            .or_insert_with(|| UpdateCheckpoint::new(puuid));
        checkpoint.advance(match_id, game_creation_ms, newly_processed);
        let updated = checkpoint.clone();

        self.persist_locked(&checkpoints)?;
        Ok(updated)
    }

    /// Delete a player's checkpoint, persisting if one was removed
    pub fn delete(&self, puuid: &str) -> UpdateResult<bool> {
        let mut checkpoints = self.checkpoints.lock();
        let removed = checkpoints.remove(puuid).is_some();
        if removed {
            self.persist_locked(&checkpoints)?;
        }
        Ok(removed)
    }

    /// Drop checkpoints not updated within `max_age_days`
    ///
    /// Returns how many were removed. Persists only when something
    /// actually aged out.
    pub fn cleanup_stale(&self, max_age_days: i64) -> UpdateResult<usize> {
        let cutoff = Utc::now() - Duration::days(max_age_days);
        let mut checkpoints = self.checkpoints.lock();
        let before = checkpoints.len();
        checkpoints.retain(|_, c| c.updated_at >= cutoff);
        let removed = before - checkpoints.len();

        if removed > 0 {
            self.persist_locked(&checkpoints)?;
            tracing::info!(removed, max_age_days, "cleaned up stale checkpoints");
        }
        Ok(removed)
    }

    /// Number of tracked players
    pub fn len(&self) -> usize {
        self.checkpoints.lock().len()
    }

    /// Whether no players are tracked
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All checkpoints, for reporting
    pub fn all(&self) -> Vec<UpdateCheckpoint> {
        self.checkpoints.lock().values().cloned().collect()
    }

    /// Atomic full-document rewrite: serialize to a sibling temp file,
    /// then rename over the target.
    fn persist_locked(&self, checkpoints: &HashMap<String, UpdateCheckpoint>) -> UpdateResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut list: Vec<&UpdateCheckpoint> = checkpoints.values().collect();
        list.sort_by(|a, b| a.player_puuid.cmp(&b.player_puuid));

        let tmp_path = temp_path(&self.path);
        {
            let file = File::create(&tmp_path)?;
            let writer = BufWriter::new(file);
            serde_json::to_writer_pretty(writer, &list).map_err(|e| {
                UpdateError::Serialization(format!("failed to persist checkpoints: {}", e))
            })?;
        }
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "checkpoints.json".into());
    name.push(".tmp");
    path.with_file_name(name)
}
