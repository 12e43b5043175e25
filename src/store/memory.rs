//! In-memory match store with JSON persistence
//!
//! Backs the demo binary, the CLI and the test suite. Production
//! deployments put the game-API client behind the same `MatchStore` trait.

use crate::store::error::{StoreError, StoreResult};
use crate::store::types::Match;
use crate::store::MatchStore;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::RwLock;

/// Keyed in-memory collection of immutable match records
#[derive(Debug, Default)]
pub struct InMemoryMatchStore {
    matches: RwLock<HashMap<String, Match>>,
}

impl InMemoryMatchStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store from a JSON array of matches
    pub fn load_json(path: &Path) -> StoreResult<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let matches: Vec<Match> = serde_json::from_reader(reader)
            .map_err(|e| StoreError::Serialization(format!("failed to load matches: {}", e)))?;

        let store = Self::new();
        store.insert_batch(matches)?;
        Ok(store)
    }

    /// Save all matches to a JSON array
    pub fn save_json(&self, path: &Path) -> StoreResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let matches = self.read()?;
        let all: Vec<&Match> = matches.values().collect();

        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, &all)
            .map_err(|e| StoreError::Serialization(format!("failed to save matches: {}", e)))?;
        Ok(())
    }

    /// Insert one match (replaces any existing record with the same id)
    pub fn insert(&self, m: Match) -> StoreResult<()> {
        let mut matches = self.write()?;
        matches.insert(m.match_id.clone(), m);
        Ok(())
    }

    /// Insert many matches
    pub fn insert_batch(&self, batch: Vec<Match>) -> StoreResult<()> {
        let mut matches = self.write()?;
        for m in batch {
            matches.insert(m.match_id.clone(), m);
        }
        Ok(())
    }

    /// Remove a match by id, returning it if present
    pub fn remove(&self, match_id: &str) -> StoreResult<Option<Match>> {
        let mut matches = self.write()?;
        Ok(matches.remove(match_id))
    }

    /// Number of stored matches
    pub fn len(&self) -> usize {
        self.matches.read().map(|m| m.len()).unwrap_or(0)
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All stored matches, unordered
    pub fn all_matches(&self) -> StoreResult<Vec<Match>> {
        let matches = self.read()?;
        Ok(matches.values().cloned().collect())
    }

    fn read(&self) -> StoreResult<std::sync::RwLockReadGuard<'_, HashMap<String, Match>>> {
        self.matches
            .read()
            .map_err(|e| StoreError::Lock(e.to_string()))
    }

    fn write(&self) -> StoreResult<std::sync::RwLockWriteGuard<'_, HashMap<String, Match>>> {
        self.matches
            .write()
            .map_err(|e| StoreError::Lock(e.to_string()))
    }
}

#[async_trait]
impl MatchStore for InMemoryMatchStore {
    async fn get_match(&self, match_id: &str) -> StoreResult<Option<Match>> {
        let matches = self.read()?;
        Ok(matches.get(match_id).cloned())
    }

    async fn get_matches_for_player(&self, puuid: &str) -> StoreResult<Vec<Match>> {
        let matches = self.read()?;
        Ok(matches
            .values()
            .filter(|m| m.participants.iter().any(|p| p.puuid == puuid))
            .cloned()
            .collect())
    }

    async fn get_recent_matches(&self, days: i64, limit: Option<usize>) -> StoreResult<Vec<Match>> {
        let cutoff = Utc::now().timestamp_millis() - days * 24 * 3600 * 1000;

        let mut recent: Vec<Match> = {
            let matches = self.read()?;
            matches
                .values()
                .filter(|m| m.game_creation >= cutoff)
                .cloned()
                .collect()
        };

        recent.sort_by(|a, b| b.game_creation.cmp(&a.game_creation));
        if let Some(limit) = limit {
            recent.truncate(limit);
        }
        Ok(recent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::types::{Participant, BLUE_TEAM, RED_TEAM};
    use tempfile::tempdir;

    fn sample_match(id: &str, creation: i64, puuid: &str) -> Match {
        Match::new(id, creation, 420)
            .participant(Participant::new(puuid, 10, BLUE_TEAM, "TOP"))
            .participant(Participant::new("other", 20, RED_TEAM, "TOP"))
            .winner(BLUE_TEAM)
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = InMemoryMatchStore::new();
        store
            .insert(sample_match("NA1_1", 1_700_000_000_000, "p1"))
            .unwrap();

        let found = store.get_match("NA1_1").await.unwrap();
        assert!(found.is_some());
        assert_eq!(found.unwrap().match_id, "NA1_1");

        assert!(store.get_match("NA1_404").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_matches_for_player() {
        let store = InMemoryMatchStore::new();
        store
            .insert(sample_match("NA1_1", 1_700_000_000_000, "p1"))
            .unwrap();
        store
            .insert(sample_match("NA1_2", 1_700_000_100_000, "p1"))
            .unwrap();
        store
            .insert(sample_match("NA1_3", 1_700_000_200_000, "p2"))
            .unwrap();

        let p1_matches = store.get_matches_for_player("p1").await.unwrap();
        assert_eq!(p1_matches.len(), 2);

        // "other" appears on the enemy team of every match
        let other_matches = store.get_matches_for_player("other").await.unwrap();
        assert_eq!(other_matches.len(), 3);
    }

    #[tokio::test]
    async fn test_recent_matches_ordering_and_limit() {
        let store = InMemoryMatchStore::new();
        let now = Utc::now().timestamp_millis();
        for i in 0..5 {
            store
                .insert(sample_match(&format!("NA1_{}", i), now - i * 1000, "p1"))
                .unwrap();
        }

        let recent = store.get_recent_matches(1, Some(3)).await.unwrap();
        assert_eq!(recent.len(), 3);
        // Newest first
        assert_eq!(recent[0].match_id, "NA1_0");
        assert!(recent[0].game_creation >= recent[1].game_creation);
    }

    #[tokio::test]
    async fn test_recent_matches_cutoff() {
        let store = InMemoryMatchStore::new();
        let now = Utc::now().timestamp_millis();
        store.insert(sample_match("new", now, "p1")).unwrap();
        store
            .insert(sample_match("old", now - 10 * 24 * 3600 * 1000, "p1"))
            .unwrap();

        let recent = store.get_recent_matches(7, None).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].match_id, "new");
    }

    #[test]
    fn test_json_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("matches.json");

        {
            let store = InMemoryMatchStore::new();
            store
                .insert(sample_match("NA1_1", 1_700_000_000_000, "p1"))
                .unwrap();
            store
                .insert(sample_match("NA1_2", 1_700_000_100_000, "p2"))
                .unwrap();
            store.save_json(&path).unwrap();
        }

        let reloaded = InMemoryMatchStore::load_json(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
    }
}
