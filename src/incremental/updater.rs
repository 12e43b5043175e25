//! Incremental analytics updater
//!
//! Recomputes analytics only for matches newer than a player's checkpoint.
//! New matches are processed in fixed-size batches; a failing batch is
//! recorded and the remaining batches continue. After a successful pass
//! the checkpoint advances and the player's cached queries are
//! invalidated by pattern.

use crate::engine::{AnalyticsEngine, CacheInvalidator};
use crate::incremental::checkpoint::CheckpointManager;
use crate::incremental::error::UpdateResult;
use crate::store::{Match, MatchStore};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

/// Tuning for the incremental updater
#[derive(Debug, Clone)]
pub struct IncrementalUpdaterConfig {
    /// Matches per processing batch
    pub batch_size: usize,
    /// Lookback window for player enumeration, in days
    pub lookback_days: i64,
}

impl Default for IncrementalUpdaterConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            lookback_days: 365,
        }
    }
}

/// Outcome of one incremental update pass for a player
#[derive(Debug, Clone)]
pub struct UpdateReport {
    pub player_puuid: String,
    /// Matches newer than the checkpoint that were processed
    pub matches_processed: usize,
    pub batches_run: usize,
    /// Whether the whole history was treated as new
    pub full_update: bool,
    /// Cache entries removed after the checkpoint advanced
    pub cache_entries_invalidated: usize,
    /// One entry per failed processing batch
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

impl UpdateReport {
    /// A non-empty error list means degraded success, not total failure:
    /// the surviving batches were processed and the checkpoint advanced.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Checkpoint-driven incremental recomputation
pub struct IncrementalAnalyticsUpdater {
    store: Arc<dyn MatchStore>,
    engine: Arc<dyn AnalyticsEngine>,
    invalidator: Arc<dyn CacheInvalidator>,
    checkpoints: CheckpointManager,
    config: IncrementalUpdaterConfig,
}

impl IncrementalAnalyticsUpdater {
    pub fn new(
        store: Arc<dyn MatchStore>,
        engine: Arc<dyn AnalyticsEngine>,
        invalidator: Arc<dyn CacheInvalidator>,
        checkpoints: CheckpointManager,
    ) -> Self {
        Self::with_config(
            store,
            engine,
            invalidator,
            checkpoints,
            IncrementalUpdaterConfig::default(),
        )
    }

    pub fn with_config(
        store: Arc<dyn MatchStore>,
        engine: Arc<dyn AnalyticsEngine>,
        invalidator: Arc<dyn CacheInvalidator>,
        checkpoints: CheckpointManager,
        config: IncrementalUpdaterConfig,
    ) -> Self {
        Self {
            store,
            engine,
            invalidator,
            checkpoints,
            config,
        }
    }

    /// The checkpoint registry, for inspection and cleanup
    pub fn checkpoints(&self) -> &CheckpointManager {
        &self.checkpoints
    }

    /// Process everything newer than the player's checkpoint
    ///
    /// With no checkpoint, or `force_full_update`, the player's entire
    /// history counts as new. Checkpoint write failures propagate;
    /// per-batch analysis failures land in the report's error list.
    pub async fn update_player(
        &self,
        puuid: &str,
        force_full_update: bool,
    ) -> UpdateResult<UpdateReport> {
        let started = Instant::now();
        let checkpoint = self.checkpoints.get(puuid);

        let mut history = self.store.get_matches_for_player(puuid).await?;
        // Store order is unspecified; the updater needs newest first
        history.sort_by(|a, b| b.game_creation.cmp(&a.game_creation));

        let full_update = force_full_update || checkpoint.is_none();
        let new_matches: Vec<Match> = match (&checkpoint, full_update) {
            (Some(cp), false) => history
                .into_iter()
                .filter(|m| cp.is_match_unprocessed(m.game_creation))
                .collect(),
            _ => history,
        };

        let mut errors = Vec::new();
        let mut batches_run = 0;
        let batch_size = self.config.batch_size.max(1);

        for chunk in new_matches.chunks(batch_size) {
            batches_run += 1;
            if let Err(error) = self.process_chunk(puuid, chunk) {
                tracing::warn!(
                    puuid,
                    batch = batches_run,
                    error = %error,
                    "incremental batch failed; continuing"
                );
                errors.push(format!("batch {}: {:#}", batches_run, error));
            }
        }

        let mut cache_entries_invalidated = 0;
        if let Some(newest) = new_matches.first() {
            self.checkpoints.upsert(
                puuid,
                &newest.match_id,
                newest.game_creation,
                new_matches.len() as u64,
            )?;
            cache_entries_invalidated = self.invalidate_player_caches(puuid);
        }

        let report = UpdateReport {
            player_puuid: puuid.to_string(),
            matches_processed: new_matches.len(),
            batches_run,
            full_update,
            cache_entries_invalidated,
            errors,
            duration_ms: started.elapsed().as_millis() as u64,
        };

        tracing::info!(
            puuid,
            matches = report.matches_processed,
            batches = report.batches_run,
            full = report.full_update,
            errors = report.errors.len(),
            "incremental update finished"
        );
        Ok(report)
    }

    /// Players that need an update pass
    ///
    /// Two-stage check: a player qualifies with no checkpoint at all, or
    /// with a checkpoint older than `max_age_hours` *and* at least one
    /// match newer than it. A merely stale checkpoint with no new matches
    /// does not qualify.
    pub async fn get_players_needing_updates(
        &self,
        max_age_hours: i64,
    ) -> UpdateResult<Vec<String>> {
        let recent = self
            .store
            .get_recent_matches(self.config.lookback_days, None)
            .await?;

        let players: BTreeSet<String> = recent
            .iter()
            .flat_map(|m| m.puuids().map(str::to_string))
            .collect();

        let mut needing = Vec::new();
        for puuid in players {
            match self.checkpoints.get(&puuid) {
                None => needing.push(puuid),
                Some(checkpoint) => {
                    if !checkpoint.is_older_than_hours(max_age_hours) {
                        continue;
                    }
                    let has_unprocessed = self
                        .store
                        .get_matches_for_player(&puuid)
                        .await?
                        .iter()
                        .any(|m| checkpoint.is_match_unprocessed(m.game_creation));
                    if has_unprocessed {
                        needing.push(puuid);
                    }
                }
            }
        }
        Ok(needing)
    }

    /// One processing batch: baseline, touched champion/role pairs, trends
    fn process_chunk(&self, puuid: &str, chunk: &[Match]) -> anyhow::Result<()> {
        self.engine.analyze_player_performance(puuid, chunk)?;

        let touched: BTreeSet<(i32, String)> = chunk
            .iter()
            .filter_map(|m| m.participant_by_puuid(puuid))
            .map(|p| (p.champion_id, p.role.clone()))
            .collect();
        for (champion_id, role) in touched {
            self.engine
                .analyze_champion_performance(puuid, champion_id, &role, chunk)?;
        }

        self.engine.calculate_performance_trends(puuid, chunk)?;
        Ok(())
    }

    fn invalidate_player_caches(&self, puuid: &str) -> usize {
        let patterns = [
            format!("*{}*", puuid),
            format!("player_performance:{}*", puuid),
            format!("champion_performance:{}*", puuid),
            format!("trend_analysis:{}*", puuid),
        ];
        patterns
            .iter()
            .map(|pattern| self.invalidator.invalidate(pattern))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{AnalysisSummary, BasicAnalyticsEngine, NullInvalidator};
    use crate::query::QueryCache;
    use crate::store::{InMemoryMatchStore, Participant, BLUE_TEAM, RED_TEAM};
    use chrono::Utc;
    use tempfile::tempdir;

    fn sample_match(id: &str, creation: i64, puuid: &str, champion: i32) -> Match {
        Match::new(id, creation, 420)
            .participant(Participant::new(puuid, champion, BLUE_TEAM, "MID"))
            .participant(Participant::new("opponent", 999, RED_TEAM, "MID"))
            .winner(BLUE_TEAM)
    }

    fn updater_with(
        store: Arc<InMemoryMatchStore>,
        dir: &tempfile::TempDir,
    ) -> IncrementalAnalyticsUpdater {
        let checkpoints = CheckpointManager::open(dir.path().join("checkpoints.json")).unwrap();
        IncrementalAnalyticsUpdater::with_config(
            store,
            Arc::new(BasicAnalyticsEngine::new()),
            Arc::new(NullInvalidator),
            checkpoints,
            IncrementalUpdaterConfig {
                batch_size: 2,
                lookback_days: 365,
            },
        )
    }

    #[tokio::test]
    async fn test_first_update_is_full() {
        let dir = tempdir().unwrap();
        let store = Arc::new(InMemoryMatchStore::new());
        let now = Utc::now().timestamp_millis();
        for i in 0..3 {
            store
                .insert(sample_match(&format!("m{}", i), now - i * 1000, "p1", 10))
                .unwrap();
        }

        let updater = updater_with(store, &dir);
        let report = updater.update_player("p1", false).await.unwrap();

        assert!(report.full_update);
        assert_eq!(report.matches_processed, 3);
        assert_eq!(report.batches_run, 2); // batch_size 2 -> chunks of 2 + 1
        assert!(report.is_success());

        let checkpoint = updater.checkpoints().get("p1").unwrap();
        assert_eq!(checkpoint.processed_match_count, 3);
        // Newest match wins the checkpoint
        assert_eq!(checkpoint.last_processed_match_id.as_deref(), Some("m0"));
    }

    #[tokio::test]
    async fn test_second_update_processes_only_new() {
        let dir = tempdir().unwrap();
        let store = Arc::new(InMemoryMatchStore::new());
        let now = Utc::now().timestamp_millis();
        store.insert(sample_match("m1", now - 2000, "p1", 10)).unwrap();

        let updater = updater_with(Arc::clone(&store), &dir);
        updater.update_player("p1", false).await.unwrap();

        // New match arrives
        store.insert(sample_match("m2", now - 1000, "p1", 10)).unwrap();
        let report = updater.update_player("p1", false).await.unwrap();

        assert!(!report.full_update);
        assert_eq!(report.matches_processed, 1);

        // Checkpoint monotonicity: counts accumulate, timestamp is newest
        let checkpoint = updater.checkpoints().get("p1").unwrap();
        assert_eq!(checkpoint.processed_match_count, 2);
        assert_eq!(checkpoint.last_processed_match_id.as_deref(), Some("m2"));
        assert_eq!(
            checkpoint.last_processed_timestamp.unwrap().timestamp_millis(),
            now - 1000
        );
    }

    #[tokio::test]
    async fn test_no_new_matches_leaves_checkpoint_alone() {
        let dir = tempdir().unwrap();
        let store = Arc::new(InMemoryMatchStore::new());
        let now = Utc::now().timestamp_millis();
        store.insert(sample_match("m1", now, "p1", 10)).unwrap();

        let updater = updater_with(store, &dir);
        updater.update_player("p1", false).await.unwrap();
        let before = updater.checkpoints().get("p1").unwrap();

        let report = updater.update_player("p1", false).await.unwrap();
        assert_eq!(report.matches_processed, 0);
        assert_eq!(report.batches_run, 0);
        assert_eq!(updater.checkpoints().get("p1").unwrap(), before);
    }

    #[tokio::test]
    async fn test_force_full_update_reprocesses() {
        let dir = tempdir().unwrap();
        let store = Arc::new(InMemoryMatchStore::new());
        let now = Utc::now().timestamp_millis();
        store.insert(sample_match("m1", now, "p1", 10)).unwrap();

        let updater = updater_with(store, &dir);
        updater.update_player("p1", false).await.unwrap();
        let report = updater.update_player("p1", true).await.unwrap();

        assert!(report.full_update);
        assert_eq!(report.matches_processed, 1);
        // Forced reprocessing counts again
        assert_eq!(
            updater.checkpoints().get("p1").unwrap().processed_match_count,
            2
        );
    }

    #[tokio::test]
    async fn test_cache_invalidated_after_update() {
        let dir = tempdir().unwrap();
        let store = Arc::new(InMemoryMatchStore::new());
        let now = Utc::now().timestamp_millis();
        store.insert(sample_match("m1", now, "p1", 10)).unwrap();

        let cache = Arc::new(QueryCache::new());
        cache.insert("player_performance:p1:abc".to_string(), Vec::new());
        cache.insert("player_performance:p2:def".to_string(), Vec::new());

        let checkpoints = CheckpointManager::open(dir.path().join("checkpoints.json")).unwrap();
        let updater = IncrementalAnalyticsUpdater::new(
            store,
            Arc::new(BasicAnalyticsEngine::new()),
            Arc::clone(&cache) as Arc<dyn CacheInvalidator>,
            checkpoints,
        );

        let report = updater.update_player("p1", false).await.unwrap();
        assert!(report.cache_entries_invalidated >= 1);
        assert!(cache.get("player_performance:p1:abc").is_none());
        assert!(cache.get("player_performance:p2:def").is_some());
    }

    /// Engine whose champion analysis always fails
    struct FailingEngine;

    impl AnalyticsEngine for FailingEngine {
        fn analyze_player_performance(
            &self,
            puuid: &str,
            matches: &[Match],
        ) -> anyhow::Result<AnalysisSummary> {
            BasicAnalyticsEngine::new().analyze_player_performance(puuid, matches)
        }

        fn analyze_champion_performance(
            &self,
            _puuid: &str,
            _champion_id: i32,
            _role: &str,
            _matches: &[Match],
        ) -> anyhow::Result<AnalysisSummary> {
            anyhow::bail!("champion analytics offline")
        }

        fn calculate_performance_trends(
            &self,
            puuid: &str,
            matches: &[Match],
        ) -> anyhow::Result<AnalysisSummary> {
            BasicAnalyticsEngine::new().calculate_performance_trends(puuid, matches)
        }
    }

    #[tokio::test]
    async fn test_batch_failures_degrade_but_do_not_abort() {
        let dir = tempdir().unwrap();
        let store = Arc::new(InMemoryMatchStore::new());
        let now = Utc::now().timestamp_millis();
        for i in 0..4 {
            store
                .insert(sample_match(&format!("m{}", i), now - i * 1000, "p1", 10))
                .unwrap();
        }

        let checkpoints = CheckpointManager::open(dir.path().join("checkpoints.json")).unwrap();
        let updater = IncrementalAnalyticsUpdater::with_config(
            store,
            Arc::new(FailingEngine),
            Arc::new(NullInvalidator),
            checkpoints,
            IncrementalUpdaterConfig {
                batch_size: 2,
                lookback_days: 365,
            },
        );

        let report = updater.update_player("p1", false).await.unwrap();
        // Both batches failed, both were attempted, checkpoint still advanced
        assert_eq!(report.batches_run, 2);
        assert_eq!(report.errors.len(), 2);
        assert!(!report.is_success());
        assert_eq!(report.matches_processed, 4);
        assert!(updater.checkpoints().get("p1").is_some());
    }

    #[tokio::test]
    async fn test_players_needing_updates_no_checkpoint() {
        let dir = tempdir().unwrap();
        let store = Arc::new(InMemoryMatchStore::new());
        let now = Utc::now().timestamp_millis();
        store.insert(sample_match("m1", now, "p1", 10)).unwrap();

        let updater = updater_with(store, &dir);
        let needing = updater.get_players_needing_updates(24).await.unwrap();

        // Both the player and the opponent are known and unprocessed
        assert!(needing.contains(&"p1".to_string()));
        assert!(needing.contains(&"opponent".to_string()));
    }

    /// Rewrite the persisted checkpoint file with aged `updated_at` stamps
    fn age_checkpoint_file(dir: &tempfile::TempDir, hours: i64) {
        use crate::incremental::UpdateCheckpoint;
        let path = dir.path().join("checkpoints.json");
        let mut list: Vec<UpdateCheckpoint> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        for checkpoint in &mut list {
            checkpoint.updated_at = Utc::now() - chrono::Duration::hours(hours);
        }
        std::fs::write(&path, serde_json::to_string(&list).unwrap()).unwrap();
    }

    #[tokio::test]
    async fn test_stale_checkpoint_without_new_matches_not_flagged() {
        let dir = tempdir().unwrap();
        let store = Arc::new(InMemoryMatchStore::new());
        let now = Utc::now().timestamp_millis();
        store.insert(sample_match("m1", now, "p1", 10)).unwrap();

        {
            let updater = updater_with(Arc::clone(&store), &dir);
            updater.update_player("p1", false).await.unwrap();
            updater.update_player("opponent", false).await.unwrap();
        }

        // Age the checkpoints past the threshold without adding matches
        age_checkpoint_file(&dir, 25);
        let updater = updater_with(Arc::clone(&store), &dir);

        let needing = updater.get_players_needing_updates(24).await.unwrap();
        assert!(needing.is_empty());

        // A new match flips the answer for its participants
        store.insert(sample_match("m2", now + 1000, "p1", 10)).unwrap();
        let needing = updater.get_players_needing_updates(24).await.unwrap();
        assert!(needing.contains(&"p1".to_string()));
    }

    #[tokio::test]
    async fn test_fresh_checkpoint_not_flagged() {
        let dir = tempdir().unwrap();
        let store = Arc::new(InMemoryMatchStore::new());
        let now = Utc::now().timestamp_millis();
        store.insert(sample_match("m1", now, "p1", 10)).unwrap();

        let updater = updater_with(Arc::clone(&store), &dir);
        updater.update_player("p1", false).await.unwrap();
        updater.update_player("opponent", false).await.unwrap();

        // New match exists, but the checkpoints are fresh
        store.insert(sample_match("m2", now + 1000, "p1", 10)).unwrap();
        let needing = updater.get_players_needing_updates(24).await.unwrap();
        assert!(needing.is_empty());
    }

    #[tokio::test]
    async fn test_engine_sees_touched_champion_role_pairs() {
        let dir = tempdir().unwrap();
        let store = Arc::new(InMemoryMatchStore::new());
        let now = Utc::now().timestamp_millis();
        store.insert(sample_match("m1", now - 1000, "p1", 10)).unwrap();
        store.insert(sample_match("m2", now, "p1", 20)).unwrap();

        let engine = Arc::new(BasicAnalyticsEngine::new());
        let checkpoints = CheckpointManager::open(dir.path().join("checkpoints.json")).unwrap();
        let updater = IncrementalAnalyticsUpdater::new(
            store,
            Arc::clone(&engine) as Arc<dyn AnalyticsEngine>,
            Arc::new(NullInvalidator),
            checkpoints,
        );
        updater.update_player("p1", false).await.unwrap();

        assert!(engine.summary("p1").is_some());
        assert!(engine.summary("p1/10/MID").is_some());
        assert!(engine.summary("p1/20/MID").is_some());
        assert!(engine.summary("p1/trend").is_some());
    }
}
