//! Domain batch builder
//!
//! Translates analytics requests (N players, champion/role pairings, trend
//! windows) into `BatchTask` lists and delegates to the generic
//! `BatchProcessor`. Priority follows input order - earlier requests rank
//! higher, so natural request order survives concurrency.

use crate::batch::error::BatchError;
use crate::batch::processor::{BatchOptions, BatchProcessor};
use crate::batch::progress::{BatchProgress, BatchReport};
use crate::batch::task::BatchTask;
use crate::engine::{AnalysisSummary, AnalyticsEngine};
use crate::store::{normalize_role, MatchStore};
use chrono::Utc;
use std::sync::Arc;

/// One champion/role pairing to recompute for a player
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChampionRoleRequest {
    pub puuid: String,
    pub champion_id: i32,
    pub role: String,
}

impl ChampionRoleRequest {
    pub fn new(puuid: impl Into<String>, champion_id: i32, role: impl AsRef<str>) -> Self {
        Self {
            puuid: puuid.into(),
            champion_id,
            role: normalize_role(role.as_ref()),
        }
    }
}

/// Batch front-end for the analytics engine
pub struct AnalyticsBatchProcessor {
    processor: Arc<BatchProcessor>,
    engine: Arc<dyn AnalyticsEngine>,
    store: Arc<dyn MatchStore>,
}

impl AnalyticsBatchProcessor {
    pub fn new(
        processor: Arc<BatchProcessor>,
        engine: Arc<dyn AnalyticsEngine>,
        store: Arc<dyn MatchStore>,
    ) -> Self {
        Self {
            processor,
            engine,
            store,
        }
    }

    /// Recompute baselines for many players in one batch
    pub async fn batch_analyze_players(
        &self,
        puuids: &[String],
        options: BatchOptions,
    ) -> Result<BatchReport<AnalysisSummary>, BatchError> {
        let batch_id = batch_id("player_analysis");
        let mut tasks = Vec::with_capacity(puuids.len());

        for (position, puuid) in puuids.iter().enumerate() {
            let matches = self.store.get_matches_for_player(puuid).await?;
            let engine = Arc::clone(&self.engine);
            let subject = puuid.clone();
            tasks.push(
                BatchTask::new(format!("player_analysis_{}", puuid), move || {
                    engine.analyze_player_performance(&subject, &matches)
                })
                .priority(input_priority(puuids.len(), position)),
            );
        }

        self.processor.process_batch(&batch_id, tasks, options).await
    }

    /// Recompute specific champion/role pairings in one batch
    pub async fn batch_analyze_champions(
        &self,
        requests: &[ChampionRoleRequest],
        options: BatchOptions,
    ) -> Result<BatchReport<AnalysisSummary>, BatchError> {
        let batch_id = batch_id("champion_analysis");
        let mut tasks = Vec::with_capacity(requests.len());

        for (position, request) in requests.iter().enumerate() {
            let matches = self.store.get_matches_for_player(&request.puuid).await?;
            let engine = Arc::clone(&self.engine);
            let request = request.clone();
            tasks.push(
                BatchTask::new(
                    format!(
                        "champion_analysis_{}_{}_{}",
                        request.puuid, request.champion_id, request.role
                    ),
                    move || {
                        engine.analyze_champion_performance(
                            &request.puuid,
                            request.champion_id,
                            &request.role,
                            &matches,
                        )
                    },
                )
                .priority(input_priority(requests.len(), position)),
            );
        }

        self.processor.process_batch(&batch_id, tasks, options).await
    }

    /// Recompute performance trends for many players in one batch
    pub async fn batch_analyze_trends(
        &self,
        puuids: &[String],
        options: BatchOptions,
    ) -> Result<BatchReport<AnalysisSummary>, BatchError> {
        let batch_id = batch_id("trend_analysis");
        let mut tasks = Vec::with_capacity(puuids.len());

        for (position, puuid) in puuids.iter().enumerate() {
            let mut matches = self.store.get_matches_for_player(puuid).await?;
            matches.sort_by(|a, b| b.game_creation.cmp(&a.game_creation));
            let engine = Arc::clone(&self.engine);
            let subject = puuid.clone();
            tasks.push(
                BatchTask::new(format!("trend_analysis_{}", puuid), move || {
                    engine.calculate_performance_trends(&subject, &matches)
                })
                .priority(input_priority(puuids.len(), position)),
            );
        }

        self.processor.process_batch(&batch_id, tasks, options).await
    }

    /// Pass-through cancellation by generated batch id
    pub fn cancel(&self, batch_id: &str, reason: Option<&str>) -> bool {
        self.processor.cancel_batch(batch_id, reason)
    }

    /// Pass-through progress query by generated batch id
    pub fn progress(&self, batch_id: &str) -> Option<BatchProgress> {
        self.processor.progress(batch_id)
    }
}

/// Generated id: `"{operation}_{unix_timestamp}"`
fn batch_id(operation: &str) -> String {
    format!("{}_{}", operation, Utc::now().timestamp())
}

/// Earlier input positions get higher priority
fn input_priority(total: usize, position: usize) -> i32 {
    total as i32 - position as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::BasicAnalyticsEngine;
    use crate::store::{InMemoryMatchStore, Match, Participant, BLUE_TEAM, RED_TEAM};

    fn fixture() -> (AnalyticsBatchProcessor, Arc<BasicAnalyticsEngine>) {
        let store = Arc::new(InMemoryMatchStore::new());
        for (id, puuid, champion, win) in [
            ("m1", "p1", 10, true),
            ("m2", "p1", 10, false),
            ("m3", "p2", 20, true),
        ] {
            let winner = if win { BLUE_TEAM } else { RED_TEAM };
            store
                .insert(
                    Match::new(id, 1_700_000_000_000, 420)
                        .participant(Participant::new(puuid, champion, BLUE_TEAM, "MID"))
                        .participant(Participant::new("opponent", 999, RED_TEAM, "MID"))
                        .winner(winner),
                )
                .unwrap();
        }

        let engine = Arc::new(BasicAnalyticsEngine::new());
        let processor = AnalyticsBatchProcessor::new(
            Arc::new(BatchProcessor::new()),
            Arc::clone(&engine) as Arc<dyn AnalyticsEngine>,
            store,
        );
        (processor, engine)
    }

    #[tokio::test]
    async fn test_batch_analyze_players() {
        let (processor, engine) = fixture();
        let puuids = vec!["p1".to_string(), "p2".to_string()];

        let report = processor
            .batch_analyze_players(&puuids, BatchOptions::new())
            .await
            .unwrap();

        assert!(report.batch_id.starts_with("player_analysis_"));
        assert_eq!(report.progress.completed_tasks, 2);
        assert_eq!(report.results["player_analysis_p1"].matches_considered, 2);
        assert_eq!(report.results["player_analysis_p2"].matches_considered, 1);
        assert!(engine.summary("p1").is_some());
    }

    #[tokio::test]
    async fn test_batch_analyze_champions() {
        let (processor, _engine) = fixture();
        let requests = vec![
            ChampionRoleRequest::new("p1", 10, "MIDDLE"),
            ChampionRoleRequest::new("p2", 20, "MID"),
        ];

        let report = processor
            .batch_analyze_champions(&requests, BatchOptions::new())
            .await
            .unwrap();

        assert_eq!(report.progress.completed_tasks, 2);
        let summary = &report.results["champion_analysis_p1_10_MID"];
        assert_eq!(summary.matches_considered, 2);
        assert_eq!(summary.win_rate, 0.5);
    }

    #[tokio::test]
    async fn test_batch_analyze_trends() {
        let (processor, engine) = fixture();
        let puuids = vec!["p1".to_string()];

        let report = processor
            .batch_analyze_trends(&puuids, BatchOptions::new())
            .await
            .unwrap();

        assert!(report.batch_id.starts_with("trend_analysis_"));
        assert_eq!(report.progress.completed_tasks, 1);
        assert!(engine.summary("p1/trend").is_some());
    }

    #[tokio::test]
    async fn test_input_order_becomes_priority() {
        let puuids: Vec<String> = (0..3).map(|i| format!("p{}", i)).collect();
        assert_eq!(input_priority(puuids.len(), 0), 3);
        assert_eq!(input_priority(puuids.len(), 2), 1);
    }

    #[tokio::test]
    async fn test_empty_player_list_is_an_empty_batch() {
        let (processor, _engine) = fixture();
        let result = processor
            .batch_analyze_players(&[], BatchOptions::new())
            .await;
        assert!(matches!(result, Err(BatchError::EmptyBatch)));
    }
}
