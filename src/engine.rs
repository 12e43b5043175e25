//! Analytics collaborator seams
//!
//! The batch and incremental layers treat the actual analytics math as
//! opaque: anything implementing [`AnalyticsEngine`] can be driven by them.
//! [`BasicAnalyticsEngine`] is a small reference implementation used by the
//! binaries and tests; richer engines (synergy detection, recommendation
//! scoring) plug in behind the same trait.

use crate::store::{Match, Participant};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What a summary describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    /// Rolling per-player baseline
    PlayerBaseline,
    /// One (champion, role) pairing for a player
    ChampionRole,
    /// Performance direction over the analyzed window
    Trend,
}

/// Result of one analysis pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub kind: AnalysisKind,
    /// Who or what was analyzed (puuid, or "puuid/champion/role")
    pub subject: String,
    /// How many matches fed the computation
    pub matches_considered: usize,
    /// Win fraction over the considered matches
    pub win_rate: f64,
    /// Mean KDA ratio over the considered matches
    pub avg_kda: f64,
    pub generated_at: DateTime<Utc>,
}

/// Opaque analytics computations driven by the batch and incremental layers
pub trait AnalyticsEngine: Send + Sync {
    /// Update a player's rolling baseline from a window of matches
    fn analyze_player_performance(
        &self,
        puuid: &str,
        matches: &[Match],
    ) -> anyhow::Result<AnalysisSummary>;

    /// Recompute one (champion, role) pairing for a player
    fn analyze_champion_performance(
        &self,
        puuid: &str,
        champion_id: i32,
        role: &str,
        matches: &[Match],
    ) -> anyhow::Result<AnalysisSummary>;

    /// Recompute trend analysis for a player
    fn calculate_performance_trends(
        &self,
        puuid: &str,
        matches: &[Match],
    ) -> anyhow::Result<AnalysisSummary>;
}

/// Invalidate cached query results by key pattern
///
/// Implemented by the query layer's result cache; the incremental updater
/// calls it after advancing a player's checkpoint.
pub trait CacheInvalidator: Send + Sync {
    /// Remove matching entries, returning how many were removed
    fn invalidate(&self, pattern: &str) -> usize;
}

/// No-op invalidator for deployments without a query cache
#[derive(Debug, Default)]
pub struct NullInvalidator;

impl CacheInvalidator for NullInvalidator {
    fn invalidate(&self, _pattern: &str) -> usize {
        0
    }
}

/// Reference engine computing win rate and mean KDA
///
/// Keeps the latest summary per subject so callers can read back what the
/// batch/incremental layers produced.
#[derive(Debug, Default)]
pub struct BasicAnalyticsEngine {
    summaries: Mutex<HashMap<String, AnalysisSummary>>,
}

impl BasicAnalyticsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest summary for a subject, if one was computed
    pub fn summary(&self, subject: &str) -> Option<AnalysisSummary> {
        self.summaries.lock().get(subject).cloned()
    }

    /// Number of distinct subjects analyzed so far
    pub fn subjects_analyzed(&self) -> usize {
        self.summaries.lock().len()
    }

    fn record(&self, summary: AnalysisSummary) -> AnalysisSummary {
        self.summaries
            .lock()
            .insert(summary.subject.clone(), summary.clone());
        summary
    }

    fn summarize<'a>(
        kind: AnalysisKind,
        subject: String,
        rows: impl Iterator<Item = &'a Participant>,
    ) -> AnalysisSummary {
        let mut games = 0usize;
        let mut wins = 0usize;
        let mut kda_sum = 0.0;

        for row in rows {
            games += 1;
            if row.win {
                wins += 1;
            }
            kda_sum += row.kda_ratio();
        }

        let (win_rate, avg_kda) = if games == 0 {
            (0.0, 0.0)
        } else {
            (wins as f64 / games as f64, kda_sum / games as f64)
        };

        AnalysisSummary {
            kind,
            subject,
            matches_considered: games,
            win_rate,
            avg_kda,
            generated_at: Utc::now(),
        }
    }
}

impl AnalyticsEngine for BasicAnalyticsEngine {
    fn analyze_player_performance(
        &self,
        puuid: &str,
        matches: &[Match],
    ) -> anyhow::Result<AnalysisSummary> {
        let rows = matches.iter().filter_map(|m| m.participant_by_puuid(puuid));
        let summary = Self::summarize(AnalysisKind::PlayerBaseline, puuid.to_string(), rows);
        tracing::debug!(
            puuid,
            games = summary.matches_considered,
            win_rate = summary.win_rate,
            "player baseline updated"
        );
        Ok(self.record(summary))
    }

    fn analyze_champion_performance(
        &self,
        puuid: &str,
        champion_id: i32,
        role: &str,
        matches: &[Match],
    ) -> anyhow::Result<AnalysisSummary> {
        let rows = matches
            .iter()
            .filter_map(|m| m.participant_by_puuid(puuid))
            .filter(|p| p.champion_id == champion_id && p.role == role);
        let subject = format!("{}/{}/{}", puuid, champion_id, role);
        let summary = Self::summarize(AnalysisKind::ChampionRole, subject, rows);
        Ok(self.record(summary))
    }

    fn calculate_performance_trends(
        &self,
        puuid: &str,
        matches: &[Match],
    ) -> anyhow::Result<AnalysisSummary> {
        let rows = matches.iter().filter_map(|m| m.participant_by_puuid(puuid));
        let subject = format!("{}/trend", puuid);
        let summary = Self::summarize(AnalysisKind::Trend, subject, rows);
        Ok(self.record(summary))
    }
}
