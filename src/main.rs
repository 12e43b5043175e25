//! Rift demo binary
//!
//! Seeds an in-memory store with generated match history, then walks the
//! full pipeline: index, optimized queries, batch analytics, incremental
//! update.

use rift::batch::{AnalyticsBatchProcessor, BatchOptions, BatchProcessor};
use rift::engine::{AnalyticsEngine, BasicAnalyticsEngine, CacheInvalidator};
use rift::incremental::{CheckpointManager, IncrementalAnalyticsUpdater};
use rift::index::MatchIndex;
use rift::query::{AnalyticsFilters, QueryKind, QueryOptimizer};
use rift::store::{InMemoryMatchStore, Match, MatchStore, Participant, BLUE_TEAM, RED_TEAM};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const ROLES: [&str; 5] = ["TOP", "JUNGLE", "MID", "ADC", "SUPPORT"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "rift=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Rift Match Analytics v{}", env!("CARGO_PKG_VERSION"));

    // Build and index demo data
    let store = Arc::new(InMemoryMatchStore::new());
    let index = Arc::new(MatchIndex::new());
    seed_demo_matches(&store, &index)?;

    let stats = index.stats()?;
    tracing::info!(
        matches = stats.total_matches_indexed,
        players = stats.players,
        champions = stats.champions,
        "index built"
    );

    // Optimized queries
    demo_queries(&store, &index).await?;

    // Batch analytics
    let engine = Arc::new(BasicAnalyticsEngine::new());
    demo_batch(&store, Arc::clone(&engine)).await?;

    // Incremental update against a temp checkpoint file
    demo_incremental(&store, engine).await?;

    tracing::info!("Rift demo complete");
    Ok(())
}

/// Generate 40 matches over the last 20 days for ten demo players
fn seed_demo_matches(
    store: &InMemoryMatchStore,
    index: &MatchIndex,
) -> Result<(), Box<dyn std::error::Error>> {
    let now = chrono::Utc::now().timestamp_millis();
    let day_ms = 24 * 3600 * 1000;

    for game in 0..40i64 {
        let mut m = Match::new(
            format!("DEMO_{}", 1000 + game),
            now - (game % 20) * day_ms - game * 60_000,
            if game % 4 == 0 { 440 } else { 420 },
        )
        .duration(1500 + game * 17);

        for slot in 0..10i64 {
            let player = format!("player-{}", (game + slot) % 10);
            let champion = (10 + ((game * 3 + slot * 7) % 40)) as i32;
            let team = if slot < 5 { BLUE_TEAM } else { RED_TEAM };
            let role = ROLES[(slot % 5) as usize];
            m = m.participant(
                Participant::new(player, champion, team, role)
                    .kda(
                        ((game + slot) % 12) as u32,
                        ((game + slot * 2) % 9) as u32,
                        ((game * 2 + slot) % 15) as u32,
                    )
                    .economy(8000 + (game * 100) as u64, 15000 + (slot * 900) as u64, 140),
            );
        }

        let m = m.winner(if (game + game / 7) % 2 == 0 { BLUE_TEAM } else { RED_TEAM });
        index.add_match(&m)?;
        store.insert(m)?;
    }
    Ok(())
}

async fn demo_queries(
    store: &Arc<InMemoryMatchStore>,
    index: &Arc<MatchIndex>,
) -> Result<(), Box<dyn std::error::Error>> {
    let optimizer = QueryOptimizer::new(
        Arc::clone(index),
        Arc::clone(store) as Arc<dyn MatchStore>,
    );

    let filters = AnalyticsFilters::new().player("player-1").last_days(30);
    let plan = optimizer.optimize(&filters, QueryKind::PlayerPerformance);
    tracing::info!(
        cost = plan.estimated_cost,
        tier = ?plan.cache_tier,
        steps = plan.steps.len(),
        "query plan for player-1"
    );

    let matches = optimizer
        .execute(&filters, QueryKind::PlayerPerformance)
        .await?;
    tracing::info!(results = matches.len(), "player-1, last 30 days");

    let wins = optimizer
        .execute(
            &AnalyticsFilters::new().player("player-1").wins_only(),
            QueryKind::PlayerPerformance,
        )
        .await?;
    tracing::info!(results = wins.len(), "player-1 wins");

    // Second execution of the same filters exercises the cache
    optimizer
        .execute(&filters, QueryKind::PlayerPerformance)
        .await?;

    for (kind, stats) in optimizer.statistics() {
        tracing::info!(
            %kind,
            executions = stats.executions,
            hits = stats.cache_hits,
            misses = stats.cache_misses,
            avg_ms = stats.avg_latency_ms,
            "query statistics"
        );
    }
    Ok(())
}

async fn demo_batch(
    store: &Arc<InMemoryMatchStore>,
    engine: Arc<BasicAnalyticsEngine>,
) -> Result<(), Box<dyn std::error::Error>> {
    let processor = Arc::new(BatchProcessor::new());
    let analytics = AnalyticsBatchProcessor::new(
        Arc::clone(&processor),
        engine as Arc<dyn AnalyticsEngine>,
        Arc::clone(store) as Arc<dyn MatchStore>,
    );

    let puuids: Vec<String> = (0..10).map(|i| format!("player-{}", i)).collect();
    let options = BatchOptions::new().on_progress(|progress| {
        if progress.is_complete() {
            tracing::info!(
                batch_id = %progress.batch_id,
                completed = progress.completed_tasks,
                "batch complete"
            );
        }
    });

    let report = analytics.batch_analyze_players(&puuids, options).await?;
    tracing::info!(
        completed = report.progress.completed_tasks,
        failed = report.progress.failed_tasks,
        success_rate = report.progress.success_rate(),
        "player analysis batch"
    );

    let metrics = processor.metrics();
    tracing::info!(
        batches = metrics.batches_processed,
        tasks = metrics.tasks_processed,
        avg_batch_ms = metrics.avg_batch_ms(),
        "processor metrics"
    );
    Ok(())
}

async fn demo_incremental(
    store: &Arc<InMemoryMatchStore>,
    engine: Arc<BasicAnalyticsEngine>,
) -> Result<(), Box<dyn std::error::Error>> {
    let checkpoint_path = std::env::temp_dir().join("rift-demo-checkpoints.json");
    // Fresh demo state on every run
    if checkpoint_path.exists() {
        std::fs::remove_file(&checkpoint_path)?;
    }
    let checkpoints = CheckpointManager::open(&checkpoint_path)?;
    let updater = IncrementalAnalyticsUpdater::new(
        Arc::clone(store) as Arc<dyn MatchStore>,
        engine as Arc<dyn AnalyticsEngine>,
        Arc::new(rift::engine::NullInvalidator) as Arc<dyn CacheInvalidator>,
        checkpoints,
    );

    let first = updater.update_player("player-1", false).await?;
    tracing::info!(
        matches = first.matches_processed,
        batches = first.batches_run,
        full = first.full_update,
        "first incremental pass"
    );

    let second = updater.update_player("player-1", false).await?;
    tracing::info!(
        matches = second.matches_processed,
        "second incremental pass (nothing new)"
    );

    let needing = updater.get_players_needing_updates(24).await?;
    tracing::info!(players = needing.len(), "players needing updates");
    Ok(())
}
