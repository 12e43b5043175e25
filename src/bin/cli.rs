//! Rift CLI
//!
//! Command-line interface over a JSON match file:
//! - Index statistics
//! - Filtered match queries
//! - Incremental analytics updates
//! - Checkpoint inspection and cleanup

use clap::{Parser, Subcommand};
use rift::batch::{AnalyticsBatchProcessor, BatchOptions, BatchProcessor};
use rift::config::Config;
use rift::engine::{AnalyticsEngine, BasicAnalyticsEngine, CacheInvalidator};
use rift::incremental::{CheckpointManager, IncrementalAnalyticsUpdater};
use rift::index::MatchIndex;
use rift::query::{AnalyticsFilters, QueryKind, QueryOptimizer};
use rift::store::{InMemoryMatchStore, MatchStore};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "rift")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "League of Legends match analytics")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// JSON match file (default: from config)
    #[arg(long, global = true)]
    pub matches: Option<PathBuf>,

    /// Config file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show index statistics for the match file
    Stats,

    /// Query matches with filters
    Query {
        /// Player puuids (repeatable)
        #[arg(short, long)]
        player: Vec<String>,
        /// Champion ids (repeatable)
        #[arg(short = 'C', long)]
        champion: Vec<i32>,
        /// Roles (repeatable)
        #[arg(short, long)]
        role: Vec<String>,
        /// Queue ids (repeatable)
        #[arg(short, long)]
        queue: Vec<i32>,
        /// Restrict to the last N days
        #[arg(short, long)]
        days: Option<i64>,
        /// Only matches the player won
        #[arg(long)]
        wins_only: bool,
        /// Result cap
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Run an incremental analytics update for a player
    Update {
        /// Player puuid
        puuid: String,
        /// Reprocess the whole history
        #[arg(long)]
        full: bool,
    },

    /// Run batch analytics across all players in the file
    Analyze,

    /// Inspect or clean up checkpoints
    Checkpoints {
        #[command(subcommand)]
        action: CheckpointAction,
    },

    /// Print a default config file
    InitConfig,
}

#[derive(Subcommand)]
pub enum CheckpointAction {
    /// List all player checkpoints
    List,
    /// Remove checkpoints inactive longer than the configured age
    Cleanup,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };

    let matches_path = cli
        .matches
        .clone()
        .unwrap_or_else(|| config.store.matches_path());

    match cli.command {
        Commands::Stats => {
            let (_store, index) = load_and_index(&matches_path)?;
            let stats = index.stats()?;
            println!("Matches indexed:  {}", stats.total_matches_indexed);
            println!("Players:          {}", stats.players);
            println!("Champions:        {}", stats.champions);
            println!("Roles:            {}", stats.roles);
            println!("Queues:           {}", stats.queues);
            println!("Days covered:     {}", stats.days);
            println!("Composite keys:   {}", stats.composite_keys);
        }

        Commands::Query {
            player,
            champion,
            role,
            queue,
            days,
            wins_only,
            limit,
        } => {
            let (store, index) = load_and_index(&matches_path)?;

            let mut filters = AnalyticsFilters::new().players(player);
            for id in champion {
                filters = filters.champion(id);
            }
            for r in role {
                filters = filters.role(r);
            }
            for q in queue {
                filters = filters.queue(q);
            }
            if let Some(days) = days {
                filters = filters.last_days(days);
            }
            if wins_only {
                filters = filters.wins_only();
            }
            if let Some(limit) = limit {
                filters = filters.limit(limit);
            }

            let optimizer = QueryOptimizer::with_cache_config(
                index,
                store as Arc<dyn MatchStore>,
                config.query.cache_config(),
            );
            let plan = optimizer.optimize(&filters, QueryKind::MatchLookup);
            let results = optimizer.execute(&filters, QueryKind::MatchLookup).await?;

            println!(
                "{} matches (plan cost {:.1}, tier {:?})",
                results.len(),
                plan.estimated_cost,
                plan.cache_tier
            );
            for m in &results {
                let date = m.created_at().map(|d| d.format("%Y-%m-%d %H:%M").to_string());
                println!(
                    "  {}  queue {}  {}  {} participants",
                    m.match_id,
                    m.queue_id,
                    date.unwrap_or_else(|| "unknown date".to_string()),
                    m.participants.len()
                );
            }
        }

        Commands::Update { puuid, full } => {
            let (store, _index) = load_and_index(&matches_path)?;
            let updater = build_updater(&config, store)?;

            let report = updater.update_player(&puuid, full).await?;
            println!("Player:            {}", report.player_puuid);
            println!("Matches processed: {}", report.matches_processed);
            println!("Batches run:       {}", report.batches_run);
            println!("Full update:       {}", report.full_update);
            println!("Duration:          {} ms", report.duration_ms);
            if !report.is_success() {
                println!("Degraded: {} batch error(s)", report.errors.len());
                for error in &report.errors {
                    println!("  {}", error);
                }
            }
        }

        Commands::Analyze => {
            let (store, _index) = load_and_index(&matches_path)?;
            let puuids: std::collections::BTreeSet<String> = store
                .all_matches()?
                .iter()
                .flat_map(|m| m.puuids().map(str::to_string))
                .collect();
            let puuids: Vec<String> = puuids.into_iter().collect();

            let engine = Arc::new(BasicAnalyticsEngine::new());
            let analytics = AnalyticsBatchProcessor::new(
                Arc::new(BatchProcessor::new()),
                Arc::clone(&engine) as Arc<dyn AnalyticsEngine>,
                store as Arc<dyn MatchStore>,
            );

            let mut options = BatchOptions::new();
            if let Some(workers) = config.batch.max_workers {
                options = options.max_workers(workers);
            }
            let report = analytics.batch_analyze_players(&puuids, options).await?;

            println!(
                "Batch {}: {} completed, {} failed",
                report.batch_id, report.progress.completed_tasks, report.progress.failed_tasks
            );
            let mut summaries: Vec<_> = report.results.values().collect();
            summaries.sort_by(|a, b| {
                b.win_rate
                    .partial_cmp(&a.win_rate)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            for summary in summaries {
                println!(
                    "  {:<24} {:>3} games  {:>5.1}% wins  {:.2} kda",
                    summary.subject,
                    summary.matches_considered,
                    summary.win_rate * 100.0,
                    summary.avg_kda
                );
            }
        }

        Commands::Checkpoints { action } => {
            let checkpoints = CheckpointManager::open(config.store.checkpoints_path())?;
            match action {
                CheckpointAction::List => {
                    let mut all = checkpoints.all();
                    all.sort_by(|a, b| a.player_puuid.cmp(&b.player_puuid));
                    if all.is_empty() {
                        println!("No checkpoints.");
                    }
                    for c in all {
                        println!(
                            "{:<24} {:>6} matches  last: {}  updated: {}",
                            c.player_puuid,
                            c.processed_match_count,
                            c.last_processed_match_id.as_deref().unwrap_or("-"),
                            c.updated_at.format("%Y-%m-%d %H:%M")
                        );
                    }
                }
                CheckpointAction::Cleanup => {
                    let removed =
                        checkpoints.cleanup_stale(config.incremental.checkpoint_max_age_days)?;
                    println!("Removed {} stale checkpoint(s).", removed);
                }
            }
        }

        Commands::InitConfig => {
            print!("{}", rift::config::generate_default_config());
        }
    }

    Ok(())
}

fn load_and_index(path: &PathBuf) -> anyhow::Result<(Arc<InMemoryMatchStore>, Arc<MatchIndex>)> {
    let store = Arc::new(InMemoryMatchStore::load_json(path)?);
    let index = Arc::new(MatchIndex::new());
    for m in store.all_matches()? {
        index.add_match(&m)?;
    }
    Ok((store, index))
}

fn build_updater(
    config: &Config,
    store: Arc<InMemoryMatchStore>,
) -> anyhow::Result<IncrementalAnalyticsUpdater> {
    let checkpoints = CheckpointManager::open(config.store.checkpoints_path())?;
    Ok(IncrementalAnalyticsUpdater::with_config(
        store as Arc<dyn MatchStore>,
        Arc::new(BasicAnalyticsEngine::new()) as Arc<dyn AnalyticsEngine>,
        Arc::new(rift::engine::NullInvalidator) as Arc<dyn CacheInvalidator>,
        checkpoints,
        config.incremental.updater_config(),
    ))
}
