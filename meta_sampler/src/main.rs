//! Main entry point for the meta-sampler binary
//!
//! Wires the real API client and normalizer into the workflow engine and
//! prints the resulting report.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tokio::signal;

use meta_sampler::{
    core::CategoryStats,
    services::{ClashApiClient, RankedSinglesNormalizer},
    CohortSummary, RunReport, UserAnalysis, UserReport, WorkflowConfig, WorkflowEngine,
};
use shared::{logging, stage_debug, WorkflowStage};

/// Meta dataset sampler for ranked Clash Royale battles
#[derive(Parser)]
#[command(name = "meta-sampler")]
#[command(about = "Samples a category-balanced set of ranked 1v1 battles from top players")]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,

    /// API base URL (overrides CLASH_ROYALE_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Build the meta cohort from the leaderboard population
    Meta(MetaArgs),
    /// Summarize the recent ranked battles of one player
    User(UserArgs),
}

#[derive(Args)]
pub struct MetaArgs {
    /// JSON config file; flags below override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub min_total: Option<u64>,

    #[arg(long)]
    pub min_per_category: Option<u64>,

    /// Comma-separated mandatory categories
    #[arg(long, value_delimiter = ',')]
    pub mandatory: Option<Vec<String>>,

    #[arg(long)]
    pub initial_batch: Option<usize>,

    #[arg(long)]
    pub incremental_batch: Option<usize>,

    #[arg(long)]
    pub max_loops: Option<u32>,

    /// Most-recent ranked battles kept per player
    #[arg(long)]
    pub records_per_player: Option<usize>,

    /// Number of top players requested from the leaderboard
    #[arg(long)]
    pub population: Option<usize>,

    /// Concurrent battlelog requests
    #[arg(long)]
    pub workers: Option<usize>,

    /// Per-request timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Stop the run after this many seconds
    #[arg(long)]
    pub deadline_secs: Option<u64>,

    /// Seed for reproducible sampling
    #[arg(long)]
    pub seed: Option<u64>,

    /// Print the full report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct UserArgs {
    /// Player tag, with or without the leading '#'
    #[arg(long)]
    pub tag: String,

    /// Per-request timeout in milliseconds
    #[arg(long, default_value = "10000")]
    pub timeout_ms: u64,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

impl MetaArgs {
    /// Layer file values and flags over the defaults
    fn into_config(self) -> anyhow::Result<(WorkflowConfig, bool)> {
        let mut config = match &self.config {
            Some(path) => WorkflowConfig::from_file(path)?,
            None => WorkflowConfig::default(),
        };

        if let Some(v) = self.min_total {
            config.min_total = v;
        }
        if let Some(v) = self.min_per_category {
            config.min_per_category = v;
        }
        if let Some(v) = self.mandatory {
            config.mandatory_categories = v;
        }
        if let Some(v) = self.initial_batch {
            config.initial_batch_size = v;
        }
        if let Some(v) = self.incremental_batch {
            config.incremental_batch_size = v;
        }
        if let Some(v) = self.max_loops {
            config.max_loops = v;
        }
        if let Some(v) = self.records_per_player {
            config.records_per_participant = v;
        }
        if let Some(v) = self.population {
            config.population_limit = v;
        }
        if let Some(v) = self.workers {
            config.worker_limit = v;
        }
        if let Some(v) = self.timeout_ms {
            config.fetch_timeout_ms = v;
        }
        if self.deadline_secs.is_some() {
            config.run_deadline_secs = self.deadline_secs;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }

        Ok((config, self.json))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(Some(&cli.log_level));

    match cli.command {
        Command::Meta(args) => run_meta(args, cli.api_url.as_deref()).await,
        Command::User(args) => run_user(args, cli.api_url.as_deref()).await,
    }
}

async fn run_meta(args: MetaArgs, api_url: Option<&str>) -> anyhow::Result<()> {
    let (config, json) = args.into_config()?;
    stage_debug!(WorkflowStage::Init, "Effective config: {:?}", config);

    let client = ClashApiClient::from_env(api_url, config.fetch_timeout())?;
    logging::log_progress(WorkflowStage::Init, "API", client.base_url().as_str());

    // One client serves both the population and the match histories
    let engine = WorkflowEngine::new(config, client.clone(), client, RankedSinglesNormalizer::new())?;

    let shutdown = engine.shutdown_handle();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                logging::log_progress(WorkflowStage::Done, "Shutdown", "Received Ctrl+C signal");
                shutdown.trigger();
            }
            Err(err) => {
                logging::log_error(WorkflowStage::Init, "Signal handling", &err);
            }
        }
    });

    let report = engine.run().await.context("meta sampling run failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_run_report(&report);
    }
    Ok(())
}

async fn run_user(args: UserArgs, api_url: Option<&str>) -> anyhow::Result<()> {
    let timeout = std::time::Duration::from_millis(args.timeout_ms);
    let client = ClashApiClient::from_env(api_url, timeout)?;
    let analysis = UserAnalysis::new(client, RankedSinglesNormalizer::new());

    let report = analysis
        .run(&args.tag)
        .await
        .with_context(|| format!("analysis of {} failed", args.tag))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_user_report(&report);
    }
    Ok(())
}

fn print_run_report(report: &RunReport) {
    println!("Run: {}", report.run_id);
    println!("Top players: {}", report.population_size);
    println!("Selected players: {}", report.participants_sampled);
    println!("Players fetched: {}", report.participants_fetched);
    println!("Meta battles: {}", report.cohort.len());
    println!("Loop count: {}", report.loop_count);
    println!("Stop decision: {}", report.decision);
    println!("Is balanced: {}", report.is_balanced);

    if !report.insufficient.is_empty() {
        println!("Insufficient categories:");
        for (category, count) in &report.insufficient {
            println!("  {category:12} -> {count:4}");
        }
    }

    print_summary(&CohortSummary::from_records(&report.cohort));

    println!("\n=== Notes ===");
    for note in &report.audit_notes {
        println!(" - {note}");
    }
}

fn print_user_report(report: &UserReport) {
    println!("Player: {}", report.tag);
    println!("Battles fetched: {}", report.battles_fetched);
    println!("Ranked 1v1 battles: {}", report.ranked_battles.len());
    print_summary(&report.summary);

    println!("\n=== Notes ===");
    for note in &report.notes {
        println!(" - {note}");
    }
}

fn print_summary(summary: &CohortSummary) {
    let overall = &summary.overall;
    println!(
        "Overall: {} games, {} wins, {} losses, {} draws ({:.1}% win rate)",
        overall.games,
        overall.wins,
        overall.losses,
        overall.draws,
        overall.win_rate() * 100.0
    );

    println!("\n=== Deck-type counts (opponent decks) ===");
    if summary.opponent_categories.is_empty() {
        println!("  (no battles)");
    }
    for (category, stats) in summary.opponent_by_frequency() {
        print_row(category, stats);
    }

    if !summary.player_categories.is_empty() {
        println!("\n=== Deck-type counts (my decks) ===");
        for (category, stats) in &summary.player_categories {
            print_row(category, stats);
        }
    }
}

fn print_row(category: &str, stats: &CategoryStats) {
    println!(
        "  {category:12} -> {:4}  (win rate {:5.1}%)",
        stats.games,
        stats.win_rate() * 100.0
    );
}
