//! # Info Sieve CLI (`sieve`)
//!
//! ## Usage
//!
//! ```bash
//! sieve --config ./config/sieve.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `sieve init` | Create the SQLite database and run schema migrations |
//! | `sieve sources` | List configured connectors |
//! | `sieve sync [source]` | Run one fetch cycle (optionally one source) |
//! | `sieve run` | Scheduler and HTTP server until Ctrl-C |
//! | `sieve serve` | HTTP read API only |
//! | `sieve items` | List stored items |
//! | `sieve get <id>` | Show one item with its Q&A history |
//! | `sieve stats` | Totals, pass rate, per-source counts |
//! | `sieve ask <id> "<question>"` | Ask the model about a stored item |
//!
//! Logging goes to stderr and is controlled by `RUST_LOG` (default `info`).

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use info_sieve::ask::ask_about_item;
use info_sieve::config::{self, Config};
use info_sieve::ingest::{CycleOptions, CycleReport, Pipeline};
use info_sieve::scheduler::Scheduler;
use info_sieve::scorer::GeminiScorer;
use info_sieve::server::{self, AppState};
use info_sieve::store::{ItemQuery, ItemStore, SqliteStore};
use info_sieve::traits::{ConnectorRegistry, Scorer};
use info_sieve::{db, get, migrate, sources, stats};

/// Info Sieve: fetch, score, and keep only the links worth reading.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. A missing file means built-in defaults; environment variables
/// (`DATABASE_URL`, `GEMINI_API_KEY`, `GEMINI_MODEL`, `GEMINI_API_ENDPOINT`,
/// `PORT`, `SIEVE_THRESHOLD`) override either. See `config/sieve.example.toml`.
#[derive(Parser)]
#[command(
    name = "sieve",
    about = "Info Sieve — scheduled HN/RSS ingestion with LLM scoring and a threshold gate",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/sieve.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Idempotent.
    Init,

    /// List configured connectors in processing order.
    Sources,

    /// Run a single fetch cycle and print a per-source report.
    Sync {
        /// Only visit this source (case-insensitive name, e.g. `lobsters`).
        source: Option<String>,

        /// Fetch and dedup only; no scoring calls, no writes.
        #[arg(long)]
        dry_run: bool,
    },

    /// Run the scheduler and the HTTP server until Ctrl-C.
    Run,

    /// Start only the HTTP read API.
    Serve,

    /// List stored items, newest first.
    Items {
        /// Minimum total score (default: the configured threshold).
        #[arg(long)]
        min_score: Option<i64>,

        /// Filter by source name.
        #[arg(long)]
        source: Option<String>,

        #[arg(long, default_value_t = 20)]
        limit: i64,
    },

    /// Show one stored item with its score breakdown and questions.
    Get { id: i64 },

    /// Print aggregate statistics.
    Stats,

    /// Ask a question about a stored item and record the answer.
    Ask { id: i64, question: String },
}

struct Runtime {
    store: Arc<dyn ItemStore>,
    scorer: Arc<dyn Scorer>,
}

async fn open_runtime(cfg: &Config) -> Result<Runtime> {
    let pool = db::connect(cfg).await?;
    migrate::migrate_pool(&pool).await?;
    let scorer = GeminiScorer::new(&cfg.scoring)?;
    if cfg.scoring.api_key.is_empty() {
        warn!("GEMINI_API_KEY is not set; scoring and ask calls will fail");
    }
    Ok(Runtime {
        store: Arc::new(SqliteStore::new(pool)),
        scorer: Arc::new(scorer),
    })
}

fn build_pipeline(cfg: &Config, rt: &Runtime) -> Result<Pipeline> {
    let connectors = ConnectorRegistry::from_config(cfg)?;
    Ok(Pipeline::new(
        &cfg.pipeline,
        connectors,
        rt.scorer.clone(),
        rt.store.clone(),
    ))
}

fn print_report(report: &CycleReport, dry_run: bool) {
    println!(
        "{:<14} {:>7} {:>7} {:>7} {:>7} {:>7} {:>7}",
        "SOURCE", "FETCHED", "SEEN", "SCORED", "STORED", "DROPPED", "FAILED"
    );
    for s in &report.sources {
        if let Some(err) = &s.fetch_error {
            println!("{:<14} fetch failed: {}", s.source, err);
            continue;
        }
        println!(
            "{:<14} {:>7} {:>7} {:>7} {:>7} {:>7} {:>7}",
            s.source,
            s.fetched,
            s.skipped_existing,
            s.scored,
            s.stored,
            s.dropped,
            s.scoring_failures + s.persistence_failures
        );
    }
    println!();
    if dry_run {
        println!("Dry run: nothing scored or written.");
    } else {
        println!(
            "Cycle complete: {} stored, {} dropped.",
            report.stored(),
            report.dropped()
        );
    }
}

/// Flip `tx` to `true` on Ctrl-C.
fn spawn_ctrl_c(tx: watch::Sender<bool>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
            let _ = tx.send(true);
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Sources => {
            let registry = ConnectorRegistry::from_config(&cfg)?;
            sources::list_sources(&registry);
        }
        Commands::Sync { source, dry_run } => {
            let rt = open_runtime(&cfg).await?;
            let pipeline = build_pipeline(&cfg, &rt)?;
            if let Some(name) = &source {
                if pipeline.connectors().find(name).is_none() {
                    bail!("Unknown source: {}", name);
                }
            }

            let (tx, rx) = watch::channel(false);
            spawn_ctrl_c(tx);
            let opts = CycleOptions {
                only: source,
                dry_run,
            };
            let report = pipeline.run_cycle(&opts, &rx).await;
            print_report(&report, dry_run);
        }
        Commands::Run => {
            let rt = open_runtime(&cfg).await?;
            let pipeline = Arc::new(build_pipeline(&cfg, &rt)?);
            let scheduler = Scheduler::new(
                pipeline,
                Duration::from_secs(cfg.pipeline.interval_secs),
            );
            let state = AppState {
                store: rt.store.clone(),
                scorer: rt.scorer.clone(),
                threshold: cfg.pipeline.threshold,
            };

            let (tx, rx) = watch::channel(false);
            spawn_ctrl_c(tx);

            info!(
                interval_secs = cfg.pipeline.interval_secs,
                threshold = cfg.pipeline.threshold,
                "Starting scheduler"
            );
            let sched_rx = rx.clone();
            let sched = tokio::spawn(async move { scheduler.run(sched_rx).await });

            server::run_server(&cfg.server.bind, state, rx).await?;
            sched.await?;
        }
        Commands::Serve => {
            let rt = open_runtime(&cfg).await?;
            let state = AppState {
                store: rt.store,
                scorer: rt.scorer,
                threshold: cfg.pipeline.threshold,
            };
            let (tx, rx) = watch::channel(false);
            spawn_ctrl_c(tx);
            server::run_server(&cfg.server.bind, state, rx).await?;
        }
        Commands::Items {
            min_score,
            source,
            limit,
        } => {
            let rt = open_runtime(&cfg).await?;
            let query = ItemQuery {
                min_score: min_score.unwrap_or(cfg.pipeline.threshold),
                source,
                limit: limit.max(1),
            };
            get::run_list(rt.store.as_ref(), &query).await?;
        }
        Commands::Get { id } => {
            let rt = open_runtime(&cfg).await?;
            get::run_get(rt.store.as_ref(), id).await?;
        }
        Commands::Stats => {
            let rt = open_runtime(&cfg).await?;
            stats::run_stats(&cfg, rt.store.as_ref()).await?;
        }
        Commands::Ask { id, question } => {
            let rt = open_runtime(&cfg).await?;
            let resp = ask_about_item(rt.store.as_ref(), rt.scorer.as_ref(), id, &question).await?;
            println!("{}", resp.answer);
        }
    }

    Ok(())
}
