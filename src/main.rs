//! Vessel Memory - command line host
//!
//! Opens the configured store, runs one operation and saves on exit.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vessel_memory::memory::{MemoryManager, NewItem, Outcome, RecallRequest, Ttl};
use vessel_memory::Config;

#[derive(Parser)]
#[command(name = "vessel-memory")]
#[command(about = "Persistent associative memory")]
struct Cli {
    /// YAML config file (defaults to ./vessel.yaml)
    #[arg(short, long, env = "VESSEL_CONFIG")]
    config: Option<PathBuf>,

    /// Override the store path from the config
    #[arg(long)]
    store: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, env = "VESSEL_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a new memory
    Remember {
        text: String,
        #[arg(short = 't', long = "type", default_value = "note")]
        item_type: String,
        #[arg(short, long, default_value = "0.5")]
        importance: f64,
        /// e.g. 12h, 30d, 2w or never
        #[arg(long)]
        ttl: Option<Ttl>,
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
        #[arg(long)]
        scope: Option<String>,
    },

    /// Recall by free-text query or by explicit seeds
    Recall {
        /// Free-text query (ignored when --seed is given)
        query: Option<String>,
        /// Seed as id=value, repeatable
        #[arg(long = "seed", value_parser = parse_seed)]
        seeds: Vec<(String, f64)>,
        #[arg(short, long)]
        limit: Option<usize>,
        #[arg(long)]
        scope: Option<String>,
    },

    /// Print one item (counts as an access)
    Get { id: String },

    /// Link two items
    Associate {
        from: String,
        to: String,
        #[arg(short, long, default_value = "relates_to")]
        relation: String,
        #[arg(short, long, default_value = "0.5")]
        weight: f64,
    },

    /// Record whether an item helped (success / failure)
    Feedback { id: String, outcome: Outcome },

    /// Delete an item and its edges
    Delete { id: String },

    /// Print the graph manifest
    Manifest {
        /// Full structured manifest instead of the text rendering
        #[arg(long)]
        json: bool,
    },

    /// Print aggregate counters
    Stats,

    /// Commit decay as of now
    Decay,

    /// Delete items whose ttl elapsed
    Sweep,

    /// List items eligible for pruning
    Prune,
}

fn parse_seed(raw: &str) -> Result<(String, f64), String> {
    let (id, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected id=value, got '{}'", raw))?;
    let value: f64 = value
        .parse()
        .map_err(|_| format!("invalid seed value in '{}'", raw))?;
    Ok((id.to_string(), value))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize tracing (stderr, so stdout stays machine-readable)
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "warn,vessel_memory=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if cli.log_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    let mut config = Config::from_yaml_and_env(cli.config.as_deref())?;
    if let Some(store) = cli.store {
        config.store_path = store;
    }

    let manager = config
        .open()
        .await
        .with_context(|| format!("opening {}", config.store_path.display()))?;

    let outcome = run(&manager, cli.command).await;
    manager.shutdown().await?;
    outcome
}

async fn run(manager: &MemoryManager, command: Commands) -> Result<()> {
    match command {
        Commands::Remember {
            text,
            item_type,
            importance,
            ttl,
            tags,
            scope,
        } => {
            let mut request = NewItem::new(text, item_type.as_str(), importance).with_tags(tags);
            if let Some(ttl) = ttl {
                request = request.with_ttl(ttl);
            }
            if let Some(scope) = scope {
                request = request.with_scope(scope);
            }
            print_json(&manager.remember(request).await?)
        }
        Commands::Recall {
            query,
            seeds,
            limit,
            scope,
        } => {
            let mut request = if !seeds.is_empty() {
                RecallRequest::items(seeds)
            } else {
                let query = query.context("either a query or at least one --seed is required")?;
                RecallRequest::query(query)
            };
            if let Some(limit) = limit {
                request = request.with_limit(limit);
            }
            if let Some(scope) = scope {
                request = request.with_scope(scope);
            }
            print_json(&manager.recall(request).await?)
        }
        Commands::Get { id } => print_json(&manager.get_item(&id).await?),
        Commands::Associate {
            from,
            to,
            relation,
            weight,
        } => print_json(&manager.associate(&from, &to, &relation, weight).await?),
        Commands::Feedback { id, outcome } => print_json(&manager.feedback(&id, outcome).await?),
        Commands::Delete { id } => {
            let removed = manager.delete(&id).await?;
            print_json(&serde_json::json!({ "deleted": id, "removedEdges": removed }))
        }
        Commands::Manifest { json } => {
            let manifest = manager.manifest().await;
            if json {
                print_json(manifest.as_ref())
            } else {
                println!("{}", manifest.text);
                Ok(())
            }
        }
        Commands::Stats => print_json(&manager.stats().await),
        Commands::Decay => print_json(&manager.apply_decay().await?),
        Commands::Sweep => print_json(&manager.sweep_expired().await?),
        Commands::Prune => print_json(&manager.prune_candidates().await),
    }
}
