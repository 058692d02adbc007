use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use capsel_core::bootstrap::bootstrap;
use capsel_core::{select, FeatureCache, FeatureSeed, ProbeContext};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "capsel")]
#[command(about = "Runtime feature detection and capability-gated resource selection")]
#[command(version)]
struct Cli {
    /// JSON file mapping feature names to booleans, used to seed the cache
    #[arg(long, global = true)]
    seed: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the feature cache contents
    List {
        /// Run all pending probes before printing
        #[arg(long)]
        all: bool,
    },

    /// Query a single feature
    Query {
        /// Feature name to query
        name: String,
    },

    /// Evaluate a selection expression
    Select {
        /// Expression in the form feature?whenTrue:whenFalse
        expression: String,
    },
}

fn build_cache(seed: Option<&Path>) -> Result<FeatureCache> {
    let context = ProbeContext::detect();
    let cache = match seed {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("cannot read seed file {}", path.display()))?;
            let seed: FeatureSeed = serde_json::from_str(&content)
                .with_context(|| format!("invalid seed file {}", path.display()))?;
            info!(entries = seed.0.len(), "seeding feature cache");
            FeatureCache::with_seed(context, seed.0)
        }
        None => FeatureCache::new(context),
    };
    bootstrap(&cache);
    Ok(cache)
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "capsel=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let cache = build_cache(cli.seed.as_deref())?;

    match cli.command {
        Commands::List { all } => {
            if all {
                cache.evaluate_all();
            }
            let snapshot = cache.snapshot();
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }

        Commands::Query { name } => {
            println!("{}", cache.query(name));
        }

        Commands::Select { expression } => match select(&expression, &cache) {
            Some(id) => println!("{}", id),
            None => println!("(no selection)"),
        },
    }

    Ok(())
}
