use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::EnvFilter;

use sqlscore::cli::{compare, history, score, seed, similarity, thresholds};
use sqlscore::config::Config;
use sqlscore::store::MetricsStore;

#[derive(Parser)]
#[command(name = "sqlscore")]
#[command(about = "Score and compare SQL queries by execution cost, plan and style")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "sqlscore.yaml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Score two queries and show the better one, formatted
    Compare {
        /// File containing the first query
        query1: PathBuf,
        /// File containing the second query
        query2: PathBuf,
        /// Print the comparison as JSON
        #[arg(long)]
        json: bool,
    },

    /// Score a single query
    Score {
        /// File containing the query
        query: PathBuf,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show how similar two queries are
    Similarity {
        query1: PathBuf,
        query2: PathBuf,
    },

    /// Show the current dynamic thresholds
    Thresholds {
        /// Reference query file for similarity-based thresholds
        #[arg(short, long)]
        query: Option<PathBuf>,
    },

    /// List recorded performance samples
    History {
        /// Only show samples in this query's group
        #[arg(short, long)]
        query: Option<PathBuf>,

        /// Maximum number of samples
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Create the demo target database
    Seed,
}

fn main() {
    init_tracing();

    if let Err(err) = run() {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(&cli.config)
        .with_context(|| format!("failed to load config: {}", cli.config))?;

    match cli.command {
        Commands::Compare {
            query1,
            query2,
            json,
        } => compare::run(&open_store(&config)?, &config, &query1, &query2, json),
        Commands::Score { query, json } => score::run(&open_store(&config)?, &config, &query, json),
        Commands::Similarity { query1, query2 } => {
            similarity::run(&query1, &query2, config.scoring.similarity_threshold)
        }
        Commands::Thresholds { query } => {
            thresholds::run(&open_store(&config)?, &config.scoring, query.as_deref())
        }
        Commands::History { query, limit } => {
            history::run(&open_store(&config)?, query.as_deref(), limit)
        }
        Commands::Seed => seed::run(&config),
    }
}

fn open_store(config: &Config) -> Result<MetricsStore> {
    let metrics_path = config.metrics_path();
    let store = MetricsStore::open(&metrics_path)
        .with_context(|| format!("failed to open metrics store: {}", metrics_path.display()))?
        .with_retention(config.retention.max_samples);
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_store_free_commands_parse() {
        let cli = Cli::try_parse_from(["sqlscore", "similarity", "a.sql", "b.sql"]).unwrap();
        assert!(matches!(cli.command, Commands::Similarity { .. }));

        let cli = Cli::try_parse_from(["sqlscore", "--config", "x.yaml", "seed"]).unwrap();
        assert!(matches!(cli.command, Commands::Seed));
        assert_eq!(cli.config, "x.yaml");

        let cli = Cli::try_parse_from(["sqlscore", "history", "--limit", "5"]).unwrap();
        assert!(matches!(cli.command, Commands::History { query: None, limit: 5 }));
    }
}
