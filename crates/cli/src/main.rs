//! `magnetar` command line runner.
//!
//! ```bash
//! # Metadata-aware search for one episode
//! magnetar search "Breaking Bad" --season 1 --episode 1
//!
//! # Movie search on a single indexer
//! magnetar search Dune --movie --provider apibay
//!
//! # Resolve the info hash of a result
//! magnetar hash ygg 1234567
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use prometheus::{Encoder, Registry, TextEncoder};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use magnetar_core::metrics::register_metrics;
use magnetar_core::{
    build_orchestrator, load_config, load_config_env_only, validate_config, Config, NullParser,
    Orchestrator, SanitizedConfig, SearchQuery,
};

const DEFAULT_CONFIG_PATH: &str = "magnetar.toml";

/// Torrent search aggregation across indexers
#[derive(Parser)]
#[command(name = "magnetar")]
#[command(version)]
#[command(about = "Search torrent indexers with localized-title routing", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, env = "MAGNETAR_CONFIG")]
    config: Option<PathBuf>,

    /// Emit JSON logs
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search every indexer and print the combined results as JSON
    Search {
        /// Title, free text or IMDb id (tt0903747)
        #[arg(required = true)]
        query: Vec<String>,

        /// Search for a movie instead of a series
        #[arg(long, conflicts_with_all = ["season", "episode"])]
        movie: bool,

        /// Season number
        #[arg(short, long)]
        season: Option<u32>,

        /// Episode number; requests that exact episode
        #[arg(short, long, requires = "season")]
        episode: Option<u32>,

        /// Release year
        #[arg(short, long)]
        year: Option<u32>,

        /// Search a single provider, skipping metadata routing
        #[arg(short, long)]
        provider: Option<String>,

        /// Skip the metadata lookup and send the raw query everywhere
        #[arg(long)]
        raw: bool,

        /// Print Prometheus metrics to stderr afterwards
        #[arg(long)]
        metrics: bool,
    },

    /// Resolve the info hash of a search result
    Hash {
        /// Provider that returned the result
        provider: String,
        /// Result id
        id: String,
    },

    /// Print the effective configuration with secrets redacted
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    if let Err(e) = run(cli).await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);

    // stdout carries the JSON results
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn read_config(path: Option<PathBuf>) -> Result<Config> {
    let explicit = path.is_some();
    let config_path = path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    let config = if !explicit && !config_path.exists() {
        warn!(
            "No configuration at {:?}, using defaults and environment",
            config_path
        );
        load_config_env_only().context("Failed to read configuration from environment")?
    } else {
        info!("Loading configuration from {:?}", config_path);
        load_config(&config_path)
            .with_context(|| format!("Failed to load config from {:?}", config_path))?
    };

    validate_config(&config).context("Configuration validation failed")?;
    Ok(config)
}

async fn run(cli: Cli) -> Result<()> {
    let config = read_config(cli.config)?;

    match cli.command {
        Commands::Config => {
            print_json(&SanitizedConfig::from(&config))?;
        }
        Commands::Hash { provider, id } => {
            let orchestrator = orchestrator(&config)?;
            let hash = orchestrator
                .content_hash(&provider, &id)
                .await
                .with_context(|| format!("Failed to resolve hash of {} on {}", id, provider))?;
            println!("{}", hash);
        }
        Commands::Search {
            query,
            movie,
            season,
            episode,
            year,
            provider,
            raw,
            metrics,
        } => {
            let text = query.join(" ");
            let query = if movie {
                SearchQuery::movie(text)
            } else {
                SearchQuery::series(text, season, episode, episode.is_some())
            }
            .with_year(year);

            let orchestrator = orchestrator(&config)?;
            let _sweepers = orchestrator
                .spawn_cache_sweepers(Duration::from_secs(config.cache.sweep_interval_secs));

            if let Some(provider) = provider {
                let buckets = orchestrator
                    .search_provider(&provider, &query)
                    .await
                    .with_context(|| format!("Search on {} failed", provider))?;
                print_json(&buckets)?;
            } else if raw || config.metadata.is_none() {
                if !raw {
                    warn!("No [metadata] section configured, searching with the raw query");
                }
                print_json(&orchestrator.search_all(&query).await)?;
            } else {
                let result = orchestrator
                    .search_smart(&query)
                    .await
                    .context("Search failed")?;
                print_json(&result)?;
            }

            if metrics {
                eprintln!("{}", encode_metrics()?);
            }
        }
    }

    Ok(())
}

fn orchestrator(config: &Config) -> Result<Orchestrator> {
    build_orchestrator(config, Arc::new(NullParser)).context("Failed to build orchestrator")
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialize output")?
    );
    Ok(())
}

fn encode_metrics() -> Result<String> {
    let registry = Registry::new();
    register_metrics(&registry).context("Failed to register metrics")?;

    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&registry.gather(), &mut buffer)
        .context("Failed to encode metrics")?;
    Ok(String::from_utf8(buffer)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_series_search() {
        let cli = Cli::parse_from([
            "magnetar", "search", "Breaking", "Bad", "--season", "1", "--episode", "2",
        ]);
        match cli.command {
            Commands::Search {
                query,
                movie,
                season,
                episode,
                ..
            } => {
                assert_eq!(query.join(" "), "Breaking Bad");
                assert!(!movie);
                assert_eq!(season, Some(1));
                assert_eq!(episode, Some(2));
            }
            _ => panic!("expected search"),
        }
    }

    #[test]
    fn test_episode_requires_season() {
        assert!(Cli::try_parse_from(["magnetar", "search", "x", "--episode", "2"]).is_err());
        assert!(Cli::try_parse_from(["magnetar", "search", "x", "--movie", "--season", "1"]).is_err());
    }

    #[test]
    fn test_missing_default_file_still_reads_environment() {
        assert!(!PathBuf::from(DEFAULT_CONFIG_PATH).exists());
        std::env::set_var("MAGNETAR_SEARCH__MIN_CONFIDENCE", "0.25");
        let config = read_config(None).unwrap();
        std::env::remove_var("MAGNETAR_SEARCH__MIN_CONFIDENCE");

        assert_eq!(config.search.min_confidence, 0.25);
        assert!(config.metadata.is_none());
    }

    #[test]
    fn test_encode_metrics() {
        magnetar_core::metrics::SMART_SEARCHES
            .with_label_values(&["english"])
            .inc();
        let text = encode_metrics().unwrap();
        assert!(text.contains("magnetar_smart_searches_total{route=\"english\"}"));
    }
}
