//! econpulse - Macroeconomic indicators in the terminal
//!
//! Fetches indicator series from Alpha Vantage through a disk cache, computes
//! volatility and correlations, and optionally adds AI-written insights.

use clap::Parser;
use tracing::warn;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use econpulse::cache::{CacheStore, InsightCache};
use econpulse::cli::{Cli, StartupConfig};
use econpulse::dashboard::DashboardLoader;
use econpulse::data::ProviderClient;
use econpulse::insights::{InsightOrchestrator, NarrativeClient, PerplexityClient};
use econpulse::report::render_text;

/// Sets up logging to stderr so stdout stays clean for `--json`
///
/// Priority: RUST_LOG env var > --verbose flag > default (info)
fn init_tracing(verbose: bool) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = match StartupConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(2);
        }
    };

    init_tracing(cli.verbose);

    let cache = CacheStore::with_dir(config.cache_dir.clone()).with_policy(config.freshness);
    let insight_cache = InsightCache::with_dir(&config.cache_dir);

    let orchestrator = if cli.no_insights {
        None
    } else {
        let client = config
            .perplexity_key
            .as_deref()
            .map(|key| Box::new(PerplexityClient::new(key)) as Box<dyn NarrativeClient>);
        if client.is_none() {
            warn!("Perplexity API key not found, insights will be empty");
        }
        Some(InsightOrchestrator::new(client).with_indicators(config.indicators.clone()))
    };

    let loader = DashboardLoader::new(
        ProviderClient::new(config.api_key.clone()),
        cache,
        insight_cache,
        orchestrator,
    )
    .with_indicators(config.indicators.clone());

    let dashboard = loader.load().await;

    if config.json {
        println!("{}", serde_json::to_string_pretty(&dashboard)?);
    } else {
        print!("{}", render_text(&dashboard));
    }

    Ok(())
}
