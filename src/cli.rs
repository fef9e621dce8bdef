//! Command-line interface parsing for econpulse
//!
//! This module handles parsing of CLI arguments using clap, with environment
//! variable fallbacks for API keys, and turns them into a validated
//! `StartupConfig`.

use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;

use crate::cache::{default_cache_dir, FreshnessPolicy};
use crate::data::{all_indicators, get_indicator_by_key, Indicator};

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// The specified indicator key is not recognized
    #[error("Invalid indicator: '{0}'. Valid indicators: {1}")]
    InvalidIndicator(String, String),

    /// No Alpha Vantage API key was given
    #[error("Missing Alpha Vantage API key: pass --api-key or set ALPHA_VANTAGE_API_KEY")]
    MissingApiKey,
}

/// econpulse - Track macroeconomic indicators from the terminal
#[derive(Parser, Debug)]
#[command(name = "econpulse")]
#[command(about = "Macroeconomic indicators with cached data, statistics, and AI insights")]
#[command(version)]
pub struct Cli {
    /// Alpha Vantage API key
    #[arg(long, env = "ALPHA_VANTAGE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Perplexity API key; insights are skipped without one
    #[arg(long, env = "PERPLEXITY_API_KEY", hide_env_values = true)]
    pub perplexity_key: Option<String>,

    /// Directory for cache files (defaults to the XDG cache directory)
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Only load the given indicator (repeatable)
    ///
    /// Valid indicators: wti, natural_gas, cpi, inflation, unemployment,
    /// real_gdp, federal_funds_rate, treasury_yield
    #[arg(long = "indicator", value_name = "KEY")]
    pub indicators: Vec<String>,

    /// Judge cache freshness per indicator instead of per cache file
    #[arg(long)]
    pub per_key_ttl: bool,

    /// Skip AI-written insights
    #[arg(long)]
    pub no_insights: bool,

    /// Print the dashboard as JSON
    #[arg(long)]
    pub json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Configuration derived from CLI arguments for application startup
#[derive(Debug, Clone)]
pub struct StartupConfig {
    pub api_key: String,
    /// `None` when insights are disabled or no key is available
    pub perplexity_key: Option<String>,
    pub cache_dir: PathBuf,
    pub indicators: Vec<&'static Indicator>,
    pub freshness: FreshnessPolicy,
    pub json: bool,
}

/// Parses an indicator key argument
///
/// # Returns
/// * `Ok(&Indicator)` if the key matches a tracked indicator
/// * `Err(CliError::InvalidIndicator)` if it doesn't
pub fn parse_indicator_arg(s: &str) -> Result<&'static Indicator, CliError> {
    let key = s.trim().to_lowercase().replace('-', "_");
    get_indicator_by_key(&key).ok_or_else(|| {
        let valid: Vec<&str> = all_indicators().iter().map(|i| i.key).collect();
        CliError::InvalidIndicator(s.to_string(), valid.join(", "))
    })
}

/// Resolves the cache directory: explicit flag, then XDG, then the temp dir
fn resolve_cache_dir(explicit: Option<&PathBuf>) -> PathBuf {
    explicit
        .cloned()
        .or_else(default_cache_dir)
        .unwrap_or_else(|| std::env::temp_dir().join("econpulse"))
}

impl StartupConfig {
    /// Creates a StartupConfig from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(StartupConfig)` with validated settings
    /// * `Err(CliError)` if an indicator is unknown or the API key is missing
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let indicators = if cli.indicators.is_empty() {
            all_indicators().iter().collect()
        } else {
            cli.indicators
                .iter()
                .map(|s| parse_indicator_arg(s))
                .collect::<Result<Vec<_>, _>>()?
        };

        let api_key = cli
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(CliError::MissingApiKey)?;

        let perplexity_key = if cli.no_insights {
            None
        } else {
            cli.perplexity_key.clone().filter(|k| !k.trim().is_empty())
        };

        let freshness = if cli.per_key_ttl {
            FreshnessPolicy::PerKey
        } else {
            FreshnessPolicy::DocumentWide
        };

        Ok(StartupConfig {
            api_key,
            perplexity_key,
            cache_dir: resolve_cache_dir(cli.cache_dir.as_ref()),
            indicators,
            freshness,
            json: cli.json,
        })
    }
}
