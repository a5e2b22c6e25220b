//! Command-line interface parsing for solardash
//!
//! Credentials come from flags or the environment. Everything else has a
//! working default, so `SOLAR_API_KEY=... SOLAR_SITE_ID=... solardash` is a
//! complete invocation.

use std::path::PathBuf;
use std::time::Duration as StdDuration;

use chrono::{Duration, Local, NaiveDate};
use clap::Parser;
use thiserror::Error;

use crate::api::{ClientConfig, Endpoint, DEFAULT_COOLDOWN_MINUTES, PRODUCTION_BASE_URL};
use crate::refresh::RefreshConfig;

/// Allowed auto-refresh interval, in minutes
pub const REFRESH_MINUTES_RANGE: std::ops::RangeInclusive<u64> = 5..=15;

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Invalid date: '{0}'. Expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Date {0} is in the future")]
    FutureDate(NaiveDate),

    #[error("Unknown endpoint: '{0}'. Valid endpoints: {valid}", valid = endpoint_names())]
    UnknownEndpoint(String),

    #[error("Refresh interval must be between 5 and 15 minutes, got {0}")]
    RefreshOutOfRange(u64),

    #[error("Cooldown must be at least one minute")]
    InvalidCooldown,
}

fn endpoint_names() -> String {
    Endpoint::ALL
        .iter()
        .map(|e| e.name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// solardash - terminal dashboard for a SolarEdge site
#[derive(Parser, Debug)]
#[command(name = "solardash")]
#[command(about = "Terminal dashboard for SolarEdge solar sites")]
#[command(version)]
pub struct Cli {
    /// Monitoring API key
    #[arg(long, env = "SOLAR_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Site ID to monitor
    #[arg(long, env = "SOLAR_SITE_ID")]
    pub site_id: String,

    /// API host, e.g. a local development proxy
    #[arg(long, default_value = PRODUCTION_BASE_URL)]
    pub base_url: String,

    /// Day to show (YYYY-MM-DD), defaults to today
    #[arg(long, value_name = "DATE")]
    pub date: Option<String>,

    /// Auto-refresh interval in minutes (5-15)
    #[arg(long, default_value_t = 15)]
    pub refresh_minutes: u64,

    /// How long to stop calling the API after a 429
    #[arg(long, default_value_t = DEFAULT_COOLDOWN_MINUTES)]
    pub cooldown_minutes: i64,

    /// Cache directory, defaults to the platform cache dir
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// HTTP request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// Ignore cached data and any cooldown for the first load
    #[arg(long)]
    pub force_refresh: bool,

    /// Print one endpoint's JSON (through the cache) and exit
    ///
    /// Examples:
    ///   solardash --dump overview
    ///   solardash --dump powerDetails --date 2024-07-15
    #[arg(long, value_name = "ENDPOINT")]
    pub dump: Option<String>,
}

/// Configuration derived from CLI arguments for application startup
#[derive(Debug, Clone)]
pub struct StartupConfig {
    pub client: ClientConfig,
    pub date: NaiveDate,
    pub refresh: RefreshConfig,
    pub cache_dir: Option<PathBuf>,
    pub timeout: StdDuration,
    pub force_refresh: bool,
    /// Set when running as a one-shot JSON dump instead of the dashboard
    pub dump: Option<Endpoint>,
}

/// Parses a `YYYY-MM-DD` date that is not after today
pub fn parse_date_arg(s: &str) -> Result<NaiveDate, CliError> {
    let date = NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| CliError::InvalidDate(s.to_string()))?;
    if date > Local::now().date_naive() {
        return Err(CliError::FutureDate(date));
    }
    Ok(date)
}

/// Parses an endpoint by its API path name (`overview`, `powerDetails`, ...)
pub fn parse_endpoint_arg(s: &str) -> Result<Endpoint, CliError> {
    Endpoint::from_name(s).ok_or_else(|| CliError::UnknownEndpoint(s.to_string()))
}

impl StartupConfig {
    /// Creates a StartupConfig from parsed CLI arguments.
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        if !REFRESH_MINUTES_RANGE.contains(&cli.refresh_minutes) {
            return Err(CliError::RefreshOutOfRange(cli.refresh_minutes));
        }
        if cli.cooldown_minutes < 1 {
            return Err(CliError::InvalidCooldown);
        }

        let date = match &cli.date {
            Some(s) => parse_date_arg(s)?,
            None => Local::now().date_naive(),
        };
        let dump = cli.dump.as_deref().map(parse_endpoint_arg).transpose()?;

        let client = ClientConfig::new(cli.api_key.trim(), cli.site_id.trim())
            .with_base_url(cli.base_url.trim())
            .with_cooldown(Duration::minutes(cli.cooldown_minutes));

        Ok(StartupConfig {
            client,
            date,
            refresh: RefreshConfig {
                interval: StdDuration::from_secs(cli.refresh_minutes * 60),
                enabled: true,
            },
            cache_dir: cli.cache_dir.clone(),
            timeout: StdDuration::from_secs(cli.timeout_secs),
            force_refresh: cli.force_refresh,
            dump,
        })
    }
}
