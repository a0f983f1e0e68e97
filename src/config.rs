//! Engine configuration.
//!
//! Defaults come from the constants below; a deployment overrides them through environment
//! variables (optionally from a `.env` file). Unparseable values are ignored with a warning.
//!
//! The log level is read on its own first, so the subscriber is installed before any of
//! those warnings fire.

use std::path::PathBuf;
use std::str::FromStr;

use chrono::Duration;
use rust_decimal::Decimal;
use tracing::{warn, Level};

use crate::models::{from_tokens, Amount, UNITS_PER_TOKEN};
use crate::yield_venue::DEFAULT_YIELD_RATE;

/// Smallest accepted stake (10 BB)
pub const MIN_STAKE: Amount = 10 * UNITS_PER_TOKEN;

/// Share of total stake one side needs for unattended resolution
pub const SUPERMAJORITY_PERCENT: u32 = 80;

/// Share of the yield paid to the winning side
pub const WINNERS_YIELD_PERCENT: u32 = 80;

/// Voting window after expiry before unattended finalize may run
pub const RESOLUTION_WINDOW_HOURS: i64 = 24;

pub const DEFAULT_OWNER: &str = "OWNER";

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub owner: String,
    pub min_stake: Amount,
    pub yield_rate: u32,
    pub supermajority_percent: u32,
    pub winners_yield_percent: u32,
    pub resolution_window: Duration,
    pub snapshot_path: Option<PathBuf>,
    pub log_level: Level,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            owner: DEFAULT_OWNER.to_string(),
            min_stake: MIN_STAKE,
            yield_rate: DEFAULT_YIELD_RATE,
            supermajority_percent: SUPERMAJORITY_PERCENT,
            winners_yield_percent: WINNERS_YIELD_PERCENT,
            resolution_window: Duration::hours(RESOLUTION_WINDOW_HOURS),
            snapshot_path: None,
            log_level: Level::INFO,
        }
    }
}

impl EngineConfig {
    pub fn with_owner(owner: &str) -> Self {
        Self { owner: owner.to_string(), ..Self::default() }
    }

    /// Load `.env` (if present) and apply `BET_*` overrides on top of the defaults.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Log level from `BET_LOG_LEVEL` (after loading `.env`), for setting up the subscriber.
    pub fn log_level_from_env() -> Level {
        dotenv::dotenv().ok();
        Self::log_level_from_lookup(|key| std::env::var(key).ok())
    }

    /// `BET_LOG_LEVEL` or `INFO`. Silent, since no subscriber exists yet.
    pub fn log_level_from_lookup<F>(lookup: F) -> Level
    where
        F: Fn(&str) -> Option<String>,
    {
        lookup("BET_LOG_LEVEL")
            .and_then(|raw| Level::from_str(raw.trim()).ok())
            .unwrap_or(Level::INFO)
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(owner) = lookup("BET_OWNER").filter(|o| !o.trim().is_empty()) {
            config.owner = owner.trim().to_string();
        }

        if let Some(raw) = lookup("BET_MIN_STAKE") {
            match Decimal::from_str(raw.trim()).ok().and_then(from_tokens) {
                Some(units) if units > 0 => config.min_stake = units,
                _ => warn!(value = %raw, "ignoring invalid BET_MIN_STAKE"),
            }
        }

        if let Some(rate) = parse_percent(&lookup, "BET_YIELD_RATE") {
            config.yield_rate = rate;
        }
        if let Some(pct) = parse_percent(&lookup, "BET_SUPERMAJORITY_PERCENT") {
            // 50% or less would let both sides qualify at once
            if pct > 50 {
                config.supermajority_percent = pct;
            } else {
                warn!(pct, "supermajority must be above 50%, keeping default");
            }
        }
        if let Some(pct) = parse_percent(&lookup, "BET_WINNERS_YIELD_PERCENT") {
            config.winners_yield_percent = pct;
        }

        if let Some(raw) = lookup("BET_RESOLUTION_WINDOW_HOURS") {
            match raw.trim().parse::<i64>().ok().and_then(Duration::try_hours) {
                Some(window) if window > Duration::zero() => config.resolution_window = window,
                _ => warn!(value = %raw, "ignoring invalid BET_RESOLUTION_WINDOW_HOURS"),
            }
        }

        if let Some(path) = lookup("BET_SNAPSHOT_PATH").filter(|p| !p.trim().is_empty()) {
            config.snapshot_path = Some(PathBuf::from(path.trim()));
        }

        if let Some(raw) = lookup("BET_LOG_LEVEL") {
            match Level::from_str(raw.trim()) {
                Ok(level) => config.log_level = level,
                Err(_) => warn!(value = %raw, "ignoring invalid BET_LOG_LEVEL"),
            }
        }

        config
    }
}

fn parse_percent<F>(lookup: &F, key: &str) -> Option<u32>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<u32>() {
        Ok(pct) if pct <= 100 => Some(pct),
        _ => {
            warn!(key, value = %raw, "ignoring invalid percentage");
            None
        }
    }
}
