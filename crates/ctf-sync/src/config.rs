use anyhow::{bail, Context, Result};
use chrono::TimeDelta;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_CTFTIME_API_URL: &str = "https://ctftime.org/api/v1/events";
pub const DEFAULT_DISCORD_API_URL: &str = "https://discord.com/api/v10";

/// Everything a sync run needs, read once at startup.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Discord bot token. Required.
    pub bot_token: String,
    /// Discord guild id. Required.
    pub guild_id: String,
    /// Archive channels and categories this long after an event finished
    pub archive_after: TimeDelta,
    /// Marker prepended to archived category names
    pub archive_prefix: String,
    /// Number of events to fetch from the catalog
    pub ctftime_limit: u32,
    /// Minimum catalog weight
    pub min_weight: f64,
    /// Start the catalog window this long before now
    pub lookback: TimeDelta,
    /// Only create categories for calendar entries somebody is interested in
    pub require_interest: bool,
    /// Create missing default channels in categories that already exist
    pub repair_channels: bool,
    /// Repeat sync cycles on this interval instead of running once
    pub poll_interval: Option<Duration>,
    pub ctftime_api_url: String,
    pub discord_api_url: String,
}

impl SyncConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let poll_interval = match get("MATEMANN_POLL_INTERVAL_SECS") {
            Some(raw) => {
                let secs: u64 = raw
                    .trim()
                    .parse()
                    .context("MATEMANN_POLL_INTERVAL_SECS must be a valid number")?;
                if secs == 0 {
                    bail!("MATEMANN_POLL_INTERVAL_SECS must be greater than zero");
                }
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Self {
            bot_token: get("MATEMANN_BOT_TOKEN").context("MATEMANN_BOT_TOKEN must be set")?,
            guild_id: get("MATEMANN_GUILD_ID").context("MATEMANN_GUILD_ID must be set")?,
            archive_after: parse_days(&get, "MATEMANN_CHANNEL_ARCHIVE_AFTER")?,
            archive_prefix: get("MATEMANN_CHANNEL_ARCHIVE_PREFIX")
                .unwrap_or_else(|| "ZZZ_".to_string()),
            ctftime_limit: parse_or(&get, "MATEMANN_CTFTIME_LIMIT", 15)?,
            min_weight: parse_or(&get, "MATEMANN_MIN_WEIGHT", 0.0)?,
            lookback: parse_days(&get, "MATEMANN_LOOKBACK_DAYS")?,
            require_interest: parse_flag(&get, "MATEMANN_REQUIRE_INTEREST", true)?,
            repair_channels: parse_flag(&get, "MATEMANN_REPAIR_CHANNELS", false)?,
            poll_interval,
            ctftime_api_url: get("MATEMANN_CTFTIME_API_URL")
                .unwrap_or_else(|| DEFAULT_CTFTIME_API_URL.to_string()),
            discord_api_url: get("MATEMANN_DISCORD_API_URL")
                .unwrap_or_else(|| DEFAULT_DISCORD_API_URL.to_string()),
        })
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a valid number, got {:?}", key, raw)),
        None => Ok(default),
    }
}

/// Whole days, defaulting to zero. Rejected at startup if chrono cannot
/// represent the span.
fn parse_days<G>(get: &G, key: &str) -> Result<TimeDelta>
where
    G: Fn(&str) -> Option<String>,
{
    let days: i64 = parse_or(get, key, 0)?;
    match TimeDelta::try_days(days) {
        Some(span) => Ok(span),
        None => bail!("{} is out of range, got {} days", key, days),
    }
}

fn parse_flag<G>(get: &G, key: &str, default: bool) -> Result<bool>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => bail!("{} must be a boolean, got {:?}", key, v),
        },
    }
}
