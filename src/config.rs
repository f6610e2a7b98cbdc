//! Process-wide configuration, read once at startup.
//!
//! Values come from the environment (after `.env` is loaded by `dotenvy`):
//!
//! | key | default |
//! |-----|---------|
//! | `GTFS_RT_FEED_URL` (or `VEHICLE_POSITIONS_ENDPOINT`) | required |
//! | `GTFS_RT_POLL_INTERVAL_SECS` | `60` |
//! | `GTFS_RT_USER_AGENT` | [`BROWSER_USER_AGENT`] |
//! | `GTFS_RT_SINK` | `stdout` |
//! | `GTFS_RT_API_KEY_HEADER` / `GTFS_RT_API_KEY` | unset |
//! | `GTFS_RT_TIMEOUT_SECS` | unset |

use anyhow::{Context, Result, anyhow, bail};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::fetch::BROWSER_USER_AGENT;

pub const FEED_URL: &str = "GTFS_RT_FEED_URL";
pub const LEGACY_FEED_URL: &str = "VEHICLE_POSITIONS_ENDPOINT";
pub const POLL_INTERVAL_SECS: &str = "GTFS_RT_POLL_INTERVAL_SECS";
pub const USER_AGENT: &str = "GTFS_RT_USER_AGENT";
pub const SINK: &str = "GTFS_RT_SINK";
pub const API_KEY_HEADER: &str = "GTFS_RT_API_KEY_HEADER";
pub const API_KEY: &str = "GTFS_RT_API_KEY";
pub const TIMEOUT_SECS: &str = "GTFS_RT_TIMEOUT_SECS";

const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// Where serialized documents are delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkTarget {
    Stdout,
    /// Append to a local file.
    File(PathBuf),
    /// POST to an HTTP endpoint.
    Webhook(String),
}

impl FromStr for SinkTarget {
    type Err = anyhow::Error;

    /// Accepts `stdout`, `file:<path>` or an `http(s)://` URL.
    fn from_str(s: &str) -> Result<Self> {
        if s == "stdout" || s == "-" {
            return Ok(SinkTarget::Stdout);
        }
        if let Some(path) = s.strip_prefix("file:") {
            if path.is_empty() {
                bail!("sink 'file:' needs a path");
            }
            return Ok(SinkTarget::File(PathBuf::from(path)));
        }
        if s.starts_with("http://") || s.starts_with("https://") {
            return Ok(SinkTarget::Webhook(s.to_string()));
        }
        Err(anyhow!(
            "unrecognized sink '{s}', expected 'stdout', 'file:<path>' or an http(s) URL"
        ))
    }
}

/// An extra header carrying a feed provider's API key.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKeyHeader {
    pub header: String,
    pub key: String,
}

impl std::fmt::Debug for ApiKeyHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyHeader")
            .field("header", &self.header)
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Immutable settings handed to the poller and the scheduler.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub feed_url: String,
    pub poll_interval: Duration,
    pub user_agent: String,
    pub sink: SinkTarget,
    pub api_key: Option<ApiKeyHeader>,
    pub timeout: Option<Duration>,
}

impl Config {
    /// Reads the configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. Empty values count as
    /// unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let feed_url = get(FEED_URL)
            .or_else(|| get(LEGACY_FEED_URL))
            .ok_or_else(|| anyhow!("{FEED_URL} must be set to the feed endpoint URL"))?;

        let poll_interval_secs = match get(POLL_INTERVAL_SECS) {
            Some(raw) => parse_secs(POLL_INTERVAL_SECS, &raw)?,
            None => DEFAULT_POLL_INTERVAL_SECS,
        };
        if poll_interval_secs == 0 {
            bail!("{POLL_INTERVAL_SECS} must be greater than zero");
        }

        let timeout = match get(TIMEOUT_SECS) {
            Some(raw) => Some(Duration::from_secs(parse_secs(TIMEOUT_SECS, &raw)?)),
            None => None,
        };

        let sink = match get(SINK) {
            Some(raw) => raw
                .parse::<SinkTarget>()
                .with_context(|| format!("invalid {SINK}"))?,
            None => SinkTarget::Stdout,
        };

        let api_key = match (get(API_KEY_HEADER), get(API_KEY)) {
            (Some(header), Some(key)) => Some(ApiKeyHeader { header, key }),
            (None, None) => None,
            _ => bail!("{API_KEY_HEADER} and {API_KEY} must be set together"),
        };

        Ok(Self {
            feed_url,
            poll_interval: Duration::from_secs(poll_interval_secs),
            user_agent: get(USER_AGENT).unwrap_or_else(|| BROWSER_USER_AGENT.to_string()),
            sink,
            api_key,
            timeout,
        })
    }
}

fn parse_secs(key: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse()
        .with_context(|| format!("{key} must be a whole number of seconds, got '{raw}'"))
}
