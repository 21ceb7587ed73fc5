// src/config.rs

use anyhow::{Context, Result};
use std::{env, path::PathBuf, str::FromStr, time::Duration};

pub const DEFAULT_POSTS_SOURCE: &str =
    "https://raw.githubusercontent.com/khan1792/data_viz_final/main/lemm_data1.csv.gz";
pub const DEFAULT_EMBEDDING_SOURCE: &str =
    "https://raw.githubusercontent.com/khan1792/data_viz_final/main/lowdimensionresult.csv";

/// Runtime configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub posts_source: String,
    pub embedding_source: String,
    /// Where parquet snapshots of the parsed datasets live. `None` disables them.
    pub snapshot_dir: Option<PathBuf>,
    pub fetch: FetchConfig,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
            timeout: Duration::from_secs(60),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Unset or blank keys take
    /// their defaults; malformed numbers are an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let defaults = FetchConfig::default();
        let max_retries = parse_or(&get, "VAXDASH_FETCH_RETRIES", defaults.max_retries)?;
        let backoff_ms = parse_or(
            &get,
            "VAXDASH_FETCH_BACKOFF_MS",
            defaults.initial_backoff.as_millis() as u64,
        )?;
        let timeout_secs = parse_or(
            &get,
            "VAXDASH_FETCH_TIMEOUT_SECS",
            defaults.timeout.as_secs(),
        )?;

        Ok(Self {
            posts_source: get("VAXDASH_POSTS_SOURCE")
                .unwrap_or_else(|| DEFAULT_POSTS_SOURCE.to_string()),
            embedding_source: get("VAXDASH_EMBEDDING_SOURCE")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_SOURCE.to_string()),
            snapshot_dir: get("VAXDASH_SNAPSHOT_DIR").map(PathBuf::from),
            fetch: FetchConfig {
                max_retries,
                initial_backoff: Duration::from_millis(backoff_ms),
                timeout: Duration::from_secs(timeout_secs),
            },
            port: parse_or(&get, "PORT", 8080)?,
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("parsing {}={:?}", key, raw)),
        None => Ok(default),
    }
}
