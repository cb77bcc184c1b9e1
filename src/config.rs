use std::str::FromStr;
use std::time::Duration;

use crate::api::BybitClient;
use crate::services::broadcast_service::DEFAULT_MAX_CONCURRENT;
use crate::services::price_service::{NOTIFY_INTERVAL, REFRESH_INTERVAL};
use crate::utils::errors::ServiceError;

/// Runtime settings read from the environment (and `.env`)
#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub database_url: String,
    pub quote_api_url: String,
    pub cache_ttl: Duration,
    pub refresh_interval: Duration,
    pub notify_interval: Duration,
    pub broadcast_concurrency: usize,
    pub command_workers: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ServiceError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ServiceError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let required = |key: &str| {
            get(key).ok_or_else(|| ServiceError::Config(format!("{} not set", key)))
        };

        let number = |key: &str, default: u64| -> Result<u64, ServiceError> {
            match get(key) {
                Some(raw) => parse_number(key, &raw),
                None => Ok(default),
            }
        };

        let config = Config {
            discord_token: required("DISCORD_TOKEN")?,
            database_url: required("DATABASE_URL")?,
            quote_api_url: get("QUOTE_API_URL")
                .unwrap_or_else(|| BybitClient::DEFAULT_BASE_URL.to_string()),
            cache_ttl: Duration::from_secs(number("CACHE_TTL_SECS", 60)?),
            refresh_interval: Duration::from_secs(number("REFRESH_INTERVAL_SECS", REFRESH_INTERVAL.as_secs())?),
            notify_interval: Duration::from_secs(number("NOTIFY_INTERVAL_SECS", NOTIFY_INTERVAL.as_secs())?),
            broadcast_concurrency: number("BROADCAST_CONCURRENCY", DEFAULT_MAX_CONCURRENT as u64)?
                as usize,
            command_workers: number("COMMAND_WORKERS", 16)? as usize,
        };

        if config.refresh_interval.is_zero() || config.notify_interval.is_zero() {
            return Err(ServiceError::Config("intervals must be greater than zero".to_string()));
        }
        if config.broadcast_concurrency == 0 || config.command_workers == 0 {
            return Err(ServiceError::Config("concurrency limits must be greater than zero".to_string()));
        }

        Ok(config)
    }
}

fn parse_number<T: FromStr>(key: &str, raw: &str) -> Result<T, ServiceError> {
    raw.trim()
        .parse()
        .map_err(|_| ServiceError::Config(format!("{} must be a number, got '{}'", key, raw)))
}
