use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::processor::{ProcessorOptions, RetryPolicy};

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. Without it the queue lives in memory.
    pub database_url: Option<String>,
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub batch_size: usize,
    pub concurrency: usize,
    pub poster_timeout_secs: u64,
    /// 0 disables the in-process scheduler.
    pub poll_interval_secs: u64,
    pub worker_threads: usize,
    pub default_max_retries: i32,
    pub retry_base_secs: u64,
    pub retry_max_secs: u64,
    pub platforms: Vec<PlatformConfig>,
}

/// An HTTP marketplace bridge, from `CROSSPOST_PLATFORMS`.
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformConfig {
    pub key: String,
    pub url: String,
    pub token: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty());

        let host: IpAddr = env_parse("CROSSPOST_HOST", "0.0.0.0")?;
        let port: u16 = env_parse("CROSSPOST_PORT", "3000")?;
        let log_level = env_or("CROSSPOST_LOG_LEVEL", "info");

        let batch_size: usize = env_parse("CROSSPOST_BATCH_SIZE", "25")?;
        let concurrency: usize = env_parse("CROSSPOST_CONCURRENCY", "4")?;
        if concurrency == 0 {
            return Err("Invalid CROSSPOST_CONCURRENCY: must be at least 1".to_string());
        }
        let poster_timeout_secs: u64 = env_parse("CROSSPOST_POSTER_TIMEOUT_SECS", "30")?;
        let poll_interval_secs: u64 = env_parse("CROSSPOST_POLL_INTERVAL_SECS", "10")?;
        let worker_threads: usize = env_parse("CROSSPOST_WORKER_THREADS", "2")?;

        let default_max_retries: i32 = env_parse("CROSSPOST_DEFAULT_MAX_RETRIES", "3")?;
        if default_max_retries < 0 {
            return Err("Invalid CROSSPOST_DEFAULT_MAX_RETRIES: must not be negative".to_string());
        }
        let retry_base_secs: u64 = env_parse("CROSSPOST_RETRY_BASE_SECS", "2")?;
        let retry_max_secs: u64 = env_parse("CROSSPOST_RETRY_MAX_SECS", "600")?;

        let platforms = parse_platforms(&env_or("CROSSPOST_PLATFORMS", ""), |key| {
            let var = format!("CROSSPOST_{}_TOKEN", key.to_uppercase().replace('-', "_"));
            std::env::var(var).ok().filter(|s| !s.is_empty())
        })?;

        Ok(Config {
            database_url,
            host,
            port,
            log_level,
            batch_size,
            concurrency,
            poster_timeout_secs,
            poll_interval_secs,
            worker_threads,
            default_max_retries,
            retry_base_secs,
            retry_max_secs,
            platforms,
        })
    }

    pub fn processor_options(&self) -> ProcessorOptions {
        ProcessorOptions {
            concurrency: self.concurrency,
            poster_timeout: Duration::from_secs(self.poster_timeout_secs),
            retry_policy: RetryPolicy {
                base_delay: Duration::from_secs(self.retry_base_secs),
                max_delay: Duration::from_secs(self.retry_max_secs),
                ..RetryPolicy::default()
            },
        }
    }
}

/// Parse `ebay=https://...,mercari=https://...` into bridge configs.
pub fn parse_platforms(
    raw: &str,
    token_for: impl Fn(&str) -> Option<String>,
) -> Result<Vec<PlatformConfig>, String> {
    raw.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|entry| {
            let (key, url) = entry
                .trim()
                .split_once('=')
                .ok_or_else(|| {
                    format!("Invalid CROSSPOST_PLATFORMS entry '{entry}': expected key=url")
                })?;
            let key = key.trim().to_lowercase();
            let url = url.trim().to_string();
            if key.is_empty() || url.is_empty() {
                return Err(format!(
                    "Invalid CROSSPOST_PLATFORMS entry '{entry}': empty key or url"
                ));
            }
            let token = token_for(&key);
            Ok(PlatformConfig { key, url, token })
        })
        .collect()
}

fn env_parse<T>(key: &str, default: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_or(key, default)
        .parse()
        .map_err(|e| format!("Invalid {key}: {e}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
