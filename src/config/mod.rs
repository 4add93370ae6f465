//! Service configuration read from the environment.

use std::net::SocketAddr;
use std::time::Duration;

const DEFAULT_PRIMARY_URL: &str = "postgres://postgres@localhost:5432/tarl";
const DEFAULT_ADDR: &str = "127.0.0.1:8090";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
    #[error("validation error: {0}")]
    Validation(String),
}

/// Connection settings for one side of the replication pair.
#[derive(Debug, Clone)]
pub struct DatabaseCfg {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct SyncCfg {
    pub batch_size: usize,
    /// `None` disables the periodic full sync.
    pub interval: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub primary: DatabaseCfg,
    pub secondary: DatabaseCfg,
    pub sync: SyncCfg,
    pub addr: SocketAddr,
    pub run_migrations: bool,
}

impl Config {
    /// Load from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let primary_url = get("TARL_PRIMARY_URL").unwrap_or_else(|| DEFAULT_PRIMARY_URL.to_string());
        let secondary_url = get("TARL_SECONDARY_URL").ok_or(ConfigError::Missing("TARL_SECONDARY_URL"))?;

        let max_connections: u32 = parse_or(get("TARL_MAX_CONNECTIONS"), "TARL_MAX_CONNECTIONS", 10)?;
        let timeout_secs: u64 = parse_or(get("TARL_CONNECT_TIMEOUT_SECS"), "TARL_CONNECT_TIMEOUT_SECS", 5)?;
        let batch_size: usize = parse_or(get("TARL_SYNC_BATCH_SIZE"), "TARL_SYNC_BATCH_SIZE", 100)?;
        let interval_secs: u64 = parse_or(get("TARL_SYNC_INTERVAL_SECS"), "TARL_SYNC_INTERVAL_SECS", 0)?;
        let run_migrations: bool = parse_or(get("TARL_RUN_MIGRATIONS"), "TARL_RUN_MIGRATIONS", true)?;

        let addr_raw = get("TARL_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let addr: SocketAddr = addr_raw.parse().map_err(|_| ConfigError::Invalid {
            key: "TARL_ADDR",
            value: addr_raw.clone(),
        })?;

        let acquire_timeout = Duration::from_secs(timeout_secs);
        let cfg = Config {
            primary: DatabaseCfg {
                url: primary_url,
                max_connections,
                acquire_timeout,
            },
            secondary: DatabaseCfg {
                url: secondary_url,
                max_connections,
                acquire_timeout,
            },
            sync: SyncCfg {
                batch_size,
                interval: (interval_secs > 0).then(|| Duration::from_secs(interval_secs)),
            },
            addr,
            run_migrations,
        };
        validate(&cfg)?;
        Ok(cfg)
    }
}

fn parse_or<T: std::str::FromStr>(
    raw: Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(v) => v.parse().map_err(|_| ConfigError::Invalid { key, value: v }),
    }
}

fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.primary.url == cfg.secondary.url {
        return Err(ConfigError::Validation(
            "primary and secondary must point at different databases".into(),
        ));
    }
    if cfg.sync.batch_size == 0 {
        return Err(ConfigError::Validation("TARL_SYNC_BATCH_SIZE must be at least 1".into()));
    }
    if cfg.primary.max_connections == 0 {
        return Err(ConfigError::Validation("TARL_MAX_CONNECTIONS must be at least 1".into()));
    }
    Ok(())
}
