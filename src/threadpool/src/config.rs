use std::env;
use std::time::Duration;

use crate::error::{PoolError, Result};
use crate::queue::POP_TIMEOUT;

pub const WORKERS_ENV: &str = "THREADPOOL_WORKERS";
pub const POP_TIMEOUT_ENV: &str = "THREADPOOL_POP_TIMEOUT_MS";
pub const THREAD_NAME_ENV: &str = "THREADPOOL_THREAD_NAME";

const DEFAULT_THREAD_NAME: &str = "threadpool-worker";

/// Worker count reported by the host, or 2 when it reports nothing.
pub fn default_workers() -> usize {
    match num_cpus::get() {
        0 => 2,
        n => n,
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub workers: usize,
    /// How long an idle worker blocks before re-checking for shutdown.
    pub pop_timeout: Duration,
    /// Worker threads are named `{thread_name}-{index}`.
    pub thread_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            pop_timeout: POP_TIMEOUT,
            thread_name: DEFAULT_THREAD_NAME.to_string(),
        }
    }
}

impl Config {
    /// Defaults overridden by `THREADPOOL_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(raw) = lookup(WORKERS_ENV) {
            cfg.workers = parse_env(WORKERS_ENV, &raw)?;
        }
        if let Some(raw) = lookup(POP_TIMEOUT_ENV) {
            cfg.pop_timeout = Duration::from_millis(parse_env(POP_TIMEOUT_ENV, &raw)?);
        }
        if let Some(name) = lookup(THREAD_NAME_ENV) {
            cfg.thread_name = name;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(PoolError::InvalidConfig(
                "workers must be at least 1".to_string(),
            ));
        }
        if self.pop_timeout == Duration::from_secs(0) {
            return Err(PoolError::InvalidConfig(
                "pop timeout must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| PoolError::InvalidConfig(format!("{key}={raw:?} is not a valid number")))
}
