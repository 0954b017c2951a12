//! Env-driven service configuration.
//!
//! Everything has a workable default so `cargo run` starts a local instance
//! with no setup; `.env` is honored via dotenvy in the entrypoint.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

const ENV_BIND: &str = "ORACLE_BIND";
const ENV_DB_PATH: &str = "ORACLE_DB_PATH";
const ENV_FEED_INTERVAL: &str = "ORACLE_FEED_INTERVAL_SECS";

pub const DEFAULT_DB_PATH: &str = "oracle_data.db";

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub db_path: PathBuf,
    pub feed_interval: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let bind_addr = match std::env::var(ENV_BIND) {
            Ok(v) => v
                .parse()
                .with_context(|| format!("{ENV_BIND}={v} is not a socket address"))?,
            Err(_) => SocketAddr::from(([0, 0, 0, 0], 8000)),
        };

        let db_path = std::env::var(ENV_DB_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DB_PATH));

        let feed_interval = match std::env::var(ENV_FEED_INTERVAL) {
            Ok(v) => {
                let secs: u64 = v
                    .parse()
                    .with_context(|| format!("{ENV_FEED_INTERVAL}={v} is not a number"))?;
                Duration::from_secs(secs.max(1))
            }
            Err(_) => crate::feed::DEFAULT_INTERVAL,
        };

        Ok(Self {
            bind_addr,
            db_path,
            feed_interval,
        })
    }
}
