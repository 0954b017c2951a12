//! Synthetic-data generator: fills the configured database with demo posts
//! so the dashboard and the live feed have something to show.
//!
//! Usage: `cargo run --bin seed` (honors ORACLE_DB_PATH and SEED_COUNT).

use anyhow::Result;
use chrono::{Duration, Utc};
use rand::prelude::*;

use quant_oracle::aggregate::round_dp;
use quant_oracle::config::DEFAULT_DB_PATH;
use quant_oracle::model::{ChainSignal, Post};
use quant_oracle::store::PostStore;

const TITLES: &[&str] = &[
    "Ethereum merge complete - bullish outlook",
    "Bitcoin dips below 30k, hodl strong",
    "New L2 solution launches on ETH",
    "SEC announces crypto investigation",
    "Vitalik speaks at conference about scaling",
    "Major exchange lists new altcoin",
    "DeFi protocol hacked for 10M",
    "Institutional investors buying ETH",
    "Gas fees drop to lowest in months",
    "Whale moves 50k BTC to exchange",
    "Community excited about upcoming fork",
    "Staking rewards increase significantly",
    "FUD spreads about regulation",
    "Development team ships major update",
    "Price prediction: ETH to moon",
];

const SIGNALS: &[ChainSignal] = &[
    ChainSignal::LowGas,
    ChainSignal::Normal,
    ChainSignal::WhaleAlert,
    ChainSignal::NotAvailable,
];

const SUBREDDITS: &[&str] = &["ethereum", "bitcoin"];

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let db_path =
        std::env::var("ORACLE_DB_PATH").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string());
    let count: usize = std::env::var("SEED_COUNT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(TITLES.len());

    let store = PostStore::open(&db_path)?;
    let mut rng = rand::rng();
    let now = Utc::now();

    for i in 0..count {
        let post = Post {
            id: format!("test_{i}"),
            subreddit: SUBREDDITS.choose(&mut rng).copied().unwrap_or("ethereum").to_string(),
            title: TITLES[i % TITLES.len()].to_string(),
            score: rng.random_range(10..=500),
            sentiment: round_dp(rng.random_range(-0.8..0.9), 4),
            chain_signal: SIGNALS.choose(&mut rng).copied(),
            timestamp: now - Duration::hours(i as i64),
        };
        store.upsert(&post)?;
    }

    println!("Seeded {count} posts into {db_path}");
    Ok(())
}
