//! SQLite persistence for the post corpus, plus the read-only contract the
//! live-feed core consumes.
//!
//! The feed subsystem never talks to `rusqlite` directly; it sees only
//! [`MetricsSource`]. That seam is what lets tests inject storage failures
//! and malformed aggregates without a database.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aggregate::{round_dp, BEARISH_THRESHOLD, BULLISH_THRESHOLD};
use crate::model::{ChainSignal, Post};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),
    /// The storage backend cannot serve reads right now. Produced by test
    /// fakes and by future remote backends; the sweep treats it as a
    /// skip-this-cycle condition.
    #[error("storage unavailable")]
    Unavailable,
}

/// Read contract consumed by the aggregation engine and broadcast scheduler.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    async fn count_all(&self) -> Result<i64, StoreError>;
    /// `None` when the corpus is empty.
    async fn avg_sentiment(&self) -> Result<Option<f64>, StoreError>;
    async fn count_bullish(&self) -> Result<i64, StoreError>;
    async fn count_bearish(&self) -> Result<i64, StoreError>;
    async fn count_signal(&self, signal: ChainSignal) -> Result<i64, StoreError>;
    async fn most_recent(&self) -> Result<Option<Post>, StoreError>;
}

/// Listing parameters for `/api/posts`.
#[derive(Debug, Clone, Copy)]
pub struct PostFilter {
    pub limit: i64,
    pub offset: i64,
    pub min_sentiment: Option<f64>,
}

impl Default for PostFilter {
    fn default() -> Self {
        Self {
            limit: 100,
            offset: 0,
            min_sentiment: None,
        }
    }
}

/// One row of the sentiment timeline (most recent first).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub sentiment: f64,
    pub chain_signal: Option<ChainSignal>,
    pub title: String,
    pub subreddit: String,
}

/// Per-subreddit aggregate row, sentiment figures rounded to 4 dp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubredditStats {
    pub subreddit: String,
    pub post_count: i64,
    pub avg_sentiment: f64,
    pub max_sentiment: f64,
    pub min_sentiment: f64,
}

/// One bucket of the chain-signal distribution. `None` groups the rows with
/// no signal at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalCount {
    pub chain_signal: Option<ChainSignal>,
    pub count: i64,
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS posts (
    id TEXT PRIMARY KEY,
    subreddit TEXT,
    title TEXT,
    score INTEGER,
    sentiment REAL,
    chain_signal TEXT,
    timestamp DATETIME DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_sentiment ON posts(sentiment);
";

/// Post corpus backed by SQLite. All queries are short single-statement
/// reads; the connection mutex is never held across an await point.
pub struct PostStore {
    conn: Mutex<Connection>,
}

impl PostStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::with_connection(conn)
    }

    /// Fresh private database, used by tests and demos.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("post store mutex poisoned")
    }

    /// Insert or replace a post keyed by id.
    pub fn upsert(&self, post: &Post) -> Result<(), StoreError> {
        self.conn().execute(
            "INSERT OR REPLACE INTO posts (id, subreddit, title, score, sentiment, chain_signal, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                post.id,
                post.subreddit,
                post.title,
                post.score,
                post.sentiment,
                post.chain_signal.map(|s| s.as_str()),
                post.timestamp,
            ],
        )?;
        Ok(())
    }

    pub fn list(&self, filter: PostFilter) -> Result<Vec<Post>, StoreError> {
        let conn = self.conn();
        let mut out = Vec::new();
        match filter.min_sentiment {
            Some(min) => {
                let mut stmt = conn.prepare(
                    "SELECT id, subreddit, title, score, sentiment, chain_signal, timestamp
                     FROM posts WHERE sentiment >= ?1
                     ORDER BY timestamp DESC LIMIT ?2 OFFSET ?3",
                )?;
                let rows = stmt.query_map(params![min, filter.limit, filter.offset], post_from_row)?;
                for row in rows {
                    out.push(row?);
                }
            }
            None => {
                let mut stmt = conn.prepare(
                    "SELECT id, subreddit, title, score, sentiment, chain_signal, timestamp
                     FROM posts ORDER BY timestamp DESC LIMIT ?1 OFFSET ?2",
                )?;
                let rows = stmt.query_map(params![filter.limit, filter.offset], post_from_row)?;
                for row in rows {
                    out.push(row?);
                }
            }
        }
        Ok(out)
    }

    pub fn timeline(&self, limit: i64) -> Result<Vec<TimelineEntry>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT timestamp, sentiment, chain_signal, title, subreddit
             FROM posts ORDER BY timestamp DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            Ok(TimelineEntry {
                timestamp: row.get(0)?,
                sentiment: row.get(1)?,
                chain_signal: signal_from_column(row, 2)?,
                title: row.get(3)?,
                subreddit: row.get(4)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn subreddit_stats(&self) -> Result<Vec<SubredditStats>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT subreddit, COUNT(*), AVG(sentiment), MAX(sentiment), MIN(sentiment)
             FROM posts GROUP BY subreddit ORDER BY COUNT(*) DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(SubredditStats {
                subreddit: row.get(0)?,
                post_count: row.get(1)?,
                avg_sentiment: round_dp(row.get(2)?, 4),
                max_sentiment: round_dp(row.get(3)?, 4),
                min_sentiment: round_dp(row.get(4)?, 4),
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn signal_distribution(&self) -> Result<Vec<SignalCount>, StoreError> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT chain_signal, COUNT(*) FROM posts GROUP BY chain_signal")?;
        let rows = stmt.query_map([], |row| {
            Ok(SignalCount {
                chain_signal: signal_from_column(row, 0)?,
                count: row.get(1)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    fn count_where(&self, sql: &str) -> Result<i64, StoreError> {
        let n = self.conn().query_row(sql, [], |row| row.get(0))?;
        Ok(n)
    }
}

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        subreddit: row.get(1)?,
        title: row.get(2)?,
        score: row.get(3)?,
        sentiment: row.get(4)?,
        chain_signal: signal_from_column(row, 5)?,
        timestamp: row.get(6)?,
    })
}

fn signal_from_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<ChainSignal>> {
    let raw: Option<String> = row.get(idx)?;
    Ok(raw.as_deref().and_then(ChainSignal::parse))
}

#[async_trait]
impl MetricsSource for PostStore {
    async fn count_all(&self) -> Result<i64, StoreError> {
        self.count_where("SELECT COUNT(*) FROM posts")
    }

    async fn avg_sentiment(&self) -> Result<Option<f64>, StoreError> {
        let avg = self
            .conn()
            .query_row("SELECT AVG(sentiment) FROM posts", [], |row| row.get(0))?;
        Ok(avg)
    }

    async fn count_bullish(&self) -> Result<i64, StoreError> {
        let n = self.conn().query_row(
            "SELECT COUNT(*) FROM posts WHERE sentiment > ?1",
            params![BULLISH_THRESHOLD],
            |row| row.get(0),
        )?;
        Ok(n)
    }

    async fn count_bearish(&self) -> Result<i64, StoreError> {
        let n = self.conn().query_row(
            "SELECT COUNT(*) FROM posts WHERE sentiment < ?1",
            params![BEARISH_THRESHOLD],
            |row| row.get(0),
        )?;
        Ok(n)
    }

    async fn count_signal(&self, signal: ChainSignal) -> Result<i64, StoreError> {
        let n = self.conn().query_row(
            "SELECT COUNT(*) FROM posts WHERE chain_signal = ?1",
            params![signal.as_str()],
            |row| row.get(0),
        )?;
        Ok(n)
    }

    async fn most_recent(&self) -> Result<Option<Post>, StoreError> {
        let post = self
            .conn()
            .query_row(
                "SELECT id, subreddit, title, score, sentiment, chain_signal, timestamp
                 FROM posts ORDER BY timestamp DESC LIMIT 1",
                [],
                post_from_row,
            )
            .optional()?;
        Ok(post)
    }
}
