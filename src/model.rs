//! Shared data types: posts, chain signals, aggregate snapshots, and the
//! live-feed wire envelope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Categorical label derived from blockchain state.
///
/// The vocabulary is fixed; unknown values never enter the system because the
/// ingestion side writes only these strings. `N/A` is a real value distinct
/// from an absent signal (NULL in storage).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainSignal {
    #[serde(rename = "LOW_GAS")]
    LowGas,
    #[serde(rename = "NORMAL")]
    Normal,
    #[serde(rename = "WHALE_ALERT")]
    WhaleAlert,
    #[serde(rename = "N/A")]
    NotAvailable,
}

impl ChainSignal {
    /// The TEXT representation used in the posts table.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainSignal::LowGas => "LOW_GAS",
            ChainSignal::Normal => "NORMAL",
            ChainSignal::WhaleAlert => "WHALE_ALERT",
            ChainSignal::NotAvailable => "N/A",
        }
    }

    /// Parse the stored TEXT value. Unknown strings map to `None` so a
    /// hand-edited database cannot poison reads.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "LOW_GAS" => Some(ChainSignal::LowGas),
            "NORMAL" => Some(ChainSignal::Normal),
            "WHALE_ALERT" => Some(ChainSignal::WhaleAlert),
            "N/A" => Some(ChainSignal::NotAvailable),
            _ => None,
        }
    }
}

/// One ingested social-media item. Owned by storage; immutable once written
/// except for whole-row replacement keyed by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub subreddit: String,
    pub title: String,
    pub score: i64,
    /// Conventionally in [-1.0, 1.0]; not enforced.
    pub sentiment: f64,
    pub chain_signal: Option<ChainSignal>,
    pub timestamp: DateTime<Utc>,
}

/// Fully recomputed aggregate metrics for one broadcast cycle.
///
/// Derived and ephemeral: every tick recomputes from a single consistent read
/// of the corpus, so percentages always agree with the counts. Counts are
/// signed so validation can catch impossible values coming out of a broken
/// storage backend instead of silently wrapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_posts: i64,
    pub avg_sentiment: f64,
    pub bullish_count: i64,
    pub bearish_count: i64,
    pub whale_alerts: i64,
    pub low_gas_count: i64,
    pub bullish_percentage: f64,
    pub bearish_percentage: f64,
}

impl MetricsSnapshot {
    /// Whether this snapshot may be handed to subscribers.
    ///
    /// Rejects non-finite floats and counts outside [0, total_posts]. A
    /// snapshot failing this check is dropped for the cycle, never sent.
    pub fn is_broadcast_safe(&self) -> bool {
        let counts_ok = |c: i64| (0..=self.total_posts).contains(&c);
        self.total_posts >= 0
            && counts_ok(self.bullish_count)
            && counts_ok(self.bearish_count)
            && counts_ok(self.whale_alerts)
            && counts_ok(self.low_gas_count)
            && self.avg_sentiment.is_finite()
            && self.bullish_percentage.is_finite()
            && self.bullish_percentage >= 0.0
            && self.bearish_percentage.is_finite()
            && self.bearish_percentage >= 0.0
    }
}

/// Payload of a `metrics_update` frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsUpdate {
    pub avg_sentiment: f64,
    pub latest_post: Option<Post>,
    pub generated_at: DateTime<Utc>,
}

/// Tagged envelope pushed over the live feed.
///
/// Serializes as `{"type": "metrics_update", "data": {...}}`. There is no
/// version field; the wire format is frozen to what the dashboard expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum FeedMessage {
    MetricsUpdate(MetricsUpdate),
}

impl FeedMessage {
    pub fn metrics_update(snapshot: &MetricsSnapshot, latest_post: Option<Post>) -> Self {
        FeedMessage::MetricsUpdate(MetricsUpdate {
            avg_sentiment: snapshot.avg_sentiment,
            latest_post,
            generated_at: Utc::now(),
        })
    }
}
