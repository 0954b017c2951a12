//! Aggregation engine: turns the raw corpus reads into one
//! [`MetricsSnapshot`] per broadcast cycle.

use crate::model::MetricsSnapshot;
use crate::store::{MetricsSource, StoreError};

/// Strictly above this counts as bullish.
pub const BULLISH_THRESHOLD: f64 = 0.5;
/// Strictly below this counts as bearish.
pub const BEARISH_THRESHOLD: f64 = -0.5;

/// Round to `dp` decimal places. Applied once at the snapshot boundary so
/// rounding error never compounds across cycles.
pub fn round_dp(value: f64, dp: u32) -> f64 {
    let factor = 10f64.powi(dp as i32);
    (value * factor).round() / factor
}

/// Recompute the full summary statistics from the current corpus state.
///
/// Pure with respect to the source: no state is carried between invocations.
/// An empty corpus yields the all-zero snapshot rather than dividing by zero.
pub async fn compute(source: &dyn MetricsSource) -> Result<MetricsSnapshot, StoreError> {
    let total = source.count_all().await?;
    if total <= 0 {
        return Ok(MetricsSnapshot::default());
    }

    let avg = source.avg_sentiment().await?.unwrap_or(0.0);
    let bullish = source.count_bullish().await?;
    let bearish = source.count_bearish().await?;
    let whale_alerts = source
        .count_signal(crate::model::ChainSignal::WhaleAlert)
        .await?;
    let low_gas = source
        .count_signal(crate::model::ChainSignal::LowGas)
        .await?;

    Ok(MetricsSnapshot {
        total_posts: total,
        avg_sentiment: round_dp(avg, 4),
        bullish_count: bullish,
        bearish_count: bearish,
        whale_alerts,
        low_gas_count: low_gas,
        bullish_percentage: round_dp(bullish as f64 / total as f64 * 100.0, 2),
        bearish_percentage: round_dp(bearish as f64 / total as f64 * 100.0, 2),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding_is_half_away_from_zero() {
        assert_eq!(round_dp(0.17499, 4), 0.175);
        assert_eq!(round_dp(33.333333, 2), 33.33);
        assert_eq!(round_dp(-0.98765, 2), -0.99);
    }
}
