//! Broadcast scheduler: the periodic driver that recomputes aggregate
//! metrics and fans them out to every registered subscriber.
//!
//! One driver runs per process. Each tick is one sweep: compute a snapshot,
//! pair it with the most recent post, serialize the envelope once, deliver
//! to the registry membership as of the start of the sweep. No failure in a
//! sweep stops the loop; the only exit is the shutdown signal.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::aggregate;
use crate::model::FeedMessage;
use crate::registry::SubscriberRegistry;
use crate::store::{MetricsSource, StoreError};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

/// Outcome of one sweep, mainly for tests and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub delivered: usize,
    pub dropped: usize,
}

pub struct FeedBroadcaster {
    source: Arc<dyn MetricsSource>,
    registry: Arc<SubscriberRegistry>,
    interval: Duration,
}

impl FeedBroadcaster {
    pub fn new(
        source: Arc<dyn MetricsSource>,
        registry: Arc<SubscriberRegistry>,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            registry,
            interval,
        }
    }

    /// Run one compute-and-broadcast cycle.
    ///
    /// Storage errors abort the cycle before any delivery; a snapshot that
    /// fails validation is dropped the same way. Per-subscriber delivery
    /// failure unregisters that subscriber and the sweep moves on.
    pub async fn sweep(&self) -> Result<SweepReport, StoreError> {
        let snapshot = aggregate::compute(self.source.as_ref()).await?;
        let latest = self.source.most_recent().await?;

        if !snapshot.is_broadcast_safe() {
            warn!(?snapshot, "malformed snapshot, skipping broadcast");
            return Ok(SweepReport {
                delivered: 0,
                dropped: 0,
            });
        }

        let envelope = FeedMessage::metrics_update(&snapshot, latest);
        let payload = match serde_json::to_string(&envelope) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "envelope serialization failed, skipping broadcast");
                return Ok(SweepReport {
                    delivered: 0,
                    dropped: 0,
                });
            }
        };

        let mut delivered = 0usize;
        let mut dropped = 0usize;
        for (id, queue) in self.registry.snapshot() {
            if queue.send(payload.clone()).is_ok() {
                delivered += 1;
            } else {
                // Receiver gone: the socket task ended. Drop the membership.
                debug!(subscriber = %id, "delivery failed, unregistering");
                counter!("feed_delivery_failures_total").increment(1);
                self.registry.unregister(id);
                dropped += 1;
            }
        }
        Ok(SweepReport { delivered, dropped })
    }

    /// Spawn the periodic loop. Runs until `shutdown` observes `true`.
    pub fn spawn(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            // The first tick of `interval` completes immediately; consume it
            // so the first broadcast waits a full interval like every other.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        counter!("feed_sweeps_total").increment(1);
                        match self.sweep().await {
                            Ok(report) => {
                                debug!(
                                    delivered = report.delivered,
                                    dropped = report.dropped,
                                    "feed sweep"
                                );
                            }
                            Err(e) => {
                                counter!("feed_sweeps_failed_total").increment(1);
                                warn!(error = %e, "feed sweep skipped");
                            }
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            debug!("feed scheduler stopping");
                            break;
                        }
                    }
                }
            }
        })
    }
}
