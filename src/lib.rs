// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod aggregate;
pub mod api;
pub mod config;
pub mod feed;
pub mod metrics;
pub mod model;
pub mod registry;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::feed::FeedBroadcaster;
pub use crate::model::{ChainSignal, FeedMessage, MetricsSnapshot, Post};
pub use crate::registry::{SubscriberId, SubscriberRegistry};
pub use crate::store::{MetricsSource, PostStore, StoreError};
