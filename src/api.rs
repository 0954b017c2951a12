//! HTTP and websocket surface.
//!
//! The request-response endpoints are thin pass-throughs over [`PostStore`];
//! `/ws` is the transport boundary of the live feed: it registers the socket
//! with the [`SubscriberRegistry`] before any broadcast can target it and
//! unregisters on close or send error.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tracing::{debug, error};

use crate::model::Post;
use crate::registry::SubscriberRegistry;
use crate::store::{PostFilter, PostStore, SignalCount, StoreError, SubredditStats, TimelineEntry};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<PostStore>,
    pub registry: Arc<SubscriberRegistry>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(|| async { "ok" }))
        .route("/api/posts", get(get_posts))
        .route("/api/metrics", get(get_metrics))
        .route("/api/sentiment-timeline", get(get_timeline))
        .route("/api/subreddit-stats", get(get_subreddit_stats))
        .route("/api/signal-distribution", get(get_signal_distribution))
        .route("/ws", get(ws_feed))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Storage failures map to a terse 500; details go to the log, not the wire.
struct ApiError(StoreError);

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(error = %self.0, "storage read failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "storage error").into_response()
    }
}

#[derive(Serialize)]
struct RootResp {
    message: &'static str,
    version: &'static str,
}

async fn root() -> Json<RootResp> {
    Json(RootResp {
        message: "Quant Oracle API",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Deserialize)]
struct PostsQuery {
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
    #[serde(default)]
    min_sentiment: Option<f64>,
}

fn default_limit() -> i64 {
    100
}

#[derive(Serialize)]
struct PostsResp {
    posts: Vec<Post>,
    count: usize,
}

async fn get_posts(
    State(state): State<AppState>,
    Query(q): Query<PostsQuery>,
) -> Result<Json<PostsResp>, ApiError> {
    let posts = state.store.list(PostFilter {
        limit: q.limit,
        offset: q.offset,
        min_sentiment: q.min_sentiment,
    })?;
    let count = posts.len();
    Ok(Json(PostsResp { posts, count }))
}

async fn get_metrics(
    State(state): State<AppState>,
) -> Result<Json<crate::model::MetricsSnapshot>, ApiError> {
    let snapshot = crate::aggregate::compute(state.store.as_ref()).await?;
    Ok(Json(snapshot))
}

#[derive(Deserialize)]
struct TimelineQuery {
    #[serde(default = "default_timeline_limit")]
    limit: i64,
}

fn default_timeline_limit() -> i64 {
    50
}

#[derive(Serialize)]
struct TimelineResp {
    timeline: Vec<TimelineEntry>,
}

async fn get_timeline(
    State(state): State<AppState>,
    Query(q): Query<TimelineQuery>,
) -> Result<Json<TimelineResp>, ApiError> {
    let timeline = state.store.timeline(q.limit)?;
    Ok(Json(TimelineResp { timeline }))
}

#[derive(Serialize)]
struct SubredditStatsResp {
    subreddit_stats: Vec<SubredditStats>,
}

async fn get_subreddit_stats(
    State(state): State<AppState>,
) -> Result<Json<SubredditStatsResp>, ApiError> {
    let subreddit_stats = state.store.subreddit_stats()?;
    Ok(Json(SubredditStatsResp { subreddit_stats }))
}

#[derive(Serialize)]
struct DistributionResp {
    distribution: Vec<SignalCount>,
}

async fn get_signal_distribution(
    State(state): State<AppState>,
) -> Result<Json<DistributionResp>, ApiError> {
    let distribution = state.store.signal_distribution()?;
    Ok(Json(DistributionResp { distribution }))
}

async fn ws_feed(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| serve_subscriber(socket, state.registry.clone()))
}

/// Pump queued envelopes to one subscriber's socket until either side goes
/// away, then drop the membership. Registration happens before the first
/// poll so a sweep starting now already sees this subscriber.
async fn serve_subscriber(socket: WebSocket, registry: Arc<SubscriberRegistry>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let id = registry.register(tx);
    debug!(subscriber = %id, "feed subscriber connected");

    let (mut sink, mut stream) = socket.split();
    loop {
        tokio::select! {
            payload = rx.recv() => {
                let Some(payload) = payload else { break };
                if sink.send(Message::Text(payload.into())).await.is_err() {
                    break;
                }
            }
            incoming = stream.next() => {
                // Clients only listen; drain pings and drop on close/error.
                match incoming {
                    Some(Ok(_)) => {}
                    _ => break,
                }
            }
        }
    }

    registry.unregister(id);
    debug!(subscriber = %id, "feed subscriber disconnected");
}
