// tests/api_http.rs
//
// HTTP surface via in-process tower `oneshot` calls against a seeded
// in-memory store.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::Request;
use axum::Router;
use chrono::{Duration, Utc};
use http::StatusCode;
use tower::ServiceExt; // for `oneshot`

use quant_oracle::api::{create_router, AppState};
use quant_oracle::model::{ChainSignal, Post};
use quant_oracle::registry::SubscriberRegistry;
use quant_oracle::store::PostStore;

fn seeded_app() -> Router {
    let store = PostStore::open_in_memory().unwrap();
    let posts = [
        ("p0", "ethereum", 0.8, Some(ChainSignal::WhaleAlert)),
        ("p1", "ethereum", -0.9, Some(ChainSignal::Normal)),
        ("p2", "bitcoin", 0.2, Some(ChainSignal::LowGas)),
        ("p3", "bitcoin", 0.6, Some(ChainSignal::Normal)),
    ];
    let now = Utc::now();
    for (i, (id, subreddit, sentiment, signal)) in posts.into_iter().enumerate() {
        store
            .upsert(&Post {
                id: id.to_string(),
                subreddit: subreddit.to_string(),
                title: format!("title {id}"),
                score: 10 * (i as i64 + 1),
                sentiment,
                chain_signal: signal,
                timestamp: now - Duration::hours(i as i64),
            })
            .unwrap();
    }

    create_router(AppState {
        store: Arc::new(store),
        registry: Arc::new(SubscriberRegistry::new()),
    })
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let resp = app
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), 1_048_576).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, value)
}

#[tokio::test]
async fn health_and_root_respond() {
    let app = seeded_app();
    let resp = app
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let (status, root) = get_json(app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(root["message"], "Quant Oracle API");
}

#[tokio::test]
async fn metrics_endpoint_reports_reference_numbers() {
    let (status, v) = get_json(seeded_app(), "/api/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["total_posts"], 4);
    assert_eq!(v["avg_sentiment"], 0.175);
    assert_eq!(v["bullish_count"], 2);
    assert_eq!(v["bearish_count"], 1);
    assert_eq!(v["whale_alerts"], 1);
    assert_eq!(v["low_gas_count"], 1);
    assert_eq!(v["bullish_percentage"], 50.0);
    assert_eq!(v["bearish_percentage"], 25.0);
}

#[tokio::test]
async fn posts_endpoint_orders_filters_and_pages() {
    let (status, v) = get_json(seeded_app(), "/api/posts").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["count"], 4);
    assert_eq!(v["posts"][0]["id"], "p0"); // newest first

    let (_, filtered) = get_json(seeded_app(), "/api/posts?min_sentiment=0.5").await;
    assert_eq!(filtered["count"], 2);

    let (_, paged) = get_json(seeded_app(), "/api/posts?limit=1&offset=1").await;
    assert_eq!(paged["count"], 1);
    assert_eq!(paged["posts"][0]["id"], "p1");
}

#[tokio::test]
async fn timeline_endpoint_returns_recent_rows() {
    let (status, v) = get_json(seeded_app(), "/api/sentiment-timeline?limit=2").await;
    assert_eq!(status, StatusCode::OK);
    let timeline = v["timeline"].as_array().unwrap();
    assert_eq!(timeline.len(), 2);
    assert_eq!(timeline[0]["subreddit"], "ethereum");
    assert_eq!(timeline[0]["chain_signal"], "WHALE_ALERT");
    assert!(timeline[0]["sentiment"].is_number());
}

#[tokio::test]
async fn grouped_endpoints_cover_the_corpus() {
    let (status, v) = get_json(seeded_app(), "/api/subreddit-stats").await;
    assert_eq!(status, StatusCode::OK);
    let stats = v["subreddit_stats"].as_array().unwrap();
    assert_eq!(stats.len(), 2);
    let eth = stats
        .iter()
        .find(|s| s["subreddit"] == "ethereum")
        .unwrap();
    assert_eq!(eth["post_count"], 2);
    assert_eq!(eth["max_sentiment"], 0.8);
    assert_eq!(eth["min_sentiment"], -0.9);

    let (status, v) = get_json(seeded_app(), "/api/signal-distribution").await;
    assert_eq!(status, StatusCode::OK);
    let dist = v["distribution"].as_array().unwrap();
    let total: i64 = dist.iter().map(|d| d["count"].as_i64().unwrap()).sum();
    assert_eq!(total, 4);
}
