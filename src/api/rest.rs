// =============================================================================
// REST Read API — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/` and are read-only. Each request takes a
// fresh buffer snapshot; nothing is cached between calls.
//
// CORS is permissive so a browser dashboard on another origin can poll.
// =============================================================================

use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};

use crate::app_state::AppState;

// =============================================================================
// Router construction
// =============================================================================

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/trades", get(trades))
        .route("/api/v1/price-levels", get(price_levels))
        .route("/api/v1/flow", get(flow))
        .route("/api/v1/stats", get(stats))
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    server_time: i64,
    uptime_secs: u64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        server_time: chrono::Utc::now().timestamp_millis(),
        uptime_secs: state.uptime_secs(),
    })
}

// =============================================================================
// Trade views
// =============================================================================

async fn trades(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.indexed_trades())
}

async fn price_levels(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.price_level_aggregates())
}

/// Trades and price levels from the same snapshot.
async fn flow(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.flow_snapshot())
}

async fn stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.stats())
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::runtime_config::RuntimeConfig;

    fn app_state() -> Arc<AppState> {
        Arc::new(AppState::new(RuntimeConfig::default()).unwrap())
    }

    async fn get_json(state: Arc<AppState>, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_is_ok() {
        let (status, body) = get_json(app_state(), "/api/v1/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn empty_buffer_returns_empty_arrays() {
        let state = app_state();
        let (_, trades) = get_json(state.clone(), "/api/v1/trades").await;
        let (_, levels) = get_json(state, "/api/v1/price-levels").await;
        assert_eq!(trades, serde_json::json!([]));
        assert_eq!(levels, serde_json::json!([]));
    }

    #[tokio::test]
    async fn trades_and_levels_reflect_ingested_data() {
        let state = app_state();
        state.ingestor.ingest(r#"{"p":"100","q":"1.0","m":false}"#);
        state.ingestor.ingest(r#"{"p":"100","q":"2.0","m":true}"#);
        state.ingestor.ingest(r#"{"p":"101","q":"0.5","m":false}"#);

        let (status, trades) = get_json(state.clone(), "/api/v1/trades").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(trades[0]["index"], 0);
        assert_eq!(trades[0]["side"], "Buy");
        assert_eq!(trades[1]["side"], "Sell");
        assert_eq!(trades[2]["price"], 101.0);

        let (_, levels) = get_json(state.clone(), "/api/v1/price-levels").await;
        assert_eq!(
            levels,
            serde_json::json!([
                { "price": 100.0, "buy_volume": 1.0, "sell_volume": 2.0 },
                { "price": 101.0, "buy_volume": 0.5, "sell_volume": 0.0 }
            ])
        );

        let (_, flow) = get_json(state, "/api/v1/flow").await;
        assert_eq!(flow["trade_count"], 3);
        assert_eq!(flow["buy_volume"], 1.5);
        assert_eq!(flow["sell_volume"], 2.0);
        assert_eq!(flow["source"], "live");
    }

    #[tokio::test]
    async fn stats_report_counters() {
        let state = app_state();
        state.ingestor.ingest("{}");
        let (_, stats) = get_json(state, "/api/v1/stats").await;
        assert_eq!(stats["ingest"]["rejected"], 1);
        assert_eq!(stats["buffer"]["capacity"], 200);
        assert_eq!(stats["feed"]["connected"], false);
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let response = router(app_state())
            .oneshot(Request::builder().uri("/api/v1/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
