// =============================================================================
// flowscope — Live order flow ingestion and aggregation
// =============================================================================
//
// One producer task (live WebSocket feed or synthetic generator) appends into
// a bounded trade buffer. A poll ticker and the read API aggregate fresh
// snapshots of that buffer on demand.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod aggregation;
mod api;
mod app_state;
mod market_data;
mod runtime_config;
mod types;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::market_data::synthetic::run_synthetic_feed;
use crate::market_data::trade_stream::{run_trade_stream, trade_stream_url};
use crate::market_data::{ReconnectBackoff, SyntheticTradeGenerator};
use crate::runtime_config::{FeedSource, RuntimeConfig};

const CONFIG_PATH: &str = "flowscope.json";
/// Poll ticks between info-level heartbeats.
const HEARTBEAT_EVERY_TICKS: u64 = 30;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("flowscope starting up");

    let mut config = RuntimeConfig::load(CONFIG_PATH).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });
    config.apply_env_overrides()?;
    config.validate().context("invalid configuration")?;

    info!(
        source = %config.source,
        symbol = %config.symbol,
        capacity = config.buffer_capacity,
        poll_interval_ms = config.poll_interval_ms,
        "Configuration resolved"
    );

    // ── 2. Build shared state ────────────────────────────────────────────
    let state = Arc::new(AppState::new(config)?);

    // ── 3. Spawn the trade producer ──────────────────────────────────────
    match state.config.source {
        FeedSource::Live => spawn_live_feed(state.clone()),
        FeedSource::Synthetic => {
            let generator = SyntheticTradeGenerator::new(state.config.synthetic.clone());
            tokio::spawn(run_synthetic_feed(generator, state.ingestor.clone()));
        }
    }

    // ── 4. Poll loop ─────────────────────────────────────────────────────
    let poll_state = state.clone();
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(Duration::from_millis(poll_state.config.poll_interval_ms));
        let mut ticks: u64 = 0;
        loop {
            interval.tick().await;
            ticks += 1;

            let agg = poll_state.aggregate_now();
            debug!(
                trades = agg.trade_count(),
                price_levels = agg.price_levels.len(),
                buy_volume = agg.total_buy_volume,
                sell_volume = agg.total_sell_volume,
                "poll"
            );

            if ticks % HEARTBEAT_EVERY_TICKS == 0 {
                let stats = poll_state.stats();
                info!(
                    buffered = stats.buffer.len,
                    accepted = stats.ingest.accepted,
                    rejected = stats.ingest.rejected,
                    connected = stats.feed.connected,
                    reconnects = stats.feed.reconnects,
                    "pipeline heartbeat"
                );
            }
        }
    });

    // ── 5. Read API server ───────────────────────────────────────────────
    let bind_addr = state.config.bind_addr.clone();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind read API on {bind_addr}"))?;
    info!(addr = %bind_addr, "Read API listening");

    let app = api::rest::router(state.clone());
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "Read API server failed");
        }
    });

    info!("All subsystems running. Press Ctrl+C to stop.");

    // ── 6. Graceful shutdown ─────────────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    warn!("Shutdown signal received");

    let stats = state.stats();
    info!(
        accepted = stats.ingest.accepted,
        rejected = stats.ingest.rejected,
        "flowscope shut down complete"
    );
    Ok(())
}

/// Run the live trade stream forever, reconnecting with exponential backoff.
fn spawn_live_feed(state: Arc<AppState>) {
    let url = trade_stream_url(&state.config.stream_base_url, &state.config.symbol);
    let mut backoff = ReconnectBackoff::new(state.config.reconnect.clone());

    tokio::spawn(async move {
        loop {
            let accepted_before = state.ingestor.accepted();

            match run_trade_stream(&url, &state.ingestor, &state.feed_status).await {
                Ok(()) => {
                    state.feed_status.record_error("stream ended".to_string());
                }
                Err(e) => {
                    error!(error = %format!("{e:#}"), "Trade stream error");
                    state.feed_status.record_error(format!("{e:#}"));
                }
            }

            if state.ingestor.accepted() > accepted_before {
                backoff.reset();
            }
            let delay = backoff.next_delay();
            warn!(
                delay_ms = delay.as_millis() as u64,
                attempt = backoff.attempt(),
                "Reconnecting trade stream"
            );
            tokio::time::sleep(delay).await;
            state.feed_status.record_reconnect();
        }
    });
}
