// =============================================================================
// Trade Ingestion — validates raw trades and appends them to the buffer
// =============================================================================

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{bail, ensure, Context, Result};
use futures_util::StreamExt;
use parking_lot::RwLock;
use serde::Serialize;
use tokio_tungstenite::connect_async;
use tracing::{debug, error, info, warn};

use crate::market_data::RecentTradeBuffer;
use crate::types::{Side, Trade};

/// Classifies raw trades and feeds them into a [`RecentTradeBuffer`].
///
/// Malformed input is logged and counted but never surfaced to the caller,
/// so a bad message cannot stall the feed loop.
pub struct TradeIngestor {
    buffer: Arc<RecentTradeBuffer>,
    accepted: AtomicU64,
    rejected: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestStats {
    pub accepted: u64,
    pub rejected: u64,
}

impl TradeIngestor {
    pub fn new(buffer: Arc<RecentTradeBuffer>) -> Self {
        Self {
            buffer,
            accepted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    /// Ingest a raw live-feed message.
    pub fn ingest(&self, text: &str) {
        match parse_trade_message(text) {
            Ok(trade) => self.record(trade),
            Err(e) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                warn!(error = %format!("{e:#}"), "dropping malformed trade message");
            }
        }
    }

    /// Append an already-classified trade (synthetic source).
    pub fn record(&self, trade: Trade) {
        debug!(side = %trade.side, price = trade.price, size = trade.size, "trade");
        self.buffer.append(trade);
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> IngestStats {
        IngestStats {
            accepted: self.accepted(),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}

// ---------------------------------------------------------------------------
// Feed status
// ---------------------------------------------------------------------------

/// Connection bookkeeping for the live feed, read by the stats endpoint.
#[derive(Default)]
pub struct FeedStatus {
    connected: AtomicBool,
    reconnects: AtomicU64,
    last_error: RwLock<Option<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedStatusSnapshot {
    pub connected: bool,
    pub reconnects: u64,
    pub last_error: Option<String>,
}

impl FeedStatus {
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Relaxed);
    }

    pub fn record_error(&self, message: String) {
        *self.last_error.write() = Some(message);
    }

    pub fn record_reconnect(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> FeedStatusSnapshot {
        FeedStatusSnapshot {
            connected: self.connected.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
            last_error: self.last_error.read().clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Trade WebSocket stream
// ---------------------------------------------------------------------------

/// Build the single-symbol raw trade stream URL, e.g.
/// `wss://stream.binance.com:9443/ws/btcusdt@trade`.
pub fn trade_stream_url(base_url: &str, symbol: &str) -> String {
    let lower = symbol.to_lowercase();
    format!("{}/{lower}@trade", base_url.trim_end_matches('/'))
}

/// Connect to the trade WebSocket and feed every text frame into `ingestor`.
///
/// Returns when the stream ends (`Ok`) or fails (`Err`); reconnection is the
/// caller's job.
pub async fn run_trade_stream(
    url: &str,
    ingestor: &Arc<TradeIngestor>,
    status: &FeedStatus,
) -> Result<()> {
    info!(url = %url, "connecting to trade WebSocket");

    let (ws_stream, _response) = connect_async(url)
        .await
        .context("failed to connect to trade WebSocket")?;

    info!(url = %url, "trade WebSocket connected");
    status.set_connected(true);
    let (_write, mut read) = ws_stream.split();

    let result = loop {
        match read.next().await {
            Some(Ok(msg)) => {
                if let tokio_tungstenite::tungstenite::Message::Text(text) = msg {
                    ingestor.ingest(&text);
                }
                // Ping / Pong / Binary / Close frames carry no trades.
            }
            Some(Err(e)) => {
                error!(error = %e, "trade WebSocket read error");
                break Err(anyhow::Error::new(e).context("trade WebSocket read failed"));
            }
            None => {
                warn!(url = %url, "trade WebSocket stream ended");
                break Ok(());
            }
        }
    };

    status.set_connected(false);
    result
}

// ---------------------------------------------------------------------------
// Raw message parsing
// ---------------------------------------------------------------------------

/// Parse a raw trade message into a classified [`Trade`].
///
/// Expected shape:
/// ```json
/// { "e": "trade", "s": "BTCUSDT", "p": "37000.00", "q": "0.123", "m": true, "T": 1700000000000 }
/// ```
pub fn parse_trade_message(text: &str) -> Result<Trade> {
    let root: serde_json::Value =
        serde_json::from_str(text).context("failed to parse trade JSON")?;

    let price = parse_quantity(&root["p"], "p")?;
    let size = parse_quantity(&root["q"], "q")?;
    let maker_is_seller = root["m"].as_bool().context("missing field m")?;

    let timestamp_ms = root["T"]
        .as_i64()
        .unwrap_or_else(|| chrono::Utc::now().timestamp_millis());

    Ok(Trade {
        side: Side::from_maker_is_seller(maker_is_seller),
        price,
        size,
        timestamp_ms,
    })
}

/// Binance sends decimals as JSON strings; plain numbers are tolerated too.
fn parse_quantity(val: &serde_json::Value, name: &str) -> Result<f64> {
    let parsed = match val {
        serde_json::Value::String(s) => s
            .trim()
            .parse::<f64>()
            .with_context(|| format!("failed to parse {name} as f64: {s}"))?,
        serde_json::Value::Number(n) => n
            .as_f64()
            .with_context(|| format!("field {name} is not a valid f64"))?,
        serde_json::Value::Null => bail!("missing field {name}"),
        _ => bail!("field {name} has unexpected JSON type"),
    };
    ensure!(parsed.is_finite(), "field {name} is not finite: {parsed}");
    ensure!(parsed >= 0.0, "field {name} is negative: {parsed}");
    Ok(parsed)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
