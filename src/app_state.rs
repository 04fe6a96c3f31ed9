// =============================================================================
// Central Application State — flowscope
// =============================================================================
//
// Owns the trade buffer and hands it by `Arc` to the ingestor (writer) and to
// the read API (readers). There is no global state: every task receives an
// `Arc<AppState>` or the specific subsystem handle it needs.
//
// Thread safety:
//   - The buffer serialises append/evict against snapshot extraction with a
//     parking_lot::RwLock; readers only ever hold the lock for the copy.
//   - Counters are atomics and can be read lock-free.
// =============================================================================

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use crate::aggregation::{Aggregation, AggregationEngine, IndexedTrade, PriceLevelAggregate};
use crate::market_data::{
    BufferStats, FeedStatus, FeedStatusSnapshot, IngestStats, RecentTradeBuffer, TradeIngestor,
};
use crate::runtime_config::{FeedSource, RuntimeConfig};

// =============================================================================
// Snapshots
// =============================================================================

/// Both aggregate views plus totals, derived from a single buffer snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct FlowSnapshot {
    pub symbol: String,
    pub source: FeedSource,
    pub trade_count: usize,
    pub buy_volume: f64,
    pub sell_volume: f64,
    pub trades: Vec<IndexedTrade>,
    pub price_levels: Vec<PriceLevelAggregate>,
    pub feed: FeedStatusSnapshot,
    pub generated_at: i64,
}

/// Pipeline counters for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStats {
    pub ingest: IngestStats,
    pub buffer: BufferStats,
    pub feed: FeedStatusSnapshot,
    pub uptime_secs: u64,
}

// =============================================================================
// AppState
// =============================================================================

/// Shared state passed to every task via `Arc<AppState>`.
pub struct AppState {
    pub config: RuntimeConfig,
    pub buffer: Arc<RecentTradeBuffer>,
    pub ingestor: Arc<TradeIngestor>,
    pub engine: AggregationEngine,
    pub feed_status: Arc<FeedStatus>,
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Build the pipeline from `config`. Fails fast on an invalid buffer
    /// capacity.
    pub fn new(config: RuntimeConfig) -> Result<Self> {
        let buffer = Arc::new(
            RecentTradeBuffer::new(config.buffer_capacity)
                .context("failed to create recent trade buffer")?,
        );
        let ingestor = Arc::new(TradeIngestor::new(buffer.clone()));

        Ok(Self {
            config,
            buffer,
            ingestor,
            engine: AggregationEngine::new(),
            feed_status: Arc::new(FeedStatus::default()),
            start_time: std::time::Instant::now(),
        })
    }

    // ── Read API ────────────────────────────────────────────────────────

    /// Snapshot the buffer and aggregate it.
    pub fn aggregate_now(&self) -> Aggregation {
        let snapshot = self.buffer.snapshot();
        self.engine.aggregate(&snapshot)
    }

    /// Current trades with their plotting index, oldest first.
    pub fn indexed_trades(&self) -> Vec<IndexedTrade> {
        self.engine.indexed_trades(&self.buffer.snapshot())
    }

    /// Current volume per price level, ascending price.
    pub fn price_level_aggregates(&self) -> Vec<PriceLevelAggregate> {
        self.engine.price_levels(&self.buffer.snapshot())
    }

    pub fn flow_snapshot(&self) -> FlowSnapshot {
        let agg = self.aggregate_now();
        FlowSnapshot {
            symbol: self.config.symbol.clone(),
            source: self.config.source,
            trade_count: agg.trade_count(),
            buy_volume: agg.total_buy_volume,
            sell_volume: agg.total_sell_volume,
            trades: agg.trades,
            price_levels: agg.price_levels,
            feed: self.feed_status.snapshot(),
            generated_at: Utc::now().timestamp_millis(),
        }
    }

    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            ingest: self.ingestor.stats(),
            buffer: self.buffer.stats(),
            feed: self.feed_status.snapshot(),
            uptime_secs: self.uptime_secs(),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
