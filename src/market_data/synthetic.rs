// =============================================================================
// Synthetic Trade Source — randomized trades on a fixed cadence
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::market_data::TradeIngestor;
use crate::runtime_config::SyntheticParams;
use crate::types::{Side, Trade};

/// Produces uniformly random trades within the configured ranges.
pub struct SyntheticTradeGenerator {
    rng: StdRng,
    params: SyntheticParams,
}

impl SyntheticTradeGenerator {
    /// Seeded from `params.seed` when set, otherwise from OS entropy.
    pub fn new(params: SyntheticParams) -> Self {
        let rng = match params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng, params }
    }

    pub fn next_trade(&mut self) -> Trade {
        let side = if self.rng.gen_bool(0.5) {
            Side::Buy
        } else {
            Side::Sell
        };
        let size = round2(self.rng.gen_range(self.params.size_min..=self.params.size_max));
        let price = round2(self.rng.gen_range(self.params.price_min..=self.params.price_max));
        Trade::now(side, price, size)
    }

    pub fn cadence(&self) -> Duration {
        Duration::from_millis(self.params.cadence_ms)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Emit one synthetic trade per cadence into `ingestor`, forever.
pub async fn run_synthetic_feed(mut generator: SyntheticTradeGenerator, ingestor: Arc<TradeIngestor>) {
    let cadence = generator.cadence();
    info!(cadence_ms = cadence.as_millis() as u64, "synthetic trade feed started");

    loop {
        ingestor.record(generator.next_trade());
        tokio::time::sleep(cadence).await;
    }
}
