// =============================================================================
// Reconnect Backoff — exponential delay with jitter for the live feed
// =============================================================================

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::runtime_config::ReconnectParams;

/// Exponential backoff state: `base * multiplier^attempt`, capped at `max`,
/// with +/- `jitter` applied and never below `base`.
pub struct ReconnectBackoff {
    params: ReconnectParams,
    attempt: u32,
    rng: StdRng,
}

impl ReconnectBackoff {
    pub fn new(params: ReconnectParams) -> Self {
        Self {
            params,
            attempt: 0,
            rng: StdRng::from_entropy(),
        }
    }

    /// Delay before the next attempt; advances the attempt counter.
    pub fn next_delay(&mut self) -> Duration {
        let base = self.params.base_ms as f64;
        let exp = base * self.params.multiplier.powi(self.attempt.min(32) as i32);
        let capped = exp.min(self.params.max_ms as f64);

        let jitter_range = capped * self.params.jitter;
        let jitter = if jitter_range > 0.0 {
            self.rng.gen_range(-jitter_range..=jitter_range)
        } else {
            0.0
        };
        let final_ms = (capped + jitter).max(base);

        self.attempt = self.attempt.saturating_add(1);
        Duration::from_millis(final_ms as u64)
    }

    /// Call after a session that delivered data.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}
