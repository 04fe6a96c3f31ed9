// =============================================================================
// Shared types used across the flowscope pipeline
// =============================================================================

use serde::{Deserialize, Serialize};

/// Aggressor side of an executed trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Classify a trade from the exchange "maker is seller" flag.
    ///
    /// When the maker sold, the taker bought and the trade is a Buy; when the
    /// maker bought, the taker sold and the trade is a Sell.
    pub fn from_maker_is_seller(maker_is_seller: bool) -> Self {
        if maker_is_seller {
            Self::Sell
        } else {
            Self::Buy
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "Buy"),
            Self::Sell => write!(f, "Sell"),
        }
    }
}

/// A single executed trade. Arrival order is carried by position in the
/// buffer, not by `timestamp_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub side: Side,
    pub price: f64,
    pub size: f64,
    /// Exchange trade time when supplied, otherwise arrival time (epoch ms).
    pub timestamp_ms: i64,
}

impl Trade {
    /// Build a trade stamped with the current wall-clock time.
    pub fn now(side: Side, price: f64, size: f64) -> Self {
        Self {
            side,
            price,
            size,
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
        }
    }
}
