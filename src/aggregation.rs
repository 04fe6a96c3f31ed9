// =============================================================================
// Aggregation Engine — indexed trade list + per-price volume by side
// =============================================================================
//
// Pure transformation of a buffer snapshot. Nothing is cached between calls;
// every poll recomputes from scratch.
//
// Price grouping uses exact floating-point equality (the bit pattern, with
// -0.0 folded into 0.0). No tick-size binning is applied, so prices that
// differ only by representation noise land in separate rows.
// =============================================================================

use std::collections::HashMap;

use serde::Serialize;

use crate::types::{Side, Trade};

/// A trade tagged with its position in the snapshot (0 = oldest).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IndexedTrade {
    pub index: usize,
    pub side: Side,
    pub price: f64,
    pub size: f64,
}

/// Total traded size at one price, split by aggressor side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceLevelAggregate {
    pub price: f64,
    pub buy_volume: f64,
    pub sell_volume: f64,
}

impl PriceLevelAggregate {
    pub fn total_volume(&self) -> f64 {
        self.buy_volume + self.sell_volume
    }
}

/// Everything derived from one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregation {
    pub trades: Vec<IndexedTrade>,
    /// Sorted by ascending price.
    pub price_levels: Vec<PriceLevelAggregate>,
    pub total_buy_volume: f64,
    pub total_sell_volume: f64,
}

impl Aggregation {
    pub fn trade_count(&self) -> usize {
        self.trades.len()
    }
}

/// Stateless aggregation over trade snapshots.
#[derive(Debug, Default, Clone, Copy)]
pub struct AggregationEngine;

impl AggregationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Build the indexed list and the price-level table in one pass.
    pub fn aggregate(&self, snapshot: &[Trade]) -> Aggregation {
        let mut trades = Vec::with_capacity(snapshot.len());
        let mut price_levels: Vec<PriceLevelAggregate> = Vec::new();
        let mut slot_by_price: HashMap<u64, usize> = HashMap::new();
        let mut total_buy_volume = 0.0;
        let mut total_sell_volume = 0.0;

        for (index, trade) in snapshot.iter().enumerate() {
            trades.push(IndexedTrade {
                index,
                side: trade.side,
                price: trade.price,
                size: trade.size,
            });

            let price = canonical_price(trade.price);
            let slot = *slot_by_price.entry(price.to_bits()).or_insert_with(|| {
                price_levels.push(PriceLevelAggregate {
                    price,
                    buy_volume: 0.0,
                    sell_volume: 0.0,
                });
                price_levels.len() - 1
            });

            let level = &mut price_levels[slot];
            match trade.side {
                Side::Buy => {
                    level.buy_volume += trade.size;
                    total_buy_volume += trade.size;
                }
                Side::Sell => {
                    level.sell_volume += trade.size;
                    total_sell_volume += trade.size;
                }
            }
        }

        price_levels.sort_by(|a, b| a.price.total_cmp(&b.price));

        Aggregation {
            trades,
            price_levels,
            total_buy_volume,
            total_sell_volume,
        }
    }

    pub fn indexed_trades(&self, snapshot: &[Trade]) -> Vec<IndexedTrade> {
        self.aggregate(snapshot).trades
    }

    pub fn price_levels(&self, snapshot: &[Trade]) -> Vec<PriceLevelAggregate> {
        self.aggregate(snapshot).price_levels
    }
}

/// Fold -0.0 into 0.0 so both group together.
fn canonical_price(price: f64) -> f64 {
    if price == 0.0 {
        0.0
    } else {
        price
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn t(side: Side, price: f64, size: f64) -> Trade {
        Trade {
            side,
            price,
            size,
            timestamp_ms: 0,
        }
    }

    #[test]
    fn mixed_sides_group_by_price() {
        let snapshot = vec![
            t(Side::Buy, 100.0, 1.0),
            t(Side::Sell, 100.0, 2.0),
            t(Side::Buy, 101.0, 0.5),
        ];
        let agg = AggregationEngine::new().aggregate(&snapshot);

        assert_eq!(
            agg.price_levels,
            vec![
                PriceLevelAggregate {
                    price: 100.0,
                    buy_volume: 1.0,
                    sell_volume: 2.0
                },
                PriceLevelAggregate {
                    price: 101.0,
                    buy_volume: 0.5,
                    sell_volume: 0.0
                },
            ]
        );
        assert!((agg.total_buy_volume - 1.5).abs() < f64::EPSILON);
        assert!((agg.total_sell_volume - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn indices_follow_snapshot_order() {
        let snapshot = vec![
            t(Side::Sell, 150.0, 3.0),
            t(Side::Buy, 120.0, 1.0),
            t(Side::Buy, 150.0, 2.0),
        ];
        let trades = AggregationEngine::new().indexed_trades(&snapshot);

        assert_eq!(trades.iter().map(|x| x.index).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(trades[0].price, 150.0);
        assert_eq!(trades[0].side, Side::Sell);
        assert_eq!(trades[1].price, 120.0);
    }

    #[test]
    fn empty_snapshot_yields_empty_outputs() {
        let agg = AggregationEngine::new().aggregate(&[]);
        assert_eq!(agg.trade_count(), 0);
        assert!(agg.price_levels.is_empty());
        assert_eq!(agg.total_buy_volume, 0.0);
        assert_eq!(agg.total_sell_volume, 0.0);
    }

    #[test]
    fn levels_are_sorted_by_price() {
        let snapshot = vec![
            t(Side::Buy, 105.0, 1.0),
            t(Side::Sell, 99.5, 1.0),
            t(Side::Buy, 101.25, 1.0),
        ];
        let prices: Vec<f64> = AggregationEngine::new()
            .price_levels(&snapshot)
            .iter()
            .map(|l| l.price)
            .collect();
        assert_eq!(prices, vec![99.5, 101.25, 105.0]);
    }

    #[test]
    fn volume_is_conserved_per_level_and_overall() {
        let snapshot: Vec<Trade> = (0..200u32)
            .map(|i| {
                let side = if i % 3 == 0 { Side::Sell } else { Side::Buy };
                t(side, 100.0 + f64::from(i % 7), 0.25 * f64::from(i % 5 + 1))
            })
            .collect();
        let agg = AggregationEngine::new().aggregate(&snapshot);

        for level in &agg.price_levels {
            let expected: f64 = snapshot
                .iter()
                .filter(|x| x.price == level.price)
                .map(|x| x.size)
                .sum();
            assert!((level.total_volume() - expected).abs() < 1e-9);
        }

        let total_size: f64 = snapshot.iter().map(|x| x.size).sum();
        let level_sum: f64 = agg.price_levels.iter().map(|l| l.total_volume()).sum();
        assert!((level_sum - total_size).abs() < 1e-9);
        assert!((agg.total_buy_volume + agg.total_sell_volume - total_size).abs() < 1e-9);
    }

    #[test]
    fn aggregate_is_idempotent() {
        let snapshot = vec![
            t(Side::Buy, 0.1 + 0.2, 1.1),
            t(Side::Sell, 0.3, 2.2),
            t(Side::Buy, 0.3, 3.3),
        ];
        let engine = AggregationEngine::new();
        let first = engine.aggregate(&snapshot);
        let second = engine.aggregate(&snapshot);

        assert_eq!(first.trades, second.trades);
        assert_eq!(first.price_levels.len(), second.price_levels.len());
        for (a, b) in first.price_levels.iter().zip(&second.price_levels) {
            assert_eq!(a.price.to_bits(), b.price.to_bits());
            assert_eq!(a.buy_volume.to_bits(), b.buy_volume.to_bits());
            assert_eq!(a.sell_volume.to_bits(), b.sell_volume.to_bits());
        }
    }

    #[test]
    fn representation_noise_is_not_merged() {
        // 0.1 + 0.2 != 0.3 in binary floating point.
        let snapshot = vec![t(Side::Buy, 0.1 + 0.2, 1.0), t(Side::Buy, 0.3, 1.0)];
        assert_eq!(AggregationEngine::new().price_levels(&snapshot).len(), 2);
    }

    #[test]
    fn negative_zero_groups_with_zero() {
        let snapshot = vec![t(Side::Buy, 0.0, 1.0), t(Side::Sell, -0.0, 2.0)];
        let levels = AggregationEngine::new().price_levels(&snapshot);
        assert_eq!(levels.len(), 1);
        assert_eq!(levels[0].buy_volume, 1.0);
        assert_eq!(levels[0].sell_volume, 2.0);
    }
}
