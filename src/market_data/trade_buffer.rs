use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{ensure, Result};
use parking_lot::RwLock;
use serde::Serialize;

use crate::types::Trade;

// ---------------------------------------------------------------------------
// RecentTradeBuffer -- thread-safe bounded ring of the latest trades
// ---------------------------------------------------------------------------

/// Fixed-capacity ring of the most recent trades, oldest first.
///
/// The producer appends under the write lock; readers take an owned copy
/// under the read lock, so a snapshot never observes a half-applied
/// append/evict and is unaffected by later mutation.
pub struct RecentTradeBuffer {
    ring: RwLock<VecDeque<Trade>>,
    capacity: usize,
    total_appended: AtomicU64,
    evicted: AtomicU64,
}

/// Counters describing buffer activity since construction.
#[derive(Debug, Clone, Serialize)]
pub struct BufferStats {
    pub len: usize,
    pub capacity: usize,
    pub total_appended: u64,
    pub evicted: u64,
}

impl RecentTradeBuffer {
    /// Create a buffer holding at most `capacity` trades.
    ///
    /// A zero capacity is a configuration error.
    pub fn new(capacity: usize) -> Result<Self> {
        ensure!(capacity > 0, "trade buffer capacity must be positive, got {capacity}");
        Ok(Self {
            ring: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
            total_appended: AtomicU64::new(0),
            evicted: AtomicU64::new(0),
        })
    }

    /// Append a trade, evicting the oldest one first when full.
    pub fn append(&self, trade: Trade) {
        let mut ring = self.ring.write();
        if ring.len() == self.capacity {
            ring.pop_front();
            self.evicted.fetch_add(1, Ordering::Relaxed);
        }
        ring.push_back(trade);
        self.total_appended.fetch_add(1, Ordering::Relaxed);
    }

    /// Independent point-in-time copy of the buffer, oldest first.
    pub fn snapshot(&self) -> Vec<Trade> {
        let ring = self.ring.read();
        ring.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.ring.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.read().is_empty()
    }

    pub fn stats(&self) -> BufferStats {
        BufferStats {
            len: self.len(),
            capacity: self.capacity,
            total_appended: self.total_appended.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::types::Side;

    fn trade(price: f64, size: f64) -> Trade {
        Trade {
            side: Side::Buy,
            price,
            size,
            timestamp_ms: 0,
        }
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(RecentTradeBuffer::new(0).is_err());
    }

    #[test]
    fn under_capacity_keeps_append_order() {
        let buf = RecentTradeBuffer::new(10).unwrap();
        for i in 0..7 {
            buf.append(trade(100.0 + i as f64, 1.0));
        }

        assert_eq!(buf.len(), 7);
        let prices: Vec<f64> = buf.snapshot().iter().map(|t| t.price).collect();
        assert_eq!(prices, vec![100.0, 101.0, 102.0, 103.0, 104.0, 105.0, 106.0]);
    }

    #[test]
    fn overflow_keeps_most_recent_in_order() {
        let buf = RecentTradeBuffer::new(3).unwrap();
        for i in 0..8 {
            buf.append(trade(i as f64, 1.0));
        }

        assert_eq!(buf.len(), 3);
        let prices: Vec<f64> = buf.snapshot().iter().map(|t| t.price).collect();
        assert_eq!(prices, vec![5.0, 6.0, 7.0]);

        let stats = buf.stats();
        assert_eq!(stats.total_appended, 8);
        assert_eq!(stats.evicted, 5);
        assert_eq!(stats.capacity, 3);
    }

    #[test]
    fn capacity_two_retains_last_two() {
        let buf = RecentTradeBuffer::new(2).unwrap();
        let a = trade(1.0, 1.0);
        let b = trade(2.0, 2.0);
        let c = trade(3.0, 3.0);
        buf.append(a);
        buf.append(b);
        buf.append(c);

        assert_eq!(buf.snapshot(), vec![b, c]);
    }

    #[test]
    fn snapshot_is_independent_of_later_appends() {
        let buf = RecentTradeBuffer::new(2).unwrap();
        buf.append(trade(1.0, 1.0));
        buf.append(trade(2.0, 1.0));

        let snap = buf.snapshot();
        buf.append(trade(3.0, 1.0));
        buf.append(trade(4.0, 1.0));

        let prices: Vec<f64> = snap.iter().map(|t| t.price).collect();
        assert_eq!(prices, vec![1.0, 2.0]);
    }

    #[test]
    fn empty_buffer_snapshot_is_empty() {
        let buf = RecentTradeBuffer::new(5).unwrap();
        assert!(buf.is_empty());
        assert!(buf.snapshot().is_empty());
    }

    #[test]
    fn concurrent_snapshots_see_contiguous_runs() {
        let buf = Arc::new(RecentTradeBuffer::new(50).unwrap());

        let producer = {
            let buf = buf.clone();
            std::thread::spawn(move || {
                for i in 0..20_000u32 {
                    buf.append(trade(f64::from(i), 1.0));
                }
            })
        };

        while !producer.is_finished() {
            let snap = buf.snapshot();
            assert!(snap.len() <= 50);
            for pair in snap.windows(2) {
                assert_eq!(pair[1].price, pair[0].price + 1.0);
            }
        }
        producer.join().unwrap();

        let snap = buf.snapshot();
        assert_eq!(snap.len(), 50);
        assert_eq!(snap.last().map(|t| t.price), Some(19_999.0));
    }
}
