// src/book.rs
//! Incremental L2 orderbook engine.
//!
//! The book keeps one sorted map per side (`BTreeMap<Price, Qty>`) plus a
//! cached best level per side. Mutations are O(log P) in the number of price
//! levels; best-of-book reads are O(1) from the cache.
//!
//! The cache is maintained monotonically: an insert only touches the cache
//! when the incoming price ties or beats the cached best, and a delete only
//! forces a map scan when it removes the cached best itself. In the common
//! case of updates below the top, apply never walks the tree.
//!
//! ## Example
//!
//! ```rust
//! use lobpipe::book::Orderbook;
//! use lobpipe::types::{Level, Price, Qty, Update};
//!
//! let mut book = Orderbook::new();
//! let snap = Update::Snapshot {
//!     timestamp: 1000,
//!     bids: vec![Level { price: Price::from_f64(100.00), qty: Qty(1.0) }],
//!     asks: vec![Level { price: Price::from_f64(100.50), qty: Qty(3.0) }],
//! };
//! let notif = book.apply(&snap, 0);
//! assert_eq!(notif.seq, 1);
//! assert_eq!(notif.best_bid.unwrap().price, Price(10000));
//! ```

use std::collections::BTreeMap;

use crate::types::{BookNotification, Level, Price, Qty, Side, Update};

/// The core L2 book. Exclusively owned by the producer thread; all methods
/// are single-threaded.
#[derive(Default)]
pub struct Orderbook {
    /// Bids keyed ascending; best bid is the last entry.
    bids: BTreeMap<Price, Qty>,
    /// Asks keyed ascending; best ask is the first entry.
    asks: BTreeMap<Price, Qty>,
    best_bid: Option<Level>,
    best_ask: Option<Level>,
    seq: u64,
}

impl Orderbook {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one update and return the notification for the strategy.
    ///
    /// Total over well-formed updates: there is no failure mode. `send_ns`
    /// is passed through verbatim. `seq` increments by exactly one per call.
    #[inline]
    pub fn apply(&mut self, update: &Update, send_ns: u64) -> BookNotification {
        let timestamp = match update {
            Update::Snapshot { timestamp, bids, asks } => {
                self.apply_snapshot(bids, asks);
                *timestamp
            }
            Update::Incremental { timestamp, side, level } => {
                self.apply_incremental(*side, *level);
                *timestamp
            }
        };

        self.seq += 1;
        BookNotification {
            update_timestamp: timestamp,
            engine_send_ns: send_ns,
            best_bid: self.best_bid,
            best_ask: self.best_ask,
            seq: self.seq,
        }
    }

    /// Replace the whole book. Zero-qty levels are dropped; a duplicate
    /// price within one snapshot resolves last-writer-wins.
    fn apply_snapshot(&mut self, bids: &[Level], asks: &[Level]) {
        self.bids.clear();
        self.asks.clear();
        for level in bids {
            if !level.qty.is_zero() {
                self.bids.insert(level.price, level.qty);
            }
        }
        for level in asks {
            if !level.qty.is_zero() {
                self.asks.insert(level.price, level.qty);
            }
        }
        self.recompute_best(Side::Bid);
        self.recompute_best(Side::Ask);
    }

    /// Insert, overwrite, or delete (zero qty) a single level on one side.
    #[inline(always)]
    fn apply_incremental(&mut self, side: Side, level: Level) {
        if level.qty.is_zero() {
            let removed = match side {
                Side::Bid => self.bids.remove(&level.price).is_some(),
                Side::Ask => self.asks.remove(&level.price).is_some(),
            };
            // The cache only moves when the removed price was the best.
            let best = match side {
                Side::Bid => self.best_bid,
                Side::Ask => self.best_ask,
            };
            if removed && best.is_some_and(|b| b.price == level.price) {
                self.recompute_best(side);
            }
            return;
        }

        match side {
            Side::Bid => {
                self.bids.insert(level.price, level.qty);
                match self.best_bid {
                    Some(best) if level.price < best.price => {}
                    _ => self.best_bid = Some(level),
                }
            }
            Side::Ask => {
                self.asks.insert(level.price, level.qty);
                match self.best_ask {
                    Some(best) if level.price > best.price => {}
                    _ => self.best_ask = Some(level),
                }
            }
        }
    }

    /// Refresh one side's cache from the map extremum.
    #[inline(always)]
    fn recompute_best(&mut self, side: Side) {
        match side {
            Side::Bid => {
                self.best_bid = self
                    .bids
                    .iter()
                    .next_back()
                    .map(|(&price, &qty)| Level { price, qty });
            }
            Side::Ask => {
                self.best_ask = self
                    .asks
                    .iter()
                    .next()
                    .map(|(&price, &qty)| Level { price, qty });
            }
        }
    }

    /// Best bid, O(1) from cache.
    #[inline(always)]
    pub fn best_bid(&self) -> Option<Level> {
        self.best_bid
    }

    /// Best ask, O(1) from cache.
    #[inline(always)]
    pub fn best_ask(&self) -> Option<Level> {
        self.best_ask
    }

    /// Number of bid levels.
    #[inline(always)]
    pub fn bid_depth(&self) -> usize {
        self.bids.len()
    }

    /// Number of ask levels.
    #[inline(always)]
    pub fn ask_depth(&self) -> usize {
        self.asks.len()
    }
}

impl Orderbook {
    /// Panic if the cached bests disagree with the maps or a zero-qty level
    /// survived a mutation. Test support.
    pub fn assert_invariants(&self) {
        let exp_bid = self.bids.iter().next_back().map(|(&p, _)| p);
        let exp_ask = self.asks.iter().next().map(|(&p, _)| p);
        assert_eq!(self.best_bid.map(|l| l.price), exp_bid, "best_bid mismatch");
        assert_eq!(self.best_ask.map(|l| l.price), exp_ask, "best_ask mismatch");

        if let Some(best) = self.best_bid {
            let stored = self.bids[&best.price].0;
            assert_eq!(best.qty.0, stored, "best_bid qty stale");
        }
        if let Some(best) = self.best_ask {
            let stored = self.asks[&best.price].0;
            assert_eq!(best.qty.0, stored, "best_ask qty stale");
        }

        assert!(self.bids.values().all(|q| !q.is_zero()), "zero bid level");
        assert!(self.asks.values().all(|q| !q.is_zero()), "zero ask level");

        // Crossed books are allowed; upstream owns bid/ask ordering.
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(price: f64, qty: f64) -> Level {
        Level { price: Price::from_f64(price), qty: Qty(qty) }
    }

    fn seed_snapshot() -> Update {
        Update::Snapshot {
            timestamp: 1000,
            bids: vec![level(100.00, 1.0), level(99.50, 2.0)],
            asks: vec![level(100.50, 3.0), level(101.00, 4.0)],
        }
    }

    #[test]
    fn snapshot_sets_bests() {
        let mut book = Orderbook::new();
        let n = book.apply(&seed_snapshot(), 0);

        let bb = n.best_bid.unwrap();
        assert_eq!(bb.price, Price(10000));
        assert_eq!(bb.qty.0, 1.0);
        let ba = n.best_ask.unwrap();
        assert_eq!(ba.price, Price(10050));
        assert_eq!(ba.qty.0, 3.0);
        assert_eq!(n.seq, 1);
        book.assert_invariants();
    }

    #[test]
    fn incremental_improves_bid() {
        let mut book = Orderbook::new();
        book.apply(&seed_snapshot(), 0);

        let n = book.apply(
            &Update::Incremental { timestamp: 1001, side: Side::Bid, level: level(100.25, 5.0) },
            0,
        );

        let bb = n.best_bid.unwrap();
        assert_eq!(bb.price, Price(10025));
        assert_eq!(bb.qty.0, 5.0);
        assert_eq!(n.best_ask.unwrap().price, Price(10050));
        assert_eq!(n.seq, 2);
        assert_eq!(book.bid_depth(), 3);
        book.assert_invariants();
    }

    #[test]
    fn delete_current_best_ask_refreshes_cache() {
        let mut book = Orderbook::new();
        book.apply(&seed_snapshot(), 0);

        let n = book.apply(
            &Update::Incremental { timestamp: 1002, side: Side::Ask, level: level(100.50, 0.0) },
            0,
        );

        assert_eq!(book.ask_depth(), 1);
        let ba = n.best_ask.unwrap();
        assert_eq!(ba.price, Price(10100));
        assert_eq!(ba.qty.0, 4.0);
        assert_eq!(n.seq, 2);
        book.assert_invariants();
    }

    #[test]
    fn delete_on_empty_side_is_noop() {
        let mut book = Orderbook::new();
        let n = book.apply(
            &Update::Incremental { timestamp: 1, side: Side::Bid, level: level(100.00, 0.0) },
            0,
        );

        assert_eq!(book.bid_depth(), 0);
        assert!(n.best_bid.is_none());
        assert_eq!(n.seq, 1);
        book.assert_invariants();
    }

    #[test]
    fn delete_absent_price_leaves_cache_alone() {
        let mut book = Orderbook::new();
        book.apply(&seed_snapshot(), 0);

        let n = book.apply(
            &Update::Incremental { timestamp: 2, side: Side::Bid, level: level(98.00, 0.0) },
            0,
        );

        assert_eq!(n.best_bid.unwrap().price, Price(10000));
        assert_eq!(book.bid_depth(), 2);
        assert_eq!(n.seq, 2);
        book.assert_invariants();
    }

    #[test]
    fn overwrite_at_best_updates_cached_qty() {
        let mut book = Orderbook::new();
        book.apply(&seed_snapshot(), 0);

        let n = book.apply(
            &Update::Incremental { timestamp: 3, side: Side::Bid, level: level(100.00, 7.5) },
            0,
        );

        let bb = n.best_bid.unwrap();
        assert_eq!(bb.price, Price(10000));
        assert_eq!(bb.qty.0, 7.5);
        assert_eq!(book.bid_depth(), 2);
        book.assert_invariants();
    }

    #[test]
    fn duplicate_price_in_snapshot_last_wins() {
        let mut book = Orderbook::new();
        let n = book.apply(
            &Update::Snapshot {
                timestamp: 5,
                bids: vec![level(100.00, 1.0), level(100.00, 2.0)],
                asks: vec![],
            },
            0,
        );

        assert_eq!(book.bid_depth(), 1);
        let bb = n.best_bid.unwrap();
        assert_eq!(bb.price, Price(10000));
        assert_eq!(bb.qty.0, 2.0);
        book.assert_invariants();
    }

    #[test]
    fn zero_qty_snapshot_levels_dropped() {
        let mut book = Orderbook::new();
        book.apply(
            &Update::Snapshot {
                timestamp: 5,
                bids: vec![level(100.00, 0.0), level(99.00, 1.0)],
                asks: vec![level(101.00, 0.0)],
            },
            0,
        );

        assert_eq!(book.bid_depth(), 1);
        assert_eq!(book.ask_depth(), 0);
        assert_eq!(book.best_bid().unwrap().price, Price(9900));
        assert!(book.best_ask().is_none());
        book.assert_invariants();
    }

    #[test]
    fn snapshot_twice_is_idempotent() {
        let mut book = Orderbook::new();
        let snap = seed_snapshot();
        let first = book.apply(&snap, 10);
        let second = book.apply(&snap, 20);

        assert_eq!(first.best_bid.unwrap().price, second.best_bid.unwrap().price);
        assert_eq!(first.best_ask.unwrap().price, second.best_ask.unwrap().price);
        assert_eq!(first.update_timestamp, second.update_timestamp);
        assert_eq!(second.seq, first.seq + 1);
        assert_eq!(book.bid_depth(), 2);
        assert_eq!(book.ask_depth(), 2);
        book.assert_invariants();
    }

    #[test]
    fn incremental_before_snapshot_is_accepted() {
        let mut book = Orderbook::new();
        let n = book.apply(
            &Update::Incremental { timestamp: 1, side: Side::Ask, level: level(101.00, 2.0) },
            0,
        );

        assert_eq!(n.best_ask.unwrap().price, Price(10100));
        assert_eq!(book.ask_depth(), 1);
        book.assert_invariants();
    }

    #[test]
    fn crossed_book_is_permitted() {
        let mut book = Orderbook::new();
        book.apply(&seed_snapshot(), 0);
        book.apply(
            &Update::Incremental { timestamp: 9, side: Side::Bid, level: level(102.00, 1.0) },
            0,
        );

        assert_eq!(book.best_bid().unwrap().price, Price(10200));
        assert_eq!(book.best_ask().unwrap().price, Price(10050));
        book.assert_invariants();
    }
}
