//! # lobpipe - Ultra-Low-Latency L2 Orderbook Pipeline
//!
//! In-process core of a Level-2 market-data pipeline: a stream of orderbook
//! updates (full snapshots and incremental deltas) feeds an incremental book
//! engine, and every resulting notification is handed to a strategy consumer
//! on a second thread through a lock-free SPSC ring.
//!
//! ## Architecture
//!
//! ```text
//! [CSV mmap reader] -> parse_all() -> Vec<Update>
//!       |
//! [engine thread] - applies each update to the Orderbook, pushes a
//!       |           BookNotification into the ring
//!       v  (lock-free SPSC ring, 4096 slots)
//! [strategy thread] - pops until closed, records engine->strategy latency
//! ```
//!
//! The engine mutates the book in O(log P) and answers best-of-book in O(1)
//! from a monotonically maintained cache. The ring needs no CAS on the hot
//! path; a per-slot sequence counter with acquire/release pairing publishes
//! each notification in well under a microsecond.
//!
//! ## Example
//!
//! ```rust
//! use lobpipe::book::Orderbook;
//! use lobpipe::ring;
//! use lobpipe::types::{BookNotification, Level, Price, Qty, Update};
//!
//! let mut book = Orderbook::new();
//! let (mut tx, mut rx) = ring::channel::<BookNotification, 16>();
//!
//! let snap = Update::Snapshot {
//!     timestamp: 1000,
//!     bids: vec![Level { price: Price::from_f64(100.00), qty: Qty(1.0) }],
//!     asks: vec![Level { price: Price::from_f64(100.50), qty: Qty(3.0) }],
//! };
//! tx.push(book.apply(&snap, 0));
//!
//! let notif = rx.try_pop().unwrap();
//! assert_eq!(notif.seq, 1);
//! ```

pub mod book;
pub mod clock;
pub mod parser;
pub mod ring;
pub mod strategy;
pub mod types;
