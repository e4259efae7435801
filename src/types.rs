// src/types.rs
//! Core value types shared by the parser, the book engine, and the strategy.
//!
//! Everything here is small, `Copy`, and cache-friendly. Prices are fixed
//! point so that all hot-path comparisons are exact integer comparisons.

/// Fixed-point price with two decimal places, stored as `round(price * 100)`.
///
/// Integer keys give exact ordering in the book's sorted maps and keep NaN
/// and denormal values out of hot comparisons.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Price(pub u64);

impl Price {
    /// Convert from a float price, rounding half up to two decimals.
    #[inline(always)]
    pub fn from_f64(p: f64) -> Self {
        Price((p * 100.0 + 0.5) as u64)
    }

    /// Convert back to a float for display only.
    #[inline(always)]
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }
}

/// Threshold under which a quantity counts as zero.
pub const QTY_ZERO_EPS: f64 = 1e-15;

/// Resting quantity at a price level. Storage and display only; the engine
/// performs no arithmetic on it.
#[derive(Clone, Copy, Debug)]
pub struct Qty(pub f64);

impl Qty {
    /// Zero quantity in an incremental update means "delete this level".
    #[inline(always)]
    pub fn is_zero(self) -> bool {
        self.0 <= QTY_ZERO_EPS
    }
}

/// One rung of the book: a price and the quantity resting at it.
#[derive(Clone, Copy, Debug)]
pub struct Level {
    pub price: Price,
    pub qty: Qty,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Side {
    Bid = 0,
    Ask = 1,
}

/// Upstream timestamp in nanoseconds. Opaque to the engine; forwarded as-is.
pub type Timestamp = u64;

/// An orderbook update: either a full replacement of both sides or a single
/// level delta on one side.
#[derive(Clone, Debug)]
pub enum Update {
    Snapshot {
        timestamp: Timestamp,
        bids: Vec<Level>,
        asks: Vec<Level>,
    },
    Incremental {
        timestamp: Timestamp,
        side: Side,
        level: Level,
    },
}

/// Per-update output record handed from the engine to the strategy.
///
/// Cache-line aligned so one notification spans at most two lines on its way
/// through the ring.
#[derive(Clone, Copy, Debug)]
#[repr(align(64))]
pub struct BookNotification {
    /// Timestamp of the update that produced this notification.
    pub update_timestamp: Timestamp,
    /// Monotonic nanosecond clock sampled by the driver just before apply.
    pub engine_send_ns: u64,
    /// Cached best bid after the mutation, `None` on an empty side.
    pub best_bid: Option<Level>,
    /// Cached best ask after the mutation, `None` on an empty side.
    pub best_ask: Option<Level>,
    /// Strictly increasing, 1 for the first applied update.
    pub seq: u64,
}
