// src/strategy.rs
//! Strategy consumer: drains the notification ring on its own thread,
//! timestamps each receipt, and accumulates latency statistics.

use std::sync::atomic::AtomicBool;

use tracing::info;

use crate::clock::NanoClock;
use crate::ring::Consumer;
use crate::types::{BookNotification, Level};

/// Run the consumer loop until the close flag is set and the ring is empty.
///
/// Every notification is timestamped on receipt; the engine-to-strategy
/// latency is `recv_ns - engine_send_ns` (saturating, the clocks are clones
/// of one calibration). With `log_enabled` each notification also emits one
/// line under the `strategy` target.
pub fn run_strategy<const N: usize>(
    mut rx: Consumer<BookNotification, N>,
    closed: &AtomicBool,
    clock: &NanoClock,
    log_enabled: bool,
) -> StrategyStats {
    let mut stats = StrategyStats::new();

    while let Some(notif) = rx.pop(closed) {
        let recv_ns = clock.now_ns();
        let latency_ns = recv_ns.saturating_sub(notif.engine_send_ns);
        stats.record(latency_ns);

        if log_enabled {
            info!(
                target: "strategy",
                "seq={:<6} ts={} best_bid={:<20} best_ask={:<20} lat={}ns",
                notif.seq,
                notif.update_timestamp,
                fmt_level(notif.best_bid),
                fmt_level(notif.best_ask),
                latency_ns,
            );
        }
    }

    stats
}

fn fmt_level(level: Option<Level>) -> String {
    match level {
        Some(l) => format!("{:.2} @ {:.4}", l.price.to_f64(), l.qty.0),
        None => "empty".to_string(),
    }
}

/// Latency statistics for one run. Owned by the consumer thread until join.
pub struct StrategyStats {
    pub count: u64,
    pub total_latency_ns: u64,
    pub min_latency_ns: u64,
    pub max_latency_ns: u64,
    /// Every sample, kept for end-of-run percentiles.
    pub latencies: Vec<u64>,
}

impl StrategyStats {
    pub fn new() -> Self {
        Self {
            count: 0,
            total_latency_ns: 0,
            min_latency_ns: u64::MAX,
            max_latency_ns: 0,
            latencies: Vec::with_capacity(8192),
        }
    }

    #[inline(always)]
    pub fn record(&mut self, latency_ns: u64) {
        self.count += 1;
        self.total_latency_ns += latency_ns;
        self.min_latency_ns = self.min_latency_ns.min(latency_ns);
        self.max_latency_ns = self.max_latency_ns.max(latency_ns);
        self.latencies.push(latency_ns);
    }

    pub fn avg_latency_ns(&self) -> u64 {
        if self.count == 0 {
            return 0;
        }
        self.total_latency_ns / self.count
    }

    /// Percentile by sorting a copy; O(n log n), done once at end of run.
    pub fn percentile(&self, p: f64) -> u64 {
        if self.latencies.is_empty() {
            return 0;
        }
        let mut sorted = self.latencies.clone();
        sorted.sort_unstable();
        let idx = ((p / 100.0) * (sorted.len() as f64 - 1.0)) as usize;
        sorted[idx.min(sorted.len() - 1)]
    }

    pub fn median(&self) -> u64 {
        self.percentile(50.0)
    }
}

impl Default for StrategyStats {
    fn default() -> Self {
        Self::new()
    }
}
