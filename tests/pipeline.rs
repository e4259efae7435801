// tests/pipeline.rs
//! Cross-thread pipeline scenarios: engine output through the ring into the
//! strategy loop, with a small ring forcing producer backpressure.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use lobpipe::book::Orderbook;
use lobpipe::clock::NanoClock;
use lobpipe::ring;
use lobpipe::strategy::run_strategy;
use lobpipe::types::{BookNotification, Level, Price, Qty, Side, Update};

#[test]
fn latency_pipe_capacity_four() {
    let clock = NanoClock::new();
    let (mut tx, mut rx) = ring::channel::<BookNotification, 4>();
    let closed = AtomicBool::new(false);

    let mut book = Orderbook::new();
    let updates: Vec<Update> = (0..10)
        .map(|i| Update::Incremental {
            timestamp: 1000 + i,
            side: Side::Bid,
            level: Level { price: Price(10000 + i), qty: Qty(1.0) },
        })
        .collect();

    thread::scope(|s| {
        let consumer = s.spawn(|| {
            let mut seen = Vec::new();
            let mut recv_clock_ns = Vec::new();
            while let Some(notif) = rx.pop(&closed) {
                recv_clock_ns.push((clock.now_ns(), notif.engine_send_ns));
                seen.push(notif.seq);
            }
            (seen, recv_clock_ns)
        });

        for update in &updates {
            let send_ns = clock.now_ns();
            tx.push(book.apply(update, send_ns));
        }
        closed.store(true, Ordering::Release);

        let (seen, recv_clock_ns) = consumer.join().unwrap();
        assert_eq!(seen, (1..=10).collect::<Vec<u64>>());
        for (recv_ns, send_ns) in recv_clock_ns {
            assert!(recv_ns >= send_ns);
        }
    });
}

#[test]
fn strategy_loop_records_every_notification() {
    let clock = NanoClock::new();
    let (mut tx, rx) = ring::channel::<BookNotification, 4>();
    let closed = AtomicBool::new(false);

    let mut book = Orderbook::new();

    let stats = thread::scope(|s| {
        let strategy_clock = clock.clone();
        let closed_ref = &closed;
        let strategy = s.spawn(move || run_strategy(rx, closed_ref, &strategy_clock, false));

        for i in 0..10u64 {
            let update = Update::Incremental {
                timestamp: 2000 + i,
                side: Side::Ask,
                level: Level { price: Price(20000 - i), qty: Qty(0.5) },
            };
            let send_ns = clock.now_ns();
            tx.push(book.apply(&update, send_ns));
        }
        closed.store(true, Ordering::Release);

        strategy.join().unwrap()
    });

    assert_eq!(stats.count, 10);
    assert_eq!(stats.latencies.len(), 10);
    assert!(stats.min_latency_ns <= stats.max_latency_ns);
    assert!(stats.total_latency_ns >= stats.max_latency_ns);
    assert_eq!(book.best_ask().unwrap().price, Price(19991));
}

#[test]
fn close_after_k_pushes_yields_exactly_k_pops() {
    let (mut tx, mut rx) = ring::channel::<u64, 8>();
    let closed = AtomicBool::new(false);

    for i in 0..5 {
        tx.push(i);
    }
    closed.store(true, Ordering::Release);

    let mut popped = Vec::new();
    while let Some(v) = rx.pop(&closed) {
        popped.push(v);
    }
    assert_eq!(popped, vec![0, 1, 2, 3, 4]);
    assert!(rx.pop(&closed).is_none());
}
