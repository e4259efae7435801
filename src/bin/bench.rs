// src/bin/bench.rs
//! Offline benchmark suite: parse throughput, isolated engine throughput,
//! end-to-end throughput through the ring, and the hand-off latency
//! distribution of the final run.

use std::hint::black_box;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use anyhow::{bail, Context, Result};
use clap::Parser as ClapParser;

use lobpipe::book::Orderbook;
use lobpipe::clock::NanoClock;
use lobpipe::parser::CsvReader;
use lobpipe::ring::{self, DEFAULT_CAPACITY};
use lobpipe::strategy::run_strategy;
use lobpipe::types::{BookNotification, Update};

const WARMUP_ITERATIONS: usize = 5;
const BENCH_ITERATIONS: usize = 20;

#[derive(ClapParser, Debug)]
#[command(name = "bench", about = "Benchmark suite for the orderbook pipeline")]
struct Cli {
    /// Input CSV of orderbook updates.
    #[arg(default_value = "btc_orderbook_updates.csv")]
    file: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let clock = NanoClock::new();

    println!("== bench 1: csv parse ==");
    let reader = CsvReader::open(&cli.file)?;

    for _ in 0..WARMUP_ITERATIONS {
        black_box(reader.parse_all());
    }

    let mut parse_times = Vec::with_capacity(BENCH_ITERATIONS);
    let mut updates = Vec::new();
    for _ in 0..BENCH_ITERATIONS {
        let start = clock.now_ns();
        updates = reader.parse_all();
        parse_times.push(clock.now_ns() - start);
    }
    if updates.is_empty() {
        bail!("no updates parsed from {}", cli.file.display());
    }

    let min_parse = *parse_times.iter().min().unwrap();
    let avg_parse = parse_times.iter().sum::<u64>() / parse_times.len() as u64;
    println!("updates:          {}", updates.len());
    println!("avg parse time:   {:.2} us", avg_parse as f64 / 1000.0);
    println!("min parse time:   {:.2} us", min_parse as f64 / 1000.0);
    println!("parse throughput: {:.0} updates/sec", rate(updates.len(), min_parse));

    println!("\n== bench 2: engine, no ring ==");
    for _ in 0..WARMUP_ITERATIONS {
        run_engine_only(&updates);
    }

    let mut engine_times = Vec::with_capacity(BENCH_ITERATIONS);
    for _ in 0..BENCH_ITERATIONS {
        let start = clock.now_ns();
        let book = run_engine_only(&updates);
        engine_times.push(clock.now_ns() - start);
        black_box(book.best_bid());
    }

    let min_engine = *engine_times.iter().min().unwrap();
    let avg_engine = engine_times.iter().sum::<u64>() / engine_times.len() as u64;
    println!("avg engine time:  {:.2} us", avg_engine as f64 / 1000.0);
    println!("min engine time:  {:.2} us", min_engine as f64 / 1000.0);
    println!("per update:       {:.0} ns", min_engine as f64 / updates.len() as f64);
    println!("engine throughput: {:.0} updates/sec", rate(updates.len(), min_engine));

    println!("\n== bench 3: end to end, engine + ring + strategy ==");
    let mut e2e_times = Vec::with_capacity(BENCH_ITERATIONS);
    let mut last_stats = None;

    for i in 0..BENCH_ITERATIONS {
        let (mut tx, rx) = ring::channel::<BookNotification, DEFAULT_CAPACITY>();
        let closed = AtomicBool::new(false);
        let start = clock.now_ns();

        let stats = thread::scope(|s| -> Result<_> {
            let strategy_clock = clock.clone();
            let closed_ref = &closed;
            let strategy = thread::Builder::new()
                .name(format!("bench-strategy-{i}"))
                .spawn_scoped(s, move || run_strategy(rx, closed_ref, &strategy_clock, false))
                .context("spawn strategy thread")?;

            let mut book = Orderbook::new();
            for update in &updates {
                let send_ns = clock.now_ns();
                tx.push(book.apply(update, send_ns));
            }
            closed.store(true, Ordering::Release);

            match strategy.join() {
                Ok(stats) => Ok(stats),
                Err(_) => bail!("strategy thread panicked"),
            }
        })?;

        e2e_times.push(clock.now_ns() - start);
        last_stats = Some(stats);
    }

    let min_e2e = *e2e_times.iter().min().unwrap();
    let avg_e2e = e2e_times.iter().sum::<u64>() / e2e_times.len() as u64;
    println!("avg e2e time:     {:.2} us", avg_e2e as f64 / 1000.0);
    println!("min e2e time:     {:.2} us", min_e2e as f64 / 1000.0);
    println!("e2e throughput:   {:.0} updates/sec", rate(updates.len(), min_e2e));

    println!("\n== bench 4: engine -> strategy latency ==");
    if let Some(stats) = &last_stats {
        println!("samples:          {}", stats.count);
        println!("min latency:      {} ns", stats.min_latency_ns);
        println!("max latency:      {} ns", stats.max_latency_ns);
        println!("avg latency:      {} ns", stats.avg_latency_ns());
        println!("median (p50):     {} ns", stats.median());
        println!("p90 latency:      {} ns", stats.percentile(90.0));
        println!("p95 latency:      {} ns", stats.percentile(95.0));
        println!("p99 latency:      {} ns", stats.percentile(99.0));
        println!("p99.9 latency:    {} ns", stats.percentile(99.9));
    }

    Ok(())
}

fn run_engine_only(updates: &[Update]) -> Orderbook {
    let mut book = Orderbook::new();
    for update in updates {
        black_box(book.apply(update, 0));
    }
    book
}

fn rate(count: usize, elapsed_ns: u64) -> f64 {
    if elapsed_ns == 0 {
        return 0.0;
    }
    (count as f64 / elapsed_ns as f64) * 1_000_000_000.0
}
