// src/main.rs
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use anyhow::{bail, Context, Result};
use clap::Parser as ClapParser;
use tracing::info;

use lobpipe::book::Orderbook;
use lobpipe::clock::NanoClock;
use lobpipe::parser::CsvReader;
use lobpipe::ring::{self, DEFAULT_CAPACITY};
use lobpipe::strategy::run_strategy;
use lobpipe::types::BookNotification;

#[derive(ClapParser, Debug)]
#[command(name = "lobpipe", version, about = "L2 orderbook pipeline over a CSV update stream")]
struct Cli {
    /// Input CSV of orderbook updates.
    #[arg(default_value = "btc_orderbook_updates.csv")]
    file: PathBuf,

    /// Suppress the per-notification strategy log (benchmark runs).
    #[arg(long)]
    quiet: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();

    let cli = Cli::parse();

    let reader = CsvReader::open(&cli.file)?;
    let updates = reader.parse_all();
    info!("parsed {} updates from {}", updates.len(), cli.file.display());

    if updates.is_empty() {
        bail!("no updates parsed from {}", cli.file.display());
    }

    let clock = NanoClock::new();
    let (mut tx, rx) = ring::channel::<BookNotification, DEFAULT_CAPACITY>();
    let closed = AtomicBool::new(false);

    let mut book = Orderbook::new();
    let mut elapsed_ns = 0u64;

    let stats = thread::scope(|s| -> Result<_> {
        let strategy_clock = clock.clone();
        let closed_ref = &closed;
        let log_enabled = !cli.quiet;

        let strategy = thread::Builder::new()
            .name("strategy".to_string())
            .spawn_scoped(s, move || {
                run_strategy(rx, closed_ref, &strategy_clock, log_enabled)
            })
            .context("spawn strategy thread")?;

        let start = clock.now_ns();
        for update in &updates {
            let send_ns = clock.now_ns();
            let notif = book.apply(update, send_ns);
            tx.push(notif);
        }
        elapsed_ns = clock.now_ns() - start;

        // No push may follow this store; the consumer drains and exits.
        closed.store(true, Ordering::Release);

        match strategy.join() {
            Ok(stats) => Ok(stats),
            Err(_) => bail!("strategy thread panicked"),
        }
    })?;

    let elapsed_ms = elapsed_ns as f64 / 1_000_000.0;
    let throughput = if elapsed_ns > 0 {
        (updates.len() as f64 / elapsed_ns as f64) * 1_000_000_000.0
    } else {
        0.0
    };

    println!("\n=== Engine Summary ===");
    println!("Total updates:     {}", updates.len());
    println!("Engine time:       {:.2} ms", elapsed_ms);
    println!("Throughput:        {:.0} updates/sec", throughput);
    println!("Final book depth:  {} bids, {} asks", book.bid_depth(), book.ask_depth());
    if let Some(bb) = book.best_bid() {
        println!("Final best bid:    {:.2} @ {:.4}", bb.price.to_f64(), bb.qty.0);
    }
    if let Some(ba) = book.best_ask() {
        println!("Final best ask:    {:.2} @ {:.4}", ba.price.to_f64(), ba.qty.0);
    }

    println!("\n=== Strategy Latency (engine -> strategy) ===");
    println!("Updates received:  {}", stats.count);
    println!("Min latency:       {} ns", stats.min_latency_ns);
    println!("Max latency:       {} ns", stats.max_latency_ns);
    println!("Avg latency:       {} ns", stats.avg_latency_ns());
    println!("Median latency:    {} ns", stats.median());
    println!("P99 latency:       {} ns", stats.percentile(99.0));
    println!("P99.9 latency:     {} ns", stats.percentile(99.9));

    Ok(())
}
