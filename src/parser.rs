// src/parser.rs
//! CSV ingest adapter.
//!
//! Memory-maps the input file and materializes every update before the hot
//! loop starts, so the production loop never touches the filesystem.
//! Ingestion is best-effort: lines that do not parse are skipped silently.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use memmap2::Mmap;

use crate::types::{Level, Price, Qty, Side, Timestamp, Update};

/// Memory-mapped reader for the orderbook update CSV.
pub struct CsvReader {
    mmap: Mmap,
}

impl CsvReader {
    /// Open and map the file. Failure here is the only fatal ingest error.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("open input file {}", path.display()))?;
        let mmap = unsafe { Mmap::map(&file) }
            .with_context(|| format!("mmap input file {}", path.display()))?;
        #[cfg(unix)]
        {
            let _ = mmap.advise(memmap2::Advice::Sequential);
        }
        Ok(Self { mmap })
    }

    /// Parse every line after the header into a `Vec<Update>`.
    pub fn parse_all(&self) -> Vec<Update> {
        let mut updates = Vec::with_capacity(4096);

        // skip(1): header line
        for raw in self.mmap.split(|&b| b == b'\n').skip(1) {
            let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
            if raw.is_empty() {
                continue;
            }
            let Ok(line) = std::str::from_utf8(raw) else { continue };
            if let Some(update) = parse_line(line) {
                updates.push(update);
            }
        }

        updates
    }
}

/// Dispatch on the first byte: `s` snapshot, `i` incremental, else skip.
fn parse_line(line: &str) -> Option<Update> {
    match line.as_bytes().first()? {
        b's' => parse_snapshot(line),
        b'i' => parse_incremental(line),
        _ => None,
    }
}

/// Snapshot row:
/// `snapshot,<exchange>,<symbol>,<timestamp>,,"[[p,q],...]","[[p,q],...]",,`
///
/// The level arrays contain commas, so the field split must respect quotes.
fn parse_snapshot(line: &str) -> Option<Update> {
    let fields = split_fields(line);
    if fields.len() < 7 {
        return None;
    }

    let timestamp: Timestamp = fields[3].parse().ok()?;
    let bids = parse_levels(fields[5].trim_matches('"'))?;
    let asks = parse_levels(fields[6].trim_matches('"'))?;

    Some(Update::Snapshot { timestamp, bids, asks })
}

/// Incremental row:
/// `incremental,<exchange>,<symbol>,<timestamp>,<bid|ask>,,,<price>,<qty>`
fn parse_incremental(line: &str) -> Option<Update> {
    let fields = split_fields(line);
    if fields.len() < 9 {
        return None;
    }

    let timestamp: Timestamp = fields[3].parse().ok()?;
    let side = if fields[4].as_bytes().first() == Some(&b'b') {
        Side::Bid
    } else {
        Side::Ask
    };
    let price: f64 = fields[7].parse().ok()?;
    let qty: f64 = fields[8].parse().ok()?;

    Some(Update::Incremental {
        timestamp,
        side,
        level: Level { price: Price::from_f64(price), qty: Qty(qty) },
    })
}

/// Split a CSV line on commas, treating `"`-quoted stretches as opaque.
fn split_fields(line: &str) -> Vec<&str> {
    let mut fields = Vec::with_capacity(9);
    let mut start = 0;
    let mut in_quotes = false;
    let bytes = line.as_bytes();

    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'"' => in_quotes = !in_quotes,
            b',' if !in_quotes => {
                fields.push(&line[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    fields.push(&line[start..]);
    fields
}

/// Decode a JSON array of `[price, qty]` pairs.
fn parse_levels(s: &str) -> Option<Vec<Level>> {
    let pairs: Vec<(f64, f64)> = serde_json::from_str(s).ok()?;
    Some(
        pairs
            .into_iter()
            .map(|(price, qty)| Level { price: Price::from_f64(price), qty: Qty(qty) })
            .collect(),
    )
}
