//! Deterministic synthetic bars for demos and tests.
//!
//! Each symbol gets its own random walk seeded from the BLAKE3 hash of its
//! name, so the same symbol always produces the same history. Weekends are
//! skipped; holidays are not modelled.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;
use trendfolio_core::domain::Bar;

use crate::store::{write_ticker_file, BarStore, StoreError};

/// Sector labels handed out round-robin by [`write_synthetic_dir`].
const SECTORS: [&str; 5] = ["Technology", "Healthcare", "Finance", "Energy", "Consumer"];

fn rng_for(symbol: &str) -> StdRng {
    let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
    StdRng::from_seed(seed)
}

/// Weekday bars from `start` through `end` inclusive.
pub fn generate_bars(symbol: &str, start: NaiveDate, end: NaiveDate) -> Vec<Bar> {
    let mut rng = rng_for(symbol);

    // per-symbol drift so some names trend and some do not
    let drift: f64 = rng.gen_range(-0.0006..0.0012);
    let mut price: f64 = rng.gen_range(20.0..250.0);
    let mut bars = Vec::new();
    let mut current = start;

    while current <= end {
        if matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            current += Duration::days(1);
            continue;
        }

        let daily_return: f64 = drift + rng.gen_range(-0.02..0.02);
        let open = price;
        let close = (price * (1.0 + daily_return)).max(0.01);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
        let volume = rng.gen_range(500_000..5_000_000u64);

        bars.push(Bar {
            date: current,
            open,
            high,
            low,
            close,
            volume,
        });

        price = close;
        current += Duration::days(1);
    }

    bars
}

/// In-memory store of synthetic histories.
pub fn synthetic_store(symbols: &[&str], start: NaiveDate, end: NaiveDate) -> BarStore {
    let mut store = BarStore::new();
    for (i, symbol) in symbols.iter().enumerate() {
        store.insert(symbol, generate_bars(symbol, start, end));
        store.set_sector(symbol, SECTORS[i % SECTORS.len()]);
    }
    store
}

/// Write one `TICKER.csv` per symbol into `dir`, with a sector column.
pub fn write_synthetic_dir(
    dir: &Path,
    symbols: &[&str],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<usize, StoreError> {
    std::fs::create_dir_all(dir).map_err(|source| StoreError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    for (i, symbol) in symbols.iter().enumerate() {
        let ticker = symbol.trim().to_ascii_uppercase();
        let bars = generate_bars(&ticker, start, end);
        let path = dir.join(format!("{ticker}.csv"));
        write_ticker_file(&path, &bars, Some(SECTORS[i % SECTORS.len()]))?;
    }
    Ok(symbols.len())
}
