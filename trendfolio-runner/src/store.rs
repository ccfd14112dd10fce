//! CSV bar store — one file per ticker in a data directory.
//!
//! Files are named `TICKER.csv` or `TICKER_data.csv`. Headers are matched
//! case-insensitively; `date`, `open`, `high`, `low` and `close` are
//! required, `volume` and `sector` are optional. The date column may carry a
//! time or offset suffix; only the leading `YYYY-MM-DD` is used.
//!
//! Files are parsed in parallel. A file that fails to parse is logged and
//! left out; it never fails the whole store.

use chrono::NaiveDate;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use thiserror::Error;
use trendfolio_core::data::{normalize_ticker, SectorMap};
use trendfolio_core::domain::{Bar, Position};

/// Errors from the file layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("data directory not found: {0}")]
    MissingDir(PathBuf),

    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path}: missing required column '{column}'")]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("{path}: no usable rows")]
    NoRows { path: PathBuf },
}

impl StoreError {
    fn csv(path: &Path, source: csv::Error) -> Self {
        Self::Csv {
            path: path.to_path_buf(),
            source,
        }
    }
}

// ── File discovery ───────────────────────────────────────────────────

/// Ticker → file for every acceptable CSV in `dir`, sorted by ticker.
///
/// When both `X.csv` and `X_data.csv` exist, `X.csv` wins.
pub fn discover(dir: &Path) -> Result<BTreeMap<String, PathBuf>, StoreError> {
    if !dir.is_dir() {
        return Err(StoreError::MissingDir(dir.to_path_buf()));
    }
    let entries = std::fs::read_dir(dir).map_err(|source| StoreError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files: BTreeMap<String, PathBuf> = BTreeMap::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("csv") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let (raw, suffixed) = match stem.strip_suffix("_data") {
            Some(base) => (base, true),
            None => (stem, false),
        };
        let Some(ticker) = normalize_ticker(raw) else {
            tracing::debug!(file = %path.display(), "[store] skipped non-ticker file");
            continue;
        };
        match files.get(&ticker) {
            Some(_) if suffixed => {}
            _ => {
                files.insert(ticker, path);
            }
        }
    }
    Ok(files)
}

/// Sorted tickers found in `dir`, truncated to `limit`.
pub fn default_universe(dir: &Path, limit: usize) -> Result<Vec<String>, StoreError> {
    Ok(discover(dir)?.into_keys().take(limit).collect())
}

// ── CSV parsing ──────────────────────────────────────────────────────

/// Parsed contents of one ticker file.
#[derive(Debug, Clone, PartialEq)]
pub struct TickerFile {
    /// Ascending by date, one bar per date.
    pub bars: Vec<Bar>,
    /// First non-blank, non-"nan" sector value.
    pub sector: Option<String>,
}

struct Columns {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: Option<usize>,
    sector: Option<usize>,
}

impl Columns {
    fn from_headers(path: &Path, headers: &csv::StringRecord) -> Result<Self, StoreError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let require = |name: &'static str| {
            find(name).ok_or(StoreError::MissingColumn {
                path: path.to_path_buf(),
                column: name,
            })
        };
        Ok(Self {
            date: require("date")?,
            open: require("open")?,
            high: require("high")?,
            low: require("low")?,
            close: require("close")?,
            volume: find("volume"),
            sector: find("sector"),
        })
    }
}

fn parse_date(field: &str) -> Option<NaiveDate> {
    let head = field.trim().get(..10)?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

fn parse_f64(record: &csv::StringRecord, idx: usize) -> Option<f64> {
    record.get(idx)?.trim().parse::<f64>().ok()
}

/// Sort ascending; for repeated dates the later row wins.
fn sort_and_dedup(mut bars: Vec<Bar>) -> Vec<Bar> {
    bars.sort_by_key(|b| b.date);
    let mut out: Vec<Bar> = Vec::with_capacity(bars.len());
    for bar in bars {
        match out.last_mut() {
            Some(last) if last.date == bar.date => *last = bar,
            _ => out.push(bar),
        }
    }
    out
}

/// Read one ticker file.
pub fn read_ticker_file(path: &Path) -> Result<TickerFile, StoreError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| StoreError::csv(path, e))?;
    let headers = rdr.headers().map_err(|e| StoreError::csv(path, e))?.clone();
    let cols = Columns::from_headers(path, &headers)?;

    let mut bars = Vec::new();
    let mut sector: Option<String> = None;
    let mut skipped = 0usize;
    for record in rdr.records() {
        let record = record.map_err(|e| StoreError::csv(path, e))?;

        if sector.is_none() {
            if let Some(s) = cols.sector.and_then(|i| record.get(i)) {
                let s = s.trim();
                if !s.is_empty() && !s.eq_ignore_ascii_case("nan") {
                    sector = Some(s.to_string());
                }
            }
        }

        let date = record.get(cols.date).and_then(parse_date);
        let ohlc = (
            parse_f64(&record, cols.open),
            parse_f64(&record, cols.high),
            parse_f64(&record, cols.low),
            parse_f64(&record, cols.close),
        );
        let (Some(date), (Some(open), Some(high), Some(low), Some(close))) = (date, ohlc) else {
            skipped += 1;
            continue;
        };
        let volume = cols
            .volume
            .and_then(|i| parse_f64(&record, i))
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(|v| v as u64)
            .unwrap_or(0);
        bars.push(Bar {
            date,
            open,
            high,
            low,
            close,
            volume,
        });
    }

    if skipped > 0 {
        tracing::debug!(file = %path.display(), skipped, "[store] unparseable rows");
    }
    if bars.is_empty() {
        return Err(StoreError::NoRows {
            path: path.to_path_buf(),
        });
    }
    Ok(TickerFile {
        bars: sort_and_dedup(bars),
        sector,
    })
}

/// Sector of one file without keeping its bars.
pub fn read_sector(path: &Path) -> Result<Option<String>, StoreError> {
    Ok(read_ticker_file(path)?.sector)
}

/// Write bars (and an optional sector column) in the store's layout.
pub fn write_ticker_file(path: &Path, bars: &[Bar], sector: Option<&str>) -> Result<(), StoreError> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| StoreError::csv(path, e))?;
    let mut header = vec!["date", "open", "high", "low", "close", "volume"];
    if sector.is_some() {
        header.push("sector");
    }
    wtr.write_record(&header).map_err(|e| StoreError::csv(path, e))?;

    for b in bars {
        let mut row = vec![
            b.date.to_string(),
            b.open.to_string(),
            b.high.to_string(),
            b.low.to_string(),
            b.close.to_string(),
            b.volume.to_string(),
        ];
        if let Some(s) = sector {
            row.push(s.to_string());
        }
        wtr.write_record(&row).map_err(|e| StoreError::csv(path, e))?;
    }
    wtr.flush().map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ── Positions file ───────────────────────────────────────────────────

/// Read a `symbol,quantity` CSV. Zero quantities are dropped.
pub fn read_positions(path: &Path) -> Result<Vec<Position>, StoreError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| StoreError::csv(path, e))?;
    let mut positions = Vec::new();
    for row in rdr.deserialize::<Position>() {
        let pos = row.map_err(|e| StoreError::csv(path, e))?;
        if !pos.is_flat() {
            positions.push(pos);
        }
    }
    Ok(positions)
}

pub fn write_positions(path: &Path, positions: &[Position]) -> Result<(), StoreError> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| StoreError::csv(path, e))?;
    for pos in positions {
        wtr.serialize(pos).map_err(|e| StoreError::csv(path, e))?;
    }
    wtr.flush().map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ── Store ────────────────────────────────────────────────────────────

/// All bars of a data directory, keyed by canonical ticker.
#[derive(Debug, Clone, Default)]
pub struct BarStore {
    series: HashMap<String, Vec<Bar>>,
    sectors: SectorMap,
}

impl BarStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every ticker file in `dir`.
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        let files = discover(dir)?;
        let loaded: Vec<(String, Result<TickerFile, StoreError>)> = files
            .into_par_iter()
            .map(|(ticker, path)| {
                let parsed = read_ticker_file(&path);
                (ticker, parsed)
            })
            .collect();

        let mut store = Self::new();
        let mut failed = 0usize;
        for (ticker, parsed) in loaded {
            match parsed {
                Ok(file) => {
                    if let Some(sector) = &file.sector {
                        store.sectors.insert(ticker.clone(), sector.clone());
                    }
                    store.series.insert(ticker, file.bars);
                }
                Err(err) => {
                    failed += 1;
                    tracing::warn!(%ticker, error = %err, "[store] file skipped");
                }
            }
        }
        tracing::info!(
            dir = %dir.display(),
            symbols = store.series.len(),
            sectors = store.sectors.len(),
            failed,
            "[store] loaded"
        );
        Ok(store)
    }

    /// Add or replace a ticker's bars (sorted and de-duplicated).
    pub fn insert(&mut self, ticker: &str, bars: Vec<Bar>) {
        self.series
            .insert(ticker.trim().to_ascii_uppercase(), sort_and_dedup(bars));
    }

    pub fn set_sector(&mut self, ticker: &str, sector: &str) {
        self.sectors.insert(ticker.trim().to_ascii_uppercase(), sector);
    }

    pub fn bars(&self, ticker: &str) -> Option<&[Bar]> {
        self.series.get(ticker).map(|v| v.as_slice())
    }

    pub fn sector_map(&self) -> &SectorMap {
        &self.sectors
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Sorted tickers, truncated to `limit`. Only tickers with the common
    /// US equity shape are offered.
    pub fn default_universe(&self, limit: usize) -> Vec<String> {
        let mut tickers: Vec<String> = self
            .series
            .keys()
            .filter_map(|t| normalize_ticker(t))
            .collect();
        tickers.sort();
        tickers.dedup();
        tickers.truncate(limit);
        tickers
    }

    /// Latest bar date across every ticker.
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.series
            .values()
            .filter_map(|bars| bars.last().map(|b| b.date))
            .max()
    }
}
