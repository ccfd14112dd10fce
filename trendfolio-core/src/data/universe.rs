//! Universe helpers — sector lookup and ticker normalization.
//!
//! Sectors are optional: with an empty [`SectorMap`] the selector degrades to
//! plain top-N. Sector data can be supplied either symbol-by-symbol or in the
//! sector-organized layout (`sector → [tickers]`) used by universe files.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Label used for symbols with no sector entry.
pub const UNKNOWN_SECTOR: &str = "UNKNOWN";

/// Symbol → sector label. Loaded once, read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectorMap {
    by_symbol: HashMap<String, String>,
}

impl SectorMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(symbol, sector)` pairs. Blank sectors are ignored.
    pub fn from_pairs<I, S, T>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: Into<String>,
    {
        let mut map = Self::new();
        for (symbol, sector) in pairs {
            map.insert(symbol, sector);
        }
        map
    }

    /// Build from the sector-organized layout.
    pub fn from_sectors(sectors: &BTreeMap<String, Vec<String>>) -> Self {
        Self::from_pairs(sectors.iter().flat_map(|(sector, tickers)| {
            tickers.iter().map(move |t| (t.clone(), sector.clone()))
        }))
    }

    pub fn insert(&mut self, symbol: impl Into<String>, sector: impl Into<String>) {
        let sector = sector.into();
        let trimmed = sector.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
            return;
        }
        self.by_symbol.insert(symbol.into(), trimmed.to_string());
    }

    pub fn get(&self, symbol: &str) -> Option<&str> {
        self.by_symbol.get(symbol).map(|s| s.as_str())
    }

    /// Sector of `symbol`, or [`UNKNOWN_SECTOR`].
    pub fn sector_of(&self, symbol: &str) -> &str {
        self.get(symbol).unwrap_or(UNKNOWN_SECTOR)
    }

    /// Distinct sector labels, sorted.
    pub fn sector_names(&self) -> Vec<&str> {
        let names: BTreeSet<&str> = self.by_symbol.values().map(|s| s.as_str()).collect();
        names.into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.by_symbol.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_symbol.is_empty()
    }
}

/// Normalize a raw ticker (e.g. a file stem) and accept it only if it looks
/// like a common US equity symbol: `[A-Z]{1,5}` with an optional `.X` class
/// suffix.
pub fn normalize_ticker(raw: &str) -> Option<String> {
    let t: String = raw
        .trim()
        .to_ascii_uppercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '.' || *c == '-')
        .collect();

    let (root, class) = match t.split_once('.') {
        Some((root, class)) => (root, Some(class)),
        None => (t.as_str(), None),
    };
    let root_ok = (1..=5).contains(&root.len()) && root.bytes().all(|b| b.is_ascii_uppercase());
    let class_ok = match class {
        Some(c) => c.len() == 1 && c.bytes().all(|b| b.is_ascii_uppercase()),
        None => true,
    };

    if root_ok && class_ok {
        Some(t)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_sector_fallback() {
        let map = SectorMap::from_pairs([("AAPL", "Technology")]);
        assert_eq!(map.sector_of("AAPL"), "Technology");
        assert_eq!(map.sector_of("XOM"), UNKNOWN_SECTOR);
    }

    #[test]
    fn blank_and_nan_sectors_are_ignored() {
        let map = SectorMap::from_pairs([("A", " "), ("B", "nan"), ("C", "Energy ")]);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("C"), Some("Energy"));
    }

    #[test]
    fn sector_organized_layout_flattens() {
        let mut sectors = BTreeMap::new();
        sectors.insert("Energy".to_string(), vec!["XOM".to_string(), "CVX".to_string()]);
        sectors.insert("Technology".to_string(), vec!["AAPL".to_string()]);
        let map = SectorMap::from_sectors(&sectors);
        assert_eq!(map.len(), 3);
        assert_eq!(map.sector_of("CVX"), "Energy");
        assert_eq!(map.sector_names(), vec!["Energy", "Technology"]);
    }

    #[test]
    fn ticker_normalization() {
        assert_eq!(normalize_ticker("aapl"), Some("AAPL".into()));
        assert_eq!(normalize_ticker("brk.b"), Some("BRK.B".into()));
        assert_eq!(normalize_ticker(" spy "), Some("SPY".into()));
        assert_eq!(normalize_ticker("TOOLONG"), None);
        assert_eq!(normalize_ticker("BRK.BB"), None);
        assert_eq!(normalize_ticker("BRK-B"), None);
        assert_eq!(normalize_ticker("A1"), None);
        assert_eq!(normalize_ticker(""), None);
    }
}
