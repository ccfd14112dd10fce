//! Symbol spelling translation between the engine and its data source.
//!
//! The engine uses one canonical spelling everywhere (`BRK.B`). Backtest
//! feeds spell share-class suffixes with a hyphen (`BRK-B`), so every host
//! call goes through [`SymbolMapper::to_source`] and every symbol the host
//! reports back goes through [`SymbolMapper::to_canonical`].

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SymbolMapper {
    backtesting: bool,
}

impl SymbolMapper {
    pub fn new(backtesting: bool) -> Self {
        Self { backtesting }
    }

    pub fn is_backtesting(&self) -> bool {
        self.backtesting
    }

    /// Canonical → source spelling.
    pub fn to_source(&self, symbol: &str) -> String {
        let s = symbol.trim().to_ascii_uppercase();
        if self.backtesting {
            s.replace('.', "-")
        } else {
            s
        }
    }

    /// Source → canonical spelling.
    ///
    /// Only a single-letter class suffix is rewritten (`BRK-B` → `BRK.B`);
    /// other hyphenated tickers pass through unchanged.
    pub fn to_canonical(&self, symbol: &str) -> String {
        let s = symbol.trim().to_ascii_uppercase();
        if self.backtesting && is_hyphen_class_ticker(&s) {
            s.replace('-', ".")
        } else {
            s
        }
    }
}

/// Matches `[A-Z]{1,5}-[A-Z]`.
fn is_hyphen_class_ticker(s: &str) -> bool {
    match s.split_once('-') {
        Some((root, class)) => {
            (1..=5).contains(&root.len())
                && root.bytes().all(|b| b.is_ascii_uppercase())
                && class.len() == 1
                && class.bytes().all(|b| b.is_ascii_uppercase())
        }
        None => false,
    }
}
