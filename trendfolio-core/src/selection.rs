//! Sector-capped top-N selection.
//!
//! Caps are a diversification preference, not a hard limit: when they leave
//! slots empty a second pass fills them in rank order ignoring sectors.

use crate::data::SectorMap;
use std::collections::{HashMap, HashSet};

/// Pick up to `max_positions` symbols from `ranked` (best first).
///
/// With an empty sector map this is plain top-N. Symbols without a sector
/// share the unknown-sector bucket and its cap.
pub fn select(
    ranked: &[String],
    max_positions: usize,
    max_sector_positions: usize,
    sectors: &SectorMap,
) -> Vec<String> {
    if sectors.is_empty() {
        return ranked.iter().take(max_positions).cloned().collect();
    }

    let mut per_sector: HashMap<&str, usize> = HashMap::new();
    let mut selected: Vec<String> = Vec::with_capacity(max_positions);
    for symbol in ranked {
        if selected.len() >= max_positions {
            break;
        }
        let count = per_sector.entry(sectors.sector_of(symbol)).or_insert(0);
        if *count >= max_sector_positions {
            continue;
        }
        *count += 1;
        selected.push(symbol.clone());
    }

    if selected.len() < max_positions {
        let taken: HashSet<String> = selected.iter().cloned().collect();
        let fill = ranked
            .iter()
            .filter(|s| !taken.contains(*s))
            .take(max_positions - selected.len())
            .cloned()
            .collect::<Vec<_>>();
        if !fill.is_empty() {
            tracing::debug!(filled = fill.len(), "[select] sector caps relaxed");
        }
        selected.extend(fill);
    }

    selected
}
