//! Turn provider output into a series the engine accepts.
//!
//! Sorts by date, keeps the last row for a duplicated date, and drops void or
//! insane bars. The result is strictly increasing in date.

use serde::{Deserialize, Serialize};

use super::provider::RawBar;
use crate::domain::Bar;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalizeReport {
    pub duplicates_removed: usize,
    pub invalid_removed: usize,
}

impl CanonicalizeReport {
    pub fn is_clean(&self) -> bool {
        self.duplicates_removed == 0 && self.invalid_removed == 0
    }
}

pub fn canonicalize(symbol: &str, mut raw: Vec<RawBar>) -> (Vec<Bar>, CanonicalizeReport) {
    let mut report = CanonicalizeReport::default();

    // Stable sort keeps provider order among equal dates, so "last wins" is
    // the last row the provider sent for that date.
    raw.sort_by_key(|b| b.date);

    let mut bars: Vec<Bar> = Vec::with_capacity(raw.len());
    for r in raw {
        let bar = Bar {
            symbol: symbol.to_string(),
            date: r.date,
            open: r.open,
            high: r.high,
            low: r.low,
            close: r.close,
            volume: r.volume,
            adj_close: r.adj_close,
        };
        if !bar.is_sane() {
            report.invalid_removed += 1;
            continue;
        }
        match bars.last_mut() {
            Some(prev) if prev.date == bar.date => {
                *prev = bar;
                report.duplicates_removed += 1;
            }
            _ => bars.push(bar),
        }
    }

    if !report.is_clean() {
        tracing::warn!(
            symbol,
            duplicates = report.duplicates_removed,
            invalid = report.invalid_removed,
            "provider series needed cleanup"
        );
    }
    (bars, report)
}
