//! Left join of the concatenated time series against the reference table.

use super::tables::{ReferenceRow, SeriesRow};
use chrono::NaiveDateTime;
use std::collections::HashMap;

/// A series row with the reference attributes attached.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRow {
    pub symbol: String,
    pub timestamp: NaiveDateTime,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
    /// `None` when the symbol has no reference row or its sector is empty.
    pub sector: Option<String>,
}

impl JoinedRow {
    fn from_series(row: &SeriesRow, sector: Option<String>) -> Self {
        Self {
            symbol: row.symbol.clone(),
            timestamp: row.timestamp,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
            sector,
        }
    }
}

/// Left-join `series` to `reference` on the symbol.
///
/// Output follows series order. Symbols are matched exactly (case and
/// spelling). A symbol listed several times in the reference table produces
/// one joined row per reference row, in reference order.
pub fn left_join(series: &[SeriesRow], reference: &[ReferenceRow]) -> Vec<JoinedRow> {
    let mut sectors: HashMap<&str, Vec<Option<&str>>> = HashMap::new();
    for r in reference {
        sectors
            .entry(r.symbol.as_str())
            .or_default()
            .push(r.sector.as_deref());
    }

    let mut joined = Vec::with_capacity(series.len());
    for row in series {
        match sectors.get(row.symbol.as_str()) {
            Some(matches) => {
                for sector in matches {
                    joined.push(JoinedRow::from_series(row, sector.map(str::to_string)));
                }
            }
            None => joined.push(JoinedRow::from_series(row, None)),
        }
    }
    joined
}
