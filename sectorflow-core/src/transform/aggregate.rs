//! Window/sector filter and per-sector aggregation.

use super::join::JoinedRow;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-sector summary persisted by the sink.
///
/// Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRow {
    #[serde(rename = "Sector")]
    pub sector: String,
    /// Mean of `open`.
    pub open: Option<f64>,
    /// Mean of `close`.
    pub close: Option<f64>,
    /// Max of `high`.
    pub high: Option<f64>,
    /// Min of `low`.
    pub low: Option<f64>,
    /// Mean of `volume`.
    pub volume: Option<f64>,
}

impl AggregateRow {
    pub const COLUMNS: [&'static str; 6] = ["Sector", "open", "close", "high", "low", "volume"];
}

/// Inclusive timestamp window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DateWindow {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    /// Window from midnight of `start` to midnight of `end`, both inclusive.
    ///
    /// Intraday rows later than midnight on `end` fall outside.
    pub fn from_dates(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: start.and_time(NaiveTime::MIN),
            end: end.and_time(NaiveTime::MIN),
        }
    }

    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        self.start <= ts && ts <= self.end
    }
}

pub const DEFAULT_START: NaiveDate = const_date(2021, 1, 1);
pub const DEFAULT_END: NaiveDate = const_date(2021, 5, 26);

const fn const_date(year: i32, month: u32, day: u32) -> NaiveDate {
    match NaiveDate::from_ymd_opt(year, month, day) {
        Some(date) => date,
        None => panic!("invalid calendar date"),
    }
}

impl Default for DateWindow {
    fn default() -> Self {
        Self::from_dates(DEFAULT_START, DEFAULT_END)
    }
}

pub const DEFAULT_SECTORS: [&str; 2] = ["TECHNOLOGY", "FINANCE"];

/// Which joined rows take part in the persisted aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub window: DateWindow,
    /// Exact, case-sensitive sector names.
    pub sectors: Vec<String>,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            window: DateWindow::default(),
            sectors: DEFAULT_SECTORS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl FilterCriteria {
    pub fn matches(&self, row: &JoinedRow) -> bool {
        self.window.contains(row.timestamp)
            && row
                .sector
                .as_deref()
                .is_some_and(|s| self.sectors.iter().any(|wanted| wanted == s))
    }
}

/// Rows inside the window whose sector is in the sector set.
pub fn filter_rows<'a>(rows: &'a [JoinedRow], criteria: &FilterCriteria) -> Vec<&'a JoinedRow> {
    rows.iter().filter(|r| criteria.matches(r)).collect()
}

#[derive(Debug, Default)]
struct Mean {
    sum: f64,
    count: usize,
}

impl Mean {
    fn push(&mut self, v: Option<f64>) {
        if let Some(v) = v.filter(|v| !v.is_nan()) {
            self.sum += v;
            self.count += 1;
        }
    }

    fn value(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

fn fold_extreme(acc: Option<f64>, v: Option<f64>, pick: fn(f64, f64) -> f64) -> Option<f64> {
    match (acc, v.filter(|v| !v.is_nan())) {
        (Some(a), Some(v)) => Some(pick(a, v)),
        (None, v) => v,
        (a, None) => a,
    }
}

#[derive(Debug, Default)]
struct SectorAccumulator {
    open: Mean,
    close: Mean,
    high: Option<f64>,
    low: Option<f64>,
    volume: Mean,
}

impl SectorAccumulator {
    fn push(&mut self, row: &JoinedRow) {
        self.open.push(row.open);
        self.close.push(row.close);
        self.high = fold_extreme(self.high, row.high, f64::max);
        self.low = fold_extreme(self.low, row.low, f64::min);
        self.volume.push(row.volume);
    }

    fn finish(self, sector: String) -> AggregateRow {
        AggregateRow {
            sector,
            open: self.open.value(),
            close: self.close.value(),
            high: self.high,
            low: self.low,
            volume: self.volume.value(),
        }
    }
}

/// Group by sector: mean(open), mean(close), max(high), min(low), mean(volume).
///
/// Rows without a sector are dropped. Missing and NaN values are skipped.
/// Output is ordered by sector name ascending.
pub fn aggregate_by_sector<'a, I>(rows: I) -> Vec<AggregateRow>
where
    I: IntoIterator<Item = &'a JoinedRow>,
{
    let mut groups: BTreeMap<String, SectorAccumulator> = BTreeMap::new();
    for row in rows {
        if let Some(sector) = &row.sector {
            groups.entry(sector.clone()).or_default().push(row);
        }
    }
    groups
        .into_iter()
        .map(|(sector, acc)| acc.finish(sector))
        .collect()
}
