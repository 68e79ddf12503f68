//! CSV parsing for the reference table and the per-symbol time series.

use super::TransformError;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;

/// One row of a per-symbol time series, tagged with its symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesRow {
    pub symbol: String,
    pub timestamp: NaiveDateTime,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
}

/// One row of the reference table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReferenceRow {
    #[serde(rename = "Symbol")]
    pub symbol: String,
    /// Empty cells are missing attributes.
    #[serde(rename = "Sector")]
    pub sector: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SeriesRecord {
    timestamp: String,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<f64>,
}

fn reader(text: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes())
}

fn malformed(name: &str, reason: impl ToString) -> TransformError {
    TransformError::Table {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

pub const SERIES_COLUMNS: [&str; 6] = ["timestamp", "open", "high", "low", "close", "volume"];
pub const REFERENCE_COLUMNS: [&str; 2] = ["Symbol", "Sector"];

/// Fail unless every `required` column is in the header row.
///
/// Serde fills absent `Option` fields with `None`, so a missing column would
/// otherwise look like a column of empty cells.
fn require_columns(
    name: &str,
    rdr: &mut csv::Reader<&[u8]>,
    required: &[&str],
) -> Result<(), TransformError> {
    let headers = rdr.headers().map_err(|e| malformed(name, e))?;
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h == *col))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(malformed(
            name,
            format!("missing required column(s): {}", missing.join(", ")),
        ))
    }
}

/// Parse a time-series CSV (`timestamp, open, high, low, close, volume`).
///
/// Column order is free and extra columns are ignored. Every row is tagged
/// with `symbol`; a `Symbol` column in the file, if any, is not consulted.
pub fn parse_series(name: &str, symbol: &str, text: &str) -> Result<Vec<SeriesRow>, TransformError> {
    let mut rdr = reader(text);
    require_columns(name, &mut rdr, &SERIES_COLUMNS)?;
    let mut rows = Vec::new();

    for (line, record) in rdr.deserialize::<SeriesRecord>().enumerate() {
        let record = record.map_err(|e| malformed(name, e))?;
        let timestamp = parse_timestamp(&record.timestamp).ok_or_else(|| {
            malformed(
                name,
                format!("row {}: unrecognized timestamp '{}'", line + 1, record.timestamp),
            )
        })?;
        rows.push(SeriesRow {
            symbol: symbol.to_string(),
            timestamp,
            open: record.open,
            high: record.high,
            low: record.low,
            close: record.close,
            volume: record.volume,
        });
    }

    Ok(rows)
}

/// Parse the reference CSV. Requires `Symbol` and `Sector` columns.
pub fn parse_reference(name: &str, text: &str) -> Result<Vec<ReferenceRow>, TransformError> {
    let mut rdr = reader(text);
    require_columns(name, &mut rdr, &REFERENCE_COLUMNS)?;
    rdr.deserialize::<ReferenceRow>()
        .map(|r| r.map_err(|e| malformed(name, e)))
        .collect()
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parse a timestamp cell.
///
/// Accepts bare dates (midnight), date-times with a space or `T` separator,
/// and RFC 3339 (converted to UTC, offset dropped).
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(ts);
        }
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.naive_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn timestamp_formats() {
        assert_eq!(parse_timestamp("2021-03-01"), Some(ts(2021, 3, 1, 0, 0, 0)));
        assert_eq!(
            parse_timestamp("2021-03-01 09:30:00"),
            Some(ts(2021, 3, 1, 9, 30, 0))
        );
        assert_eq!(
            parse_timestamp("2021-03-01T09:30:00.250"),
            Some(
                NaiveDate::from_ymd_opt(2021, 3, 1)
                    .unwrap()
                    .and_hms_milli_opt(9, 30, 0, 250)
                    .unwrap()
            )
        );
        assert_eq!(
            parse_timestamp("2021-03-01T09:30:00+02:00"),
            Some(ts(2021, 3, 1, 7, 30, 0))
        );
        assert_eq!(parse_timestamp("03/01/2021"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn series_rows_are_tagged_and_reordered_columns_work() {
        let text = "volume,timestamp,close,open,low,high,Name\n\
                    1000,2021-03-01,110,100,90,120,Apple\n\
                    ,2021-03-02,111,101,91,121,Apple\n";
        let rows = parse_series("AAPL.csv", "AAPL", text).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].symbol, "AAPL");
        assert_eq!(rows[0].timestamp, ts(2021, 3, 1, 0, 0, 0));
        assert_eq!(rows[0].open, Some(100.0));
        assert_eq!(rows[0].high, Some(120.0));
        assert_eq!(rows[0].low, Some(90.0));
        assert_eq!(rows[0].close, Some(110.0));
        assert_eq!(rows[0].volume, Some(1000.0));
        assert_eq!(rows[1].volume, None);
    }

    #[test]
    fn series_missing_column_is_malformed() {
        let text = "timestamp,open,high,low,close\n2021-03-01,1,2,0.5,1.5\n";
        let err = parse_series("X.csv", "X", text).unwrap_err();
        match err {
            TransformError::Table { name, reason } => {
                assert_eq!(name, "X.csv");
                assert!(reason.contains("volume"), "reason: {reason}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn series_bad_timestamp_names_the_row() {
        let text = "timestamp,open,high,low,close,volume\n\
                    2021-03-01,1,2,0.5,1.5,10\n\
                    yesterday,1,2,0.5,1.5,10\n";
        let err = parse_series("X.csv", "X", text).unwrap_err();
        assert!(err.to_string().contains("row 2"), "{err}");
    }

    #[test]
    fn series_non_numeric_price_is_malformed() {
        let text = "timestamp,open,high,low,close,volume\n2021-03-01,abc,2,0.5,1.5,10\n";
        assert!(matches!(
            parse_series("X.csv", "X", text),
            Err(TransformError::Table { .. })
        ));
    }

    #[test]
    fn reference_parses_symbol_and_sector() {
        let text = "Symbol,Name,Sector\nAAPL,Apple,TECHNOLOGY\nXYZ,Unknown,\n";
        let rows = parse_reference("ref.csv", text).unwrap();
        assert_eq!(
            rows,
            vec![
                ReferenceRow {
                    symbol: "AAPL".into(),
                    sector: Some("TECHNOLOGY".into())
                },
                ReferenceRow {
                    symbol: "XYZ".into(),
                    sector: None
                },
            ]
        );
    }

    #[test]
    fn reference_without_sector_column_is_malformed() {
        let text = "Symbol,Name\nAAPL,Apple\n";
        let err = parse_reference("ref.csv", text).unwrap_err();
        match err {
            TransformError::Table { name, reason } => {
                assert_eq!(name, "ref.csv");
                assert!(reason.contains("Sector"), "reason: {reason}");
                assert!(!reason.contains("Symbol"), "reason: {reason}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn series_missing_columns_are_all_named() {
        let text = "timestamp,close\n2021-03-01,1.5\n";
        let reason = parse_series("X.csv", "X", text).unwrap_err().to_string();
        for col in ["open", "high", "low", "volume"] {
            assert!(reason.contains(col), "{col} not in: {reason}");
        }
    }

    #[test]
    fn empty_table_text_is_malformed() {
        assert!(matches!(
            parse_series("X.csv", "X", ""),
            Err(TransformError::Table { .. })
        ));
        assert!(matches!(
            parse_reference("ref.csv", ""),
            Err(TransformError::Table { .. })
        ));
    }

    #[test]
    fn header_only_tables_are_empty() {
        assert!(parse_series("X.csv", "X", "timestamp,open,high,low,close,volume\n")
            .unwrap()
            .is_empty());
        assert!(parse_reference("ref.csv", "Symbol,Sector\n").unwrap().is_empty());
    }
}
