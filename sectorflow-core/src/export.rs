//! CSV encoding of the aggregate result.
//!
//! The header row is always written, even for an empty result, so a reader
//! can tell an empty aggregate from a missing file. Missing values are empty
//! cells.

use crate::transform::AggregateRow;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV encoding failed: {0}")]
    Encode(String),

    #[error("CSV decoding failed: {0}")]
    Decode(String),
}

/// Encode rows as CSV with a `Sector,open,close,high,low,volume` header.
pub fn encode_csv(rows: &[AggregateRow]) -> Result<String, ExportError> {
    let enc = |e: csv::Error| ExportError::Encode(e.to_string());

    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(vec![]);
    wtr.write_record(AggregateRow::COLUMNS).map_err(enc)?;
    for row in rows {
        wtr.serialize(row).map_err(enc)?;
    }

    let data = wtr
        .into_inner()
        .map_err(|e| ExportError::Encode(format!("flush: {e}")))?;
    String::from_utf8(data).map_err(|e| ExportError::Encode(e.to_string()))
}

/// Decode CSV produced by [`encode_csv`].
pub fn decode_csv(text: &str) -> Result<Vec<AggregateRow>, ExportError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(text.as_bytes());

    let headers = rdr
        .headers()
        .map_err(|e| ExportError::Decode(e.to_string()))?
        .clone();
    if !headers.is_empty() && headers.iter().ne(AggregateRow::COLUMNS) {
        return Err(ExportError::Decode(format!(
            "unexpected header: {}",
            headers.iter().collect::<Vec<_>>().join(",")
        )));
    }

    rdr.deserialize()
        .map(|r| r.map_err(|e| ExportError::Decode(e.to_string())))
        .collect()
}
