//! File listing returned by the API.
//!
//! The listing is a JSON array of objects with at least `name` and
//! `download_url`. Only `.csv` entries take part in the run: the last one is
//! the reference table, every other one is a per-symbol time series.

use super::TransformError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Suffix recognized as a tabular file (compared ASCII case-insensitively).
pub const TABULAR_SUFFIX: &str = ".csv";

/// One entry of the API listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingEntry {
    pub name: String,
    /// Null for directories in a contents-style API.
    #[serde(default)]
    pub download_url: Option<String>,
}

impl ListingEntry {
    pub fn new(name: impl Into<String>, download_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            download_url: Some(download_url.into()),
        }
    }

    /// True for downloadable entries with a `.csv` name.
    pub fn is_tabular(&self) -> bool {
        self.download_url.is_some() && has_tabular_suffix(&self.name)
    }

    /// Symbol derived from the file name: path prefix and extension removed.
    pub fn symbol(&self) -> String {
        let base = self.name.rsplit('/').next().unwrap_or(&self.name);
        match base.rfind('.') {
            Some(0) | None => base.to_string(),
            Some(dot) => base[..dot].to_string(),
        }
    }
}

fn has_tabular_suffix(name: &str) -> bool {
    name.len() >= TABULAR_SUFFIX.len()
        && name.is_char_boundary(name.len() - TABULAR_SUFFIX.len())
        && name[name.len() - TABULAR_SUFFIX.len()..].eq_ignore_ascii_case(TABULAR_SUFFIX)
}

/// A downloadable table resolved from a listing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSource {
    pub name: String,
    pub url: String,
    pub symbol: String,
}

impl TableSource {
    fn from_entry(entry: &ListingEntry) -> Option<Self> {
        let url = entry.download_url.clone()?;
        Some(Self {
            name: entry.name.clone(),
            url,
            symbol: entry.symbol(),
        })
    }
}

/// The tabular part of a listing split into reference and series sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingSources {
    pub reference: TableSource,
    /// In listing order.
    pub series: Vec<TableSource>,
}

/// Parsed API listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileListing {
    entries: Vec<ListingEntry>,
}

impl FileListing {
    pub fn new(entries: Vec<ListingEntry>) -> Self {
        Self { entries }
    }

    /// Parse the API response. Unknown fields are ignored.
    pub fn from_json(value: &Value) -> Result<Self, TransformError> {
        let entries: Vec<ListingEntry> = serde_json::from_value(value.clone())
            .map_err(|e| TransformError::ListingFormat(e.to_string()))?;
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[ListingEntry] {
        &self.entries
    }

    /// Entries that will be downloaded, in listing order.
    pub fn tabular(&self) -> Vec<TableSource> {
        self.entries
            .iter()
            .filter(|e| e.is_tabular())
            .filter_map(TableSource::from_entry)
            .collect()
    }

    /// Last tabular entry is the reference table, the rest are series.
    ///
    /// Fails with [`TransformError::EmptyListing`] when fewer than two tabular
    /// entries are present.
    pub fn split_sources(&self) -> Result<ListingSources, TransformError> {
        let mut tabular = self.tabular();
        if tabular.len() < 2 {
            return Err(TransformError::EmptyListing {
                found: tabular.len(),
            });
        }
        let reference = tabular
            .pop()
            .ok_or(TransformError::EmptyListing { found: 0 })?;
        Ok(ListingSources {
            reference,
            series: tabular,
        })
    }
}
