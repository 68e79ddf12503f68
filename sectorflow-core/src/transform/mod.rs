//! Transform stage: listing → downloads → join → filter → per-sector aggregate.
//!
//! Every failure inside the stage is reported once through the
//! [`FailureReporter`] and then returned; the stage never yields a partial
//! result.

pub mod aggregate;
pub mod join;
pub mod listing;
pub mod tables;

pub use aggregate::{
    aggregate_by_sector, filter_rows, AggregateRow, DateWindow, FilterCriteria, DEFAULT_END,
    DEFAULT_SECTORS, DEFAULT_START,
};
pub use join::{left_join, JoinedRow};
pub use listing::{FileListing, ListingEntry, ListingSources, TableSource, TABULAR_SUFFIX};
pub use tables::{
    parse_reference, parse_series, parse_timestamp, ReferenceRow, SeriesRow, REFERENCE_COLUMNS,
    SERIES_COLUMNS,
};

use crate::data::transport::{Transport, TransportError};
use crate::report::FailureReporter;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

/// Structured errors for the transform stage.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("listing has {found} tabular file(s); need a reference table and at least one time series")]
    EmptyListing { found: usize },

    #[error("listing format changed: {0}")]
    ListingFormat(String),

    #[error("download of '{name}' failed: {source}")]
    Download {
        name: String,
        #[source]
        source: TransportError,
    },

    #[error("table '{name}' is malformed: {reason}")]
    Table { name: String, reason: String },
}

/// Downloads and reshapes the tables named by a listing.
pub struct TransformStage {
    transport: Arc<dyn Transport>,
    criteria: FilterCriteria,
}

impl TransformStage {
    pub fn new(transport: Arc<dyn Transport>, criteria: FilterCriteria) -> Self {
        Self {
            transport,
            criteria,
        }
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    /// Run the stage on the listing JSON returned by the fetcher.
    ///
    /// On failure the error text is sent to `reporter` before returning.
    pub fn run(
        &self,
        listing: &Value,
        reporter: &dyn FailureReporter,
    ) -> Result<Vec<AggregateRow>, TransformError> {
        self.execute(listing).map_err(|e| {
            error!("transform failed: {e}");
            reporter.report_failure(&e.to_string());
            e
        })
    }

    fn execute(&self, listing: &Value) -> Result<Vec<AggregateRow>, TransformError> {
        let listing = FileListing::from_json(listing)?;
        let sources = listing.split_sources()?;
        info!(
            series = sources.series.len(),
            reference = %sources.reference.name,
            "loading tables"
        );

        let mut series = Vec::new();
        for source in &sources.series {
            let text = self.download(source)?;
            let rows = parse_series(&source.name, &source.symbol, &text)?;
            debug!(symbol = %source.symbol, rows = rows.len(), "loaded series");
            series.extend(rows);
        }

        let reference_text = self.download(&sources.reference)?;
        let reference = parse_reference(&sources.reference.name, &reference_text)?;

        let joined = left_join(&series, &reference);
        let kept = filter_rows(&joined, &self.criteria);
        let kept_rows = kept.len();
        let result = aggregate_by_sector(kept);

        info!(
            joined = joined.len(),
            kept = kept_rows,
            sectors = result.len(),
            "aggregated"
        );
        Ok(result)
    }

    fn download(&self, source: &TableSource) -> Result<String, TransformError> {
        self.transport
            .get(&source.url)
            .and_then(|resp| resp.error_for_status(&source.url))
            .map(|resp| resp.body)
            .map_err(|e| TransformError::Download {
                name: source.name.clone(),
                source: e,
            })
    }
}
