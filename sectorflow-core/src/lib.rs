//! SectorFlow Core — listing and table types, resilient fetcher, transform, CSV export.
//!
//! This crate holds everything that does not depend on a concrete external
//! service:
//! - HTTP transport trait and the blocking reqwest implementation
//! - Fixed-interval retrying fetcher for the listing endpoint
//! - Listing parsing, table downloads, left join, window/sector filter, aggregation
//! - CSV encoding and decoding of the aggregate result
//!
//! External collaborators (parameter store, notification sink, object store)
//! live in `sectorflow-runner`. Failure notification reaches this crate only
//! through the [`FailureReporter`] seam.

pub mod data;
pub mod export;
pub mod report;
pub mod transform;

pub use data::{
    FetchError, HttpResponse, ReqwestTransport, ResilientFetcher, RetryPolicy, Sleeper,
    ThreadSleeper, Transport, TransportError,
};
pub use export::{decode_csv, encode_csv, ExportError};
pub use report::FailureReporter;
pub use transform::{
    AggregateRow, DateWindow, FileListing, FilterCriteria, JoinedRow, ListingEntry,
    TransformError, TransformStage,
};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: stage types can cross thread boundaries.
    ///
    /// The invocation is single-threaded, but the CLI and the test harness
    /// share these behind `Arc`.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<ResilientFetcher>();
        require_sync::<ResilientFetcher>();
        require_send::<TransformStage>();
        require_sync::<TransformStage>();
        require_send::<ReqwestTransport>();
        require_sync::<ReqwestTransport>();
        require_send::<AggregateRow>();
        require_sync::<AggregateRow>();
        require_send::<FilterCriteria>();
        require_sync::<FilterCriteria>();
    }
}
