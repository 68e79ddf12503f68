//! Failure reporting seam.
//!
//! Stages that report their own failures (the fetcher on exhaustion, the
//! transform stage on any error) take a `&dyn FailureReporter`. The runner's
//! notifier implements it; tests use a recorder.

/// Out-of-band failure channel.
///
/// Implementations must not fail: reporting is best-effort and never changes
/// the outcome of the stage that reports.
pub trait FailureReporter {
    fn report_failure(&self, message: &str);
}
