//! SectorFlow Runner — external collaborators and the invocation orchestrator.
//!
//! This crate builds on `sectorflow-core` to provide:
//! - TOML pipeline configuration
//! - Parameter stores (environment, file, in-memory)
//! - Success/failure notification through pluggable sinks
//! - Object-storage sink writer (S3, local filesystem, in-memory)
//! - `Pipeline::run`, which turns one invocation into a status/body result

pub mod config;
pub mod notify;
pub mod params;
pub mod pipeline;
pub mod sink;

pub use config::{
    ConfigError, FetchConfig, FilterConfig, NotifyConfig, NotifyKind, OutputConfig,
    ParameterNames, PipelineConfig, StorageConfig, StorageKind,
};
pub use notify::{
    LogSink, MessageStructure, NotificationSink, Notifier, Publication, PublishError, WebhookSink,
};
pub use params::{
    ConfigLookupError, EnvParameterStore, FileParameterStore, MemoryParameterStore, ParameterStore,
};
pub use pipeline::{InvocationResult, Pipeline, PipelineClients, PipelineError};
pub use sink::{BlobStore, ObjectStoreBlobs, SinkWriteError, SinkWriter, StorageBackend};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn pipeline_is_send_sync() {
        assert_send::<Pipeline>();
        assert_sync::<Pipeline>();
    }

    #[test]
    fn collaborators_are_send_sync() {
        assert_send::<Notifier>();
        assert_sync::<Notifier>();
        assert_send::<ObjectStoreBlobs>();
        assert_sync::<ObjectStoreBlobs>();
        assert_send::<WebhookSink>();
        assert_sync::<WebhookSink>();
        assert_send::<SinkWriter>();
        assert_sync::<SinkWriter>();
    }

    #[test]
    fn config_is_send_sync() {
        assert_send::<PipelineConfig>();
        assert_sync::<PipelineConfig>();
        assert_send::<InvocationResult>();
        assert_sync::<InvocationResult>();
    }
}
