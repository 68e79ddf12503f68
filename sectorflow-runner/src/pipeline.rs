//! Orchestrator: resolve URL, fetch listing, transform, save, notify.
//!
//! `Pipeline::run` is the invocation boundary. It never panics and never
//! returns an error; every outcome becomes an [`InvocationResult`].

use crate::config::PipelineConfig;
use crate::notify::{NotificationSink, Notifier};
use crate::params::{ConfigLookupError, ParameterStore};
use crate::sink::{BlobStore, SinkWriteError, SinkWriter};
use sectorflow_core::{
    FetchError, ResilientFetcher, Sleeper, TransformError, TransformStage, Transport,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

/// External collaborators for one invocation.
#[derive(Clone)]
pub struct PipelineClients {
    pub parameters: Arc<dyn ParameterStore>,
    pub notifications: Arc<dyn NotificationSink>,
    pub transport: Arc<dyn Transport>,
    pub sleeper: Arc<dyn Sleeper>,
    pub blobs: Arc<dyn BlobStore>,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("config lookup failed: {0}")]
    Config(#[from] ConfigLookupError),

    #[error("{0}")]
    Fetch(#[from] FetchError),

    #[error("{0}")]
    Transform(#[from] TransformError),

    #[error("saving result failed: {0}")]
    Sink(#[from] SinkWriteError),
}

impl PipelineError {
    /// Whether the failing stage already sent its own failure notification.
    pub fn reported_at_origin(&self) -> bool {
        matches!(self, PipelineError::Fetch(_) | PipelineError::Transform(_))
    }
}

/// Structured outcome of one invocation.
///
/// `body` holds a JSON-encoded string, e.g. `"\"Data saved to b/k\""`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResult {
    pub status_code: u16,
    pub body: String,
}

impl InvocationResult {
    pub fn success(message: &str) -> Self {
        Self {
            status_code: 200,
            body: json_string(message),
        }
    }

    pub fn failure(message: &str) -> Self {
        Self {
            status_code: 500,
            body: json_string(message),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }

    /// The body decoded back to plain text.
    pub fn message(&self) -> String {
        serde_json::from_str::<String>(&self.body).unwrap_or_else(|_| self.body.clone())
    }
}

fn json_string(text: &str) -> String {
    serde_json::Value::String(text.to_string()).to_string()
}

pub struct Pipeline {
    config: PipelineConfig,
    clients: PipelineClients,
    notifier: Notifier,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, clients: PipelineClients) -> Self {
        let notifier = Notifier::new(
            clients.parameters.clone(),
            clients.notifications.clone(),
            config.parameters.clone(),
            config.component_name.clone(),
        );
        Self {
            config,
            clients,
            notifier,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run one invocation end to end.
    pub fn run(&self) -> InvocationResult {
        match self.execute() {
            Ok(()) => {
                let output = &self.config.output;
                self.notifier.notify_success();
                InvocationResult::success(&format!("Data saved to {}/{}", output.bucket, output.key))
            }
            Err(e) => {
                error!("pipeline failed: {e}");
                if !e.reported_at_origin() {
                    self.notifier.notify_failure(&e.to_string());
                }
                InvocationResult::failure(&format!("Error: {e}"))
            }
        }
    }

    fn execute(&self) -> Result<(), PipelineError> {
        let url = self
            .clients
            .parameters
            .resolve(&self.config.parameters.api_url)?;
        info!(component = %self.config.component_name, "fetching listing");

        let fetcher = ResilientFetcher::new(
            self.clients.transport.clone(),
            self.clients.sleeper.clone(),
            self.config.fetch.retry_policy(),
        );
        let listing = fetcher.fetch_json(&url, &self.notifier)?;

        let stage = TransformStage::new(self.clients.transport.clone(), self.config.filter.criteria());
        let table = stage.run(&listing, &self.notifier)?;
        info!(sectors = table.len(), "transform complete");

        let output = &self.config.output;
        SinkWriter::new(self.clients.blobs.clone()).save(&table, &output.bucket, &output.key)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sectorflow_core::data::AttemptError;
    use sectorflow_core::TransportError;

    #[test]
    fn result_body_is_json_string() {
        let result = InvocationResult::success("Data saved to b/output/result.csv");
        assert_eq!(result.body, "\"Data saved to b/output/result.csv\"");
        assert_eq!(result.message(), "Data saved to b/output/result.csv");

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["statusCode"], 200);
        assert_eq!(json["body"], "\"Data saved to b/output/result.csv\"");
    }

    #[test]
    fn failure_result_escapes_quotes() {
        let result = InvocationResult::failure("Error: bad \"value\"");
        assert_eq!(result.status_code, 500);
        assert!(!result.is_success());
        assert_eq!(result.message(), "Error: bad \"value\"");
    }

    #[test]
    fn stage_errors_reported_at_origin() {
        let fetch = PipelineError::Fetch(FetchError::Exhausted {
            attempts: 3,
            last_error: AttemptError::InvalidJson("eof".into()),
        });
        let transform = PipelineError::Transform(TransformError::EmptyListing { found: 1 });
        let config = PipelineError::Config(ConfigLookupError::Missing {
            name: "/x".into(),
        });
        let sink = PipelineError::Sink(SinkWriteError::Backend("down".into()));

        assert!(fetch.reported_at_origin());
        assert!(transform.reported_at_origin());
        assert!(!config.reported_at_origin());
        assert!(!sink.reported_at_origin());

        let download = PipelineError::Transform(TransformError::Download {
            name: "ref.csv".into(),
            source: TransportError::Timeout { url: "u".into() },
        });
        assert!(download.reported_at_origin());
    }
}
