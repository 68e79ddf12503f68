//! Best-effort success/failure notifications.
//!
//! The notifier resolves target, environment tag, and message template from
//! the parameter store, composes a subject and body, and publishes through a
//! [`NotificationSink`]. Any failure along the way is logged and dropped:
//! neither `notify_success` nor `notify_failure` can fail.

use crate::config::ParameterNames;
use crate::params::{ConfigLookupError, ParameterStore};
use sectorflow_core::FailureReporter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

/// Used when the store has no success message.
pub const DEFAULT_SUCCESS_MESSAGE: &str = "Data pipeline completed successfully";

/// Placeholder substituted with the error text in the error template.
pub const ERROR_PLACEHOLDER: &str = "{error}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStructure {
    /// `message` is a JSON object with a `default` key.
    Json,
    /// `message` is plain text.
    Raw,
}

/// One outbound notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publication {
    pub target: String,
    pub subject: String,
    pub message: String,
    pub message_structure: MessageStructure,
}

impl Publication {
    /// Wrap `body` as `{"default": body}` with the JSON message structure.
    pub fn json_wrapped(target: impl Into<String>, subject: impl Into<String>, body: &str) -> Self {
        Self {
            target: target.into(),
            subject: subject.into(),
            message: serde_json::json!({ "default": body }).to_string(),
            message_structure: MessageStructure::Json,
        }
    }

    /// The text inside the JSON wrapper, or the raw message.
    pub fn text(&self) -> Option<String> {
        match self.message_structure {
            MessageStructure::Raw => Some(self.message.clone()),
            MessageStructure::Json => serde_json::from_str::<serde_json::Value>(&self.message)
                .ok()?
                .get("default")?
                .as_str()
                .map(str::to_string),
        }
    }
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("invalid notification target '{0}'")]
    InvalidTarget(String),

    #[error("publish to {target} failed: {reason}")]
    Delivery { target: String, reason: String },

    #[error("notification client setup failed: {0}")]
    Client(String),
}

/// Fire-and-forget publish sink.
pub trait NotificationSink: Send + Sync {
    /// Human-readable name of this sink.
    fn name(&self) -> &str;

    fn publish(&self, publication: &Publication) -> Result<(), PublishError>;
}

// ── Sinks ───────────────────────────────────────────────────────────

/// POSTs each publication as JSON to its target URL.
pub struct WebhookSink {
    client: reqwest::blocking::Client,
}

impl WebhookSink {
    pub fn new(timeout: Duration) -> Result<Self, PublishError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PublishError::Client(e.to_string()))?;
        Ok(Self { client })
    }
}

impl NotificationSink for WebhookSink {
    fn name(&self) -> &str {
        "webhook"
    }

    fn publish(&self, publication: &Publication) -> Result<(), PublishError> {
        let target = &publication.target;
        if !(target.starts_with("http://") || target.starts_with("https://")) {
            return Err(PublishError::InvalidTarget(target.clone()));
        }

        let delivery = |reason: String| PublishError::Delivery {
            target: target.clone(),
            reason,
        };
        let resp = self
            .client
            .post(target)
            .json(publication)
            .send()
            .map_err(|e| delivery(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(delivery(format!("HTTP {}", resp.status())));
        }
        Ok(())
    }
}

/// Writes each publication to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    fn publish(&self, publication: &Publication) -> Result<(), PublishError> {
        info!(
            topic = %publication.target,
            subject = %publication.subject,
            message = %publication.message,
            "notification"
        );
        Ok(())
    }
}

// ── Notifier ────────────────────────────────────────────────────────

#[derive(Debug, Error)]
enum NotifyError {
    #[error(transparent)]
    Lookup(#[from] ConfigLookupError),

    #[error(transparent)]
    Publish(#[from] PublishError),
}

/// Insert `error` into `template` at `{error}`; without a placeholder the
/// error is appended after a colon.
pub fn render_error_template(template: &str, error: &str) -> String {
    if template.contains(ERROR_PLACEHOLDER) {
        template.replace(ERROR_PLACEHOLDER, error)
    } else if template.trim().is_empty() {
        error.to_string()
    } else {
        format!("{template}: {error}")
    }
}

/// Resolves notification settings and publishes success/failure messages.
pub struct Notifier {
    params: Arc<dyn ParameterStore>,
    sink: Arc<dyn NotificationSink>,
    names: ParameterNames,
    component_name: String,
}

impl Notifier {
    pub fn new(
        params: Arc<dyn ParameterStore>,
        sink: Arc<dyn NotificationSink>,
        names: ParameterNames,
        component_name: impl Into<String>,
    ) -> Self {
        Self {
            params,
            sink,
            names,
            component_name: component_name.into(),
        }
    }

    pub fn component_name(&self) -> &str {
        &self.component_name
    }

    /// Publish the success message. Never fails.
    pub fn notify_success(&self) {
        match self.try_success() {
            Ok(()) => info!("success notification sent"),
            Err(e) => error!("Failed to send success notification: {e}"),
        }
    }

    /// Publish `message` as a failure. Never fails.
    pub fn notify_failure(&self, message: &str) {
        match self.try_failure(message) {
            Ok(()) => info!("error notification sent"),
            Err(e) => error!("Failed to send error notification: {e}"),
        }
    }

    fn try_success(&self) -> Result<(), NotifyError> {
        let target = self.params.resolve(&self.names.success_target)?;
        let environment = self.params.resolve(&self.names.environment)?;
        let message = self
            .optional(&self.names.success_message)?
            .unwrap_or_else(|| DEFAULT_SUCCESS_MESSAGE.to_string());
        self.publish(target, &environment, &message)
    }

    fn try_failure(&self, error: &str) -> Result<(), NotifyError> {
        let target = self.params.resolve(&self.names.error_target)?;
        let environment = self.params.resolve(&self.names.environment)?;
        let message = match self.optional(&self.names.error_message)? {
            Some(template) => render_error_template(&template, error),
            None => error.to_string(),
        };
        self.publish(target, &environment, &message)
    }

    /// A missing template falls back to a default; other lookup errors abort.
    fn optional(&self, name: &str) -> Result<Option<String>, ConfigLookupError> {
        match self.params.resolve(name) {
            Ok(v) => Ok(Some(v)),
            Err(ConfigLookupError::Missing { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn publish(&self, target: String, environment: &str, message: &str) -> Result<(), NotifyError> {
        let subject = format!("{environment} : {}", self.component_name);
        let body = format!("{} : {message}", self.component_name);
        info!(subject = %subject, "publishing notification: {body}");
        self.sink
            .publish(&Publication::json_wrapped(target, subject, &body))?;
        Ok(())
    }
}

impl FailureReporter for Notifier {
    fn report_failure(&self, message: &str) {
        self.notify_failure(message);
    }
}
