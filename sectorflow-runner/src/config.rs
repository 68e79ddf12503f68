//! Serializable pipeline configuration.
//!
//! Everything the run needs that is not a secret lives here and is loaded
//! from TOML. Secrets and per-environment values (API URL, notification
//! targets, environment tag, message templates) are looked up at run time
//! through the parameter store, by the names listed in `[parameters]`.

use chrono::NaiveDate;
use sectorflow_core::data::{DEFAULT_MAX_ATTEMPTS, DEFAULT_TIMEOUT, DEFAULT_WAIT};
use sectorflow_core::transform::{DateWindow, DEFAULT_END, DEFAULT_SECTORS, DEFAULT_START};
use sectorflow_core::{FilterCriteria, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {reason}")]
    Io { path: PathBuf, reason: String },

    #[error("parse config TOML: {0}")]
    Parse(String),

    #[error("serialize config: {0}")]
    Serialize(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration for one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Name used in notification subjects and bodies.
    pub component_name: String,
    pub output: OutputConfig,
    pub parameters: ParameterNames,
    pub fetch: FetchConfig,
    pub filter: FilterConfig,
    pub storage: StorageConfig,
    pub notify: NotifyConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            component_name: "sectorflow".into(),
            output: OutputConfig::default(),
            parameters: ParameterNames::default(),
            fetch: FetchConfig::default(),
            filter: FilterConfig::default(),
            storage: StorageConfig::default(),
            notify: NotifyConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load and validate a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from a TOML string. Missing keys take defaults.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.component_name.trim().is_empty() {
            return Err(ConfigError::Invalid("component_name is empty".into()));
        }
        if self.output.bucket.trim().is_empty() {
            return Err(ConfigError::Invalid("output.bucket is empty".into()));
        }
        if self.output.key.trim().is_empty() {
            return Err(ConfigError::Invalid("output.key is empty".into()));
        }
        if self.filter.start > self.filter.end {
            return Err(ConfigError::Invalid(format!(
                "filter.start {} is after filter.end {}",
                self.filter.start, self.filter.end
            )));
        }
        if self.filter.sectors.is_empty() {
            return Err(ConfigError::Invalid("filter.sectors is empty".into()));
        }
        if self.storage.kind == StorageKind::Local && self.storage.root.is_none() {
            return Err(ConfigError::Invalid(
                "storage.root is required for local storage".into(),
            ));
        }
        Ok(())
    }
}

/// Where the aggregate is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub bucket: String,
    pub key: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            bucket: "sectorflow-output".into(),
            key: "output/result.csv".into(),
        }
    }
}

/// Parameter-store names of the values resolved at run time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterNames {
    pub api_url: String,
    pub success_target: String,
    pub error_target: String,
    pub environment: String,
    pub success_message: String,
    /// Template with an `{error}` placeholder.
    pub error_message: String,
}

impl Default for ParameterNames {
    fn default() -> Self {
        Self {
            api_url: "/sectorflow/api-url".into(),
            success_target: "/sectorflow/success-target".into(),
            error_target: "/sectorflow/error-target".into(),
            environment: "/sectorflow/environment".into(),
            success_message: "/sectorflow/success-message".into(),
            error_message: "/sectorflow/error-message".into(),
        }
    }
}

/// Listing fetch policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub max_attempts: u32,
    pub wait_secs: u64,
    /// Per-request timeout, also used for table downloads and webhooks.
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            wait_secs: DEFAULT_WAIT.as_secs(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

impl FetchConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_secs(self.wait_secs))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Date window (inclusive, midnight to midnight) and sector set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub sectors: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            start: DEFAULT_START,
            end: DEFAULT_END,
            sectors: DEFAULT_SECTORS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl FilterConfig {
    pub fn criteria(&self) -> FilterCriteria {
        FilterCriteria {
            window: DateWindow::from_dates(self.start, self.end),
            sectors: self.sectors.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    S3,
    Local,
    Memory,
}

/// Object-store backend for the sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub kind: StorageKind,
    /// Root directory for `local`; buckets are subdirectories.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Custom S3 endpoint (MinIO, LocalStack).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            kind: StorageKind::S3,
            root: None,
            region: None,
            endpoint: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyKind {
    /// POST each publication to the resolved target URL.
    Webhook,
    /// Log each publication.
    Log,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    pub kind: NotifyKind,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            kind: NotifyKind::Webhook,
        }
    }
}
