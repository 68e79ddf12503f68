//! Parameter store: named configuration values looked up at run time.
//!
//! Every `resolve` goes to the backing store; nothing is cached between calls
//! or between invocations.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigLookupError {
    #[error("parameter '{name}' not found")]
    Missing { name: String },

    #[error("parameter store unreachable: {reason}")]
    Unreachable { reason: String },

    #[error("parameter '{name}' could not be decoded: {reason}")]
    Malformed { name: String, reason: String },
}

/// Key-value lookup of configuration values by name.
pub trait ParameterStore: Send + Sync {
    /// Human-readable name of this store.
    fn name(&self) -> &str;

    fn resolve(&self, name: &str) -> Result<String, ConfigLookupError>;
}

// ── Environment ─────────────────────────────────────────────────────

/// Reads parameters from environment variables.
///
/// `/sectorflow/api-url` with prefix `ETL_` becomes `ETL_SECTORFLOW_API_URL`.
#[derive(Debug, Clone, Default)]
pub struct EnvParameterStore {
    prefix: String,
}

impl EnvParameterStore {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Environment variable consulted for `name`.
    pub fn env_key(&self, name: &str) -> String {
        let normalized: String = name
            .trim_start_matches(&['/', '.', '-'][..])
            .chars()
            .map(|c| match c {
                '/' | '-' | '.' => '_',
                c => c.to_ascii_uppercase(),
            })
            .collect();
        format!("{}{normalized}", self.prefix)
    }
}

impl ParameterStore for EnvParameterStore {
    fn name(&self) -> &str {
        "env"
    }

    fn resolve(&self, name: &str) -> Result<String, ConfigLookupError> {
        let key = self.env_key(name);
        match std::env::var(&key) {
            Ok(value) => Ok(value),
            Err(std::env::VarError::NotPresent) => Err(ConfigLookupError::Missing {
                name: name.to_string(),
            }),
            Err(std::env::VarError::NotUnicode(_)) => Err(ConfigLookupError::Malformed {
                name: name.to_string(),
                reason: format!("{key} is not valid unicode"),
            }),
        }
    }
}

// ── TOML file ───────────────────────────────────────────────────────

/// Reads parameters from a flat TOML table of strings, re-reading the file on
/// every lookup.
///
/// ```toml
/// "/sectorflow/api-url" = "https://api.example.com/contents/data"
/// "/sectorflow/environment" = "prod"
/// ```
#[derive(Debug, Clone)]
pub struct FileParameterStore {
    path: PathBuf,
}

impl FileParameterStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ParameterStore for FileParameterStore {
    fn name(&self) -> &str {
        "file"
    }

    fn resolve(&self, name: &str) -> Result<String, ConfigLookupError> {
        let content =
            std::fs::read_to_string(&self.path).map_err(|e| ConfigLookupError::Unreachable {
                reason: format!("{}: {e}", self.path.display()),
            })?;
        let table: toml::Table =
            toml::from_str(&content).map_err(|e| ConfigLookupError::Malformed {
                name: name.to_string(),
                reason: format!("{}: {e}", self.path.display()),
            })?;

        match table.get(name) {
            Some(toml::Value::String(s)) => Ok(s.clone()),
            Some(other) => Err(ConfigLookupError::Malformed {
                name: name.to_string(),
                reason: format!("expected a string, found {}", other.type_str()),
            }),
            None => Err(ConfigLookupError::Missing {
                name: name.to_string(),
            }),
        }
    }
}

// ── In memory ───────────────────────────────────────────────────────

/// Fixed map of parameters, for local runs and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryParameterStore {
    values: HashMap<String, String>,
}

impl MemoryParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }
}

impl ParameterStore for MemoryParameterStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn resolve(&self, name: &str) -> Result<String, ConfigLookupError> {
        self.values
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigLookupError::Missing {
                name: name.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_key_normalizes_names() {
        let store = EnvParameterStore::new("");
        assert_eq!(store.env_key("/sectorflow/api-url"), "SECTORFLOW_API_URL");
        assert_eq!(store.env_key("app.env"), "APP_ENV");

        let prefixed = EnvParameterStore::new("ETL_");
        assert_eq!(prefixed.env_key("/sectorflow/api-url"), "ETL_SECTORFLOW_API_URL");
    }

    #[test]
    fn env_store_reads_and_misses() {
        let store = EnvParameterStore::new("SECTORFLOW_PARAMS_TEST_");
        std::env::set_var("SECTORFLOW_PARAMS_TEST_SOME_VALUE", "hello");
        assert_eq!(store.resolve("/some/value").unwrap(), "hello");
        assert_eq!(
            store.resolve("/absent/value"),
            Err(ConfigLookupError::Missing {
                name: "/absent/value".into()
            })
        );
    }

    #[test]
    fn file_store_rereads_on_every_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.toml");
        std::fs::write(&path, "\"/sectorflow/environment\" = \"dev\"\n").unwrap();
        let store = FileParameterStore::new(&path);
        assert_eq!(store.resolve("/sectorflow/environment").unwrap(), "dev");

        std::fs::write(&path, "\"/sectorflow/environment\" = \"prod\"\n").unwrap();
        assert_eq!(store.resolve("/sectorflow/environment").unwrap(), "prod");
    }

    #[test]
    fn file_store_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.toml");

        let store = FileParameterStore::new(&path);
        assert!(matches!(
            store.resolve("x"),
            Err(ConfigLookupError::Unreachable { .. })
        ));

        std::fs::write(&path, "x = 3\ny = \"ok\"\n").unwrap();
        assert!(matches!(
            store.resolve("x"),
            Err(ConfigLookupError::Malformed { .. })
        ));
        assert!(matches!(
            store.resolve("z"),
            Err(ConfigLookupError::Missing { .. })
        ));
        assert_eq!(store.resolve("y").unwrap(), "ok");

        std::fs::write(&path, "this is = = not toml").unwrap();
        assert!(matches!(
            store.resolve("y"),
            Err(ConfigLookupError::Malformed { .. })
        ));
    }

    #[test]
    fn memory_store_lookup() {
        let store = MemoryParameterStore::new().with("a", "1");
        assert_eq!(store.resolve("a").unwrap(), "1");
        assert!(store.resolve("b").is_err());
    }
}
