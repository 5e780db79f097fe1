//! Connection and compilation settings

use crate::error::{Error, Result};
use graphframe_core::write::DEFAULT_BATCH_SIZE;
use graphframe_core::{OperatorPolicy, RelUniquenessPolicy};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use url::Url;

/// Settings for a [`Graph`](crate::Graph)
///
/// ```
/// use graphframe::GraphConfig;
///
/// let config = GraphConfig::from_toml_str(r#"
///     uri = "http://db.internal:15474"
///     rel_uniqueness_policy = "require_rel_key"
/// "#)?;
/// assert_eq!(config.database.as_deref(), Some("neo4j"));
/// # Ok::<(), graphframe::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Base URL of the database HTTP endpoint
    pub uri: String,
    /// Target database; `None` uses the server default
    pub database: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Takes precedence over username/password
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Retries for transient failures
    pub max_retries: u32,
    /// Rows per upsert batch
    pub batch_size: usize,
    pub rel_uniqueness_policy: RelUniquenessPolicy,
    pub operator_policy: OperatorPolicy,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: "http://localhost:15474".to_string(),
            database: Some("neo4j".to_string()),
            username: None,
            password: None,
            api_key: None,
            timeout_secs: 30,
            max_retries: 3,
            batch_size: DEFAULT_BATCH_SIZE,
            rel_uniqueness_policy: RelUniquenessPolicy::default(),
            operator_policy: OperatorPolicy::default(),
        }
    }
}

impl GraphConfig {
    /// Defaults pointed at `uri`
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ..Self::default()
        }
    }

    /// Parse and validate TOML
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: GraphConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Check the URI and numeric limits
    pub fn validate(&self) -> Result<()> {
        if self.uri.trim().is_empty() {
            return Err(Error::Configuration("uri must not be empty".to_string()));
        }
        self.base_url()?;
        if self.timeout_secs == 0 {
            return Err(Error::Configuration(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(Error::Configuration(
                "batch_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Parsed base URL
    pub fn base_url(&self) -> Result<Url> {
        Url::parse(&self.uri)
            .map_err(|e| Error::Configuration(format!("Invalid uri '{}': {}", self.uri, e)))
    }
}
