//! Reconciler configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use tabula_core::{Error, Result};

use crate::classifier::WorthinessRule;

const MIN_LEASE_TTL_SECS: u64 = 1;
const MAX_LEASE_TTL_SECS: u64 = 300;

fn default_lease_ttl_secs() -> u64 {
    5
}

fn default_lease_key_prefix() -> String {
    "locks/ghost-tables".to_string()
}

fn default_schema_name() -> String {
    "public".to_string()
}

/// Configuration for the reconciliation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Lease TTL in seconds.
    ///
    /// Must exceed the expected worst-case duration of one full pass;
    /// a pass that overruns its TTL can race a second concurrent pass.
    ///
    /// Default: 5.
    #[serde(default = "default_lease_ttl_secs")]
    pub lease_ttl_secs: u64,

    /// Prefix for tenant-scoped lease keys.
    #[serde(default = "default_lease_key_prefix")]
    pub lease_key_prefix: String,

    /// Live-store schema searched during introspection.
    #[serde(default = "default_schema_name")]
    pub schema_name: String,

    /// The catalog-worthiness rule applied during creation detection.
    #[serde(default)]
    pub worthiness: WorthinessRule,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            lease_ttl_secs: default_lease_ttl_secs(),
            lease_key_prefix: default_lease_key_prefix(),
            schema_name: default_schema_name(),
            worthiness: WorthinessRule::default(),
        }
    }
}

impl ReconcilerConfig {
    /// Loads configuration from environment variables.
    ///
    /// Supported env vars:
    /// - `TABULA_LEASE_TTL_SECS` (1-300, default: 5)
    /// - `TABULA_LEASE_KEY_PREFIX`
    /// - `TABULA_SCHEMA_NAME`
    /// - `TABULA_REQUIRED_COLUMNS` (comma-separated column names)
    /// - `TABULA_GEOMETRY_COLUMN`
    /// - `TABULA_QUOTA_TRIGGER`
    ///
    /// # Errors
    ///
    /// Returns an error if any variable is present but cannot be parsed or
    /// falls outside its allowed range.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(secs) = env_u64("TABULA_LEASE_TTL_SECS")? {
            if !(MIN_LEASE_TTL_SECS..=MAX_LEASE_TTL_SECS).contains(&secs) {
                return Err(Error::InvalidInput(format!(
                    "TABULA_LEASE_TTL_SECS must be between {MIN_LEASE_TTL_SECS} and {MAX_LEASE_TTL_SECS} seconds"
                )));
            }
            config.lease_ttl_secs = secs;
        }
        if let Some(prefix) = env_string("TABULA_LEASE_KEY_PREFIX") {
            config.lease_key_prefix = prefix.trim_end_matches('/').to_string();
        }
        if let Some(schema) = env_string("TABULA_SCHEMA_NAME") {
            config.schema_name = schema;
        }
        if let Some(columns) = env_string("TABULA_REQUIRED_COLUMNS") {
            let parsed = parse_column_list(&columns);
            if parsed.is_empty() {
                return Err(Error::InvalidInput(
                    "TABULA_REQUIRED_COLUMNS must name at least one column".to_string(),
                ));
            }
            config.worthiness.required_columns = parsed;
        }
        if let Some(column) = env_string("TABULA_GEOMETRY_COLUMN") {
            config.worthiness.geometry_column = column;
        }
        if let Some(trigger) = env_string("TABULA_QUOTA_TRIGGER") {
            config.worthiness.quota_trigger = trigger;
        }

        Ok(config)
    }

    /// Returns the lease TTL as a `Duration`.
    #[must_use]
    pub fn lease_ttl(&self) -> Duration {
        Duration::from_secs(self.lease_ttl_secs)
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn env_u64(name: &str) -> Result<Option<u64>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    v.parse::<u64>()
        .map(Some)
        .map_err(|e| Error::InvalidInput(format!("{name} must be a u64: {e}")))
}

fn parse_column_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
