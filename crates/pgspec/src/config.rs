//! Pipeline configuration.
//!
//! Every struct has builder-style setters and also deserializes from TOML with defaults
//! for any missing key:
//!
//! ```toml
//! [driver]
//! log_sql = true
//! sql_log_level = "debug"
//! max_sql_length = 500
//! log_params = true
//!
//! [pagination]
//! default_rows = 20
//! ```

use crate::error::{SpecError, SpecResult};
use serde::Deserialize;
use std::path::Path;
use tracing::Level;

/// Level for compiled-SQL log events. Only verbose levels are offered so SQL text and
/// parameter values never reach default-on logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlLogLevel {
    #[default]
    Debug,
    Trace,
}

impl SqlLogLevel {
    pub fn as_level(self) -> Level {
        match self {
            SqlLogLevel::Debug => Level::DEBUG,
            SqlLogLevel::Trace => Level::TRACE,
        }
    }
}

/// Driver logging options.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Emit compiled SQL before execution.
    pub log_sql: bool,
    pub sql_log_level: SqlLogLevel,
    /// Truncate logged SQL to this many bytes. `0` disables truncation.
    pub max_sql_length: usize,
    /// Include the debug rendering of bound parameters in the SQL event.
    pub log_params: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            log_sql: true,
            sql_log_level: SqlLogLevel::Debug,
            max_sql_length: 500,
            log_params: true,
        }
    }
}

impl DriverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the level compiled SQL is logged at.
    pub fn with_sql_log_level(mut self, level: SqlLogLevel) -> Self {
        self.sql_log_level = level;
        self
    }

    /// Set maximum SQL length to display.
    pub fn with_max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = len;
        self
    }

    /// Disable SQL truncation.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = 0;
        self
    }

    /// Stop logging compiled SQL.
    pub fn disable_sql_logging(mut self) -> Self {
        self.log_sql = false;
        self
    }

    /// Keep SQL logging but leave parameter values out of it.
    pub fn hide_params(mut self) -> Self {
        self.log_params = false;
        self
    }
}

/// Pagination middleware options.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// Rows per page when the criteria does not say. Must be at least 1.
    pub default_rows: i64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self { default_rows: 20 }
    }
}

impl PaginationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_rows(mut self, rows: i64) -> Self {
        self.default_rows = rows;
        self
    }

    pub fn validate(&self) -> SpecResult<()> {
        if self.default_rows < 1 {
            return Err(SpecError::config(format!(
                "pagination.default_rows must be >= 1, got {}",
                self.default_rows
            )));
        }
        Ok(())
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub driver: DriverConfig,
    pub pagination: PaginationConfig,
}

impl PipelineConfig {
    /// Parse and validate TOML text.
    pub fn from_toml_str(content: &str) -> SpecResult<Self> {
        let config: PipelineConfig = toml::from_str(content)
            .map_err(|e| SpecError::config(format!("invalid pipeline config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> SpecResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| SpecError::config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> SpecResult<()> {
        self.pagination.validate()
    }
}
