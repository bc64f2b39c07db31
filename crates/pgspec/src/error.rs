//! Error types for pgspec

use thiserror::Error;

/// Result type alias for pgspec operations
pub type SpecResult<T> = Result<T, SpecError>;

/// Errors raised while defining, compiling, or executing a query.
#[derive(Debug, Error)]
pub enum SpecError {
    /// The query pipeline is wired incorrectly (no source, duplicate or unknown rule, bad config).
    #[error("Configuration error: {0}")]
    Config(String),

    /// The statement cannot be turned into SQL (missing FROM, empty group, bad identifier).
    #[error("Compile error: {0}")]
    Compile(String),

    /// Store error from `tokio-postgres`, passed through untouched.
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Store error from any other executor, passed through untouched.
    #[error("Store error: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// A caller-supplied value cannot be used as requested.
    #[error("Validation error: {0}")]
    Validation(String),
}

impl SpecError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a compile error
    pub fn compile(message: impl Into<String>) -> Self {
        Self::Compile(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Wrap an error produced by a non-Postgres store.
    pub fn store<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Store(Box::new(err))
    }

    /// Check if this is a configuration error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Check if this is a compile error
    pub fn is_compile(&self) -> bool {
        matches!(self, Self::Compile(_))
    }

    /// Check if the error came from the backing store.
    pub fn is_store(&self) -> bool {
        matches!(self, Self::Query(_) | Self::Store(_))
    }
}
