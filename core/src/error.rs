use thiserror::Error;

#[derive(Debug, Error)]
pub enum VellumError {
    /// A criteria expression could not be classified into any accepted shape
    #[error("Invalid query expression: {0}")]
    InvalidExpression(String),

    /// A raw clause failed injection screening
    #[error("SQL injection attempt detected: {0}")]
    SecurityViolation(String),

    /// No relation definition exists for the alias on the parent class
    #[error("No foreign key definition for parent class {class} using relation alias {alias}")]
    UnresolvedRelation { class: String, alias: String },

    /// The class is not known to the metadata catalog
    #[error("Could not load class: {0}")]
    UnknownClass(String),

    /// The query could not be turned into SQL
    #[error("Compilation error: {0}")]
    CompilationFailure(String),

    /// Error reported by the execution layer
    #[error("Execution error: {0}")]
    Execution(String),

    /// Inconsistent or unreadable model metadata
    #[error("Metadata error: {0}")]
    Metadata(String),

    /// Error reported by a cache provider
    #[error("Cache error: {0}")]
    Cache(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON (de)serialization failure for graphs, maps or cached rows
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Rusqlite specific errors
    #[cfg(feature = "rusqlite")]
    #[error("Rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
}

impl VellumError {
    /// Returns `true` for errors the builder recovers from by substituting an
    /// always-false condition.
    pub fn is_fail_closed(&self) -> bool {
        matches!(
            self,
            VellumError::SecurityViolation(_) | VellumError::InvalidExpression(_)
        )
    }
}

/// Result type for vellum operations
pub type Result<T> = std::result::Result<T, VellumError>;
