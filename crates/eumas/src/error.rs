//! Error types for EUMAS
//!
//! Every error carries a message, an optional machine-readable code and a
//! details map. Errors built through [`EumasError::new`] (or one of the kind
//! shorthands) are logged once at construction.

use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;

/// Message, code and details shared by every error kind
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorContext {
    /// Human-readable description
    pub message: String,
    /// Optional code for programmatic handling
    pub code: Option<String>,
    /// Additional structured details
    pub details: Map<String, Value>,
}

impl ErrorContext {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            details: Map::new(),
        }
    }

    /// Attach a machine-readable code
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Attach a single detail entry
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl From<String> for ErrorContext {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for ErrorContext {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Discriminant of [`EumasError`], convenient for branching and logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Config,
    Database,
    Memory,
    Archetype,
    Validation,
    Embedding,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Config => "ConfigurationError",
            ErrorKind::Database => "DatabaseError",
            ErrorKind::Memory => "MemoryError",
            ErrorKind::Archetype => "ArchetypeError",
            ErrorKind::Validation => "ValidationError",
            ErrorKind::Embedding => "EmbeddingError",
        }
    }
}

/// Main error type for EUMAS operations
#[derive(Error, Debug)]
pub enum EumasError {
    /// A required setting is absent or malformed
    #[error("Configuration error: {0}")]
    Config(ErrorContext),

    /// The vector store rejected or could not execute an operation
    #[error("Database error: {0}")]
    Database(ErrorContext),

    /// Malformed memory record
    #[error("Memory error: {0}")]
    Memory(ErrorContext),

    /// Archetype-specific misuse
    #[error("Archetype error: {0}")]
    Archetype(ErrorContext),

    /// Input rejected before reaching the store
    #[error("Validation error: {0}")]
    Validation(ErrorContext),

    /// Embedding provider failure, whatever the underlying cause
    #[error("Embedding error: {0}")]
    Embedding(ErrorContext),
}

impl EumasError {
    /// Build an error of the given kind and emit it to the log.
    pub fn new(kind: ErrorKind, context: impl Into<ErrorContext>) -> Self {
        let context = context.into();
        let details = Value::Object(context.details.clone());
        tracing::error!(
            error_type = kind.as_str(),
            error_code = context.code.as_deref(),
            error_details = %details,
            "{}",
            context.message
        );

        match kind {
            ErrorKind::Config => EumasError::Config(context),
            ErrorKind::Database => EumasError::Database(context),
            ErrorKind::Memory => EumasError::Memory(context),
            ErrorKind::Archetype => EumasError::Archetype(context),
            ErrorKind::Validation => EumasError::Validation(context),
            ErrorKind::Embedding => EumasError::Embedding(context),
        }
    }

    pub fn config(context: impl Into<ErrorContext>) -> Self {
        Self::new(ErrorKind::Config, context)
    }

    pub fn database(context: impl Into<ErrorContext>) -> Self {
        Self::new(ErrorKind::Database, context)
    }

    pub fn memory(context: impl Into<ErrorContext>) -> Self {
        Self::new(ErrorKind::Memory, context)
    }

    pub fn archetype(context: impl Into<ErrorContext>) -> Self {
        Self::new(ErrorKind::Archetype, context)
    }

    pub fn validation(context: impl Into<ErrorContext>) -> Self {
        Self::new(ErrorKind::Validation, context)
    }

    /// Wrap an embedding provider failure. The cause text is kept verbatim
    /// after the `Failed to generate embeddings:` prefix.
    pub fn embedding(cause: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::Embedding,
            format!("Failed to generate embeddings: {cause}"),
        )
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            EumasError::Config(_) => ErrorKind::Config,
            EumasError::Database(_) => ErrorKind::Database,
            EumasError::Memory(_) => ErrorKind::Memory,
            EumasError::Archetype(_) => ErrorKind::Archetype,
            EumasError::Validation(_) => ErrorKind::Validation,
            EumasError::Embedding(_) => ErrorKind::Embedding,
        }
    }

    pub fn context(&self) -> &ErrorContext {
        match self {
            EumasError::Config(ctx)
            | EumasError::Database(ctx)
            | EumasError::Memory(ctx)
            | EumasError::Archetype(ctx)
            | EumasError::Validation(ctx)
            | EumasError::Embedding(ctx) => ctx,
        }
    }

    pub fn message(&self) -> &str {
        &self.context().message
    }

    pub fn code(&self) -> Option<&str> {
        self.context().code.as_deref()
    }

    pub fn details(&self) -> &Map<String, Value> {
        &self.context().details
    }
}

/// Result type alias for EUMAS operations
pub type Result<T> = std::result::Result<T, EumasError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::capture_logs;

    #[test]
    fn test_error_display() {
        let err = EumasError::database("Schema creation failed");
        assert_eq!(err.to_string(), "Database error: Schema creation failed");

        let err = EumasError::validation("Invalid archetype: Ella-Z");
        assert_eq!(err.to_string(), "Validation error: Invalid archetype: Ella-Z");
    }

    #[test]
    fn test_error_with_code_and_details() {
        let err = EumasError::config(
            ErrorContext::new("Missing API key")
                .with_code("CONFIG_001")
                .with_detail("key", "OPENAI_API_KEY"),
        );

        assert_eq!(err.kind(), ErrorKind::Config);
        assert_eq!(err.message(), "Missing API key");
        assert_eq!(err.code(), Some("CONFIG_001"));
        assert_eq!(err.details()["key"], "OPENAI_API_KEY");
    }

    #[test]
    fn test_error_defaults() {
        let err = EumasError::memory("Memory not found");
        assert!(err.code().is_none());
        assert!(err.details().is_empty());
    }

    #[test]
    fn test_embedding_error_prefix() {
        let err = EumasError::embedding("API error");
        assert_eq!(
            err.to_string(),
            "Embedding error: Failed to generate embeddings: API error"
        );
        assert_eq!(err.kind(), ErrorKind::Embedding);
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(ErrorKind::Config.as_str(), "ConfigurationError");
        assert_eq!(ErrorKind::Archetype.as_str(), "ArchetypeError");
        assert_eq!(
            EumasError::archetype("Unknown metric").kind(),
            ErrorKind::Archetype
        );
    }

    #[test]
    fn test_error_logged_once_on_construction() {
        let logs = capture_logs(|| {
            let _err = EumasError::database(
                ErrorContext::new("Connection refused").with_code("DB_503"),
            );
        });

        assert_eq!(logs.matches("Connection refused").count(), 1);
        assert!(logs.contains("DatabaseError"));
        assert!(logs.contains("DB_503"));
    }
}
