//! Error types for the rowmap mapping pipeline.
//!
//! All public APIs return `MappingResult<T>`: no panics in library code.
//! Absent values (missing cells, fields the written schema lacks) are not
//! errors and never surface here.

use thiserror::Error;

/// Unified error type for all mapping operations.
#[derive(Debug, Error)]
pub enum MappingError {
    /// Schema text, annotation or field type rejected while building a mapper
    #[error("schema validation error: {0}")]
    SchemaValidation(String),

    /// Field name not present in the schema
    #[error("unknown field '{field}' in schema '{schema}'")]
    UnknownField { field: String, schema: String },

    /// Null key value on a field whose type does not admit null
    #[error("null value for non-nullable key field '{field}'")]
    NullKeyField { field: String },

    /// Increment requested on a field that is not a counter mapping
    #[error("field '{field}' is not a counter mapping")]
    NotACounter { field: String },

    /// Other caller precondition violation
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// Byte-level encode/decode failure
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Standard I/O error (schema/config files)
    #[error("io error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// JSON error while reading schema or configuration text
    #[error("json error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}

impl MappingError {
    /// Schema validation failures abort mapper construction.
    pub fn is_schema_validation(&self) -> bool {
        matches!(self, MappingError::SchemaValidation(_) | MappingError::Json { .. })
    }

    /// Caller-side precondition failures.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            MappingError::UnknownField { .. }
                | MappingError::NullKeyField { .. }
                | MappingError::NotACounter { .. }
                | MappingError::Precondition(_)
        )
    }

    pub(crate) fn schema(msg: impl Into<String>) -> Self {
        MappingError::SchemaValidation(msg.into())
    }

    pub(crate) fn serialization(msg: impl Into<String>) -> Self {
        MappingError::Serialization(msg.into())
    }
}

/// Result type alias for all mapping operations.
pub type MappingResult<T> = Result<T, MappingError>;
