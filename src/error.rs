//! Error types for cached query execution
//!
//! Backend failures and decode failures are deliberately separate variants so
//! that neither can be mistaken for a cache miss.

use crate::query::{Operation, QueryForm, ResultKind};
use thiserror::Error;

/// Main error type for the caching layer
#[derive(Error, Debug)]
pub enum CacheError {
    /// The cache store cannot be reached or rejected the command
    #[error("Cache backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Stored bytes do not parse into the expected result shape
    #[error("Failed to decode cached {kind} result: {reason}")]
    Decode { kind: ResultKind, reason: String },

    /// A live result could not be serialized for storage
    #[error("Failed to encode result for caching: {0}")]
    Encode(String),

    /// The upstream query engine failed; never cached
    #[error("Query execution failed: {0}")]
    Execution(String),

    /// The backend has no way to express scope invalidation
    #[error("Scope invalidation is not supported by the {backend} backend; entries expire by TTL only")]
    InvalidationUnsupported { backend: &'static str },

    /// The operation cannot run a query of this form (e.g. `ask` on a SELECT)
    #[error("Cannot run a {form} query with {operation}")]
    FormMismatch {
        operation: Operation,
        form: QueryForm,
    },

    /// The query text is not valid SPARQL
    #[error("Query parse error: {0}")]
    QueryParse(String),

    /// Operation timeout
    #[error("Operation timed out after {timeout_seconds}s: {context}")]
    TimeoutError {
        timeout_seconds: u64,
        context: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic error with context
    #[error("Error: {0}")]
    Other(String),
}

impl CacheError {
    /// Build a decode error for the given result kind
    pub fn decode(kind: ResultKind, reason: impl ToString) -> Self {
        CacheError::Decode {
            kind,
            reason: reason.to_string(),
        }
    }

    /// True when the cache store itself failed (as opposed to a miss)
    pub fn is_backend_failure(&self) -> bool {
        matches!(
            self,
            CacheError::BackendUnavailable(_) | CacheError::TimeoutError { .. }
        )
    }

    /// True when a stored value was present but unreadable
    pub fn is_decode_failure(&self) -> bool {
        matches!(self, CacheError::Decode { .. })
    }
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

impl From<String> for CacheError {
    fn from(s: String) -> Self {
        CacheError::Other(s)
    }
}

impl From<&str> for CacheError {
    fn from(s: &str) -> Self {
        CacheError::Other(s.to_string())
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(e: redis::RedisError) -> Self {
        if e.is_timeout() {
            CacheError::TimeoutError {
                timeout_seconds: 0,
                context: e.to_string(),
            }
        } else {
            CacheError::BackendUnavailable(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = CacheError::BackendUnavailable("connection refused".to_string());
        assert_eq!(
            error.to_string(),
            "Cache backend unavailable: connection refused"
        );

        let decode = CacheError::decode(ResultKind::Graph, "unexpected token");
        assert!(decode.to_string().contains("graph"));
        assert!(decode.to_string().contains("unexpected token"));

        let mismatch = CacheError::FormMismatch {
            operation: Operation::Ask,
            form: QueryForm::Select,
        };
        assert_eq!(mismatch.to_string(), "Cannot run a SELECT query with ask");

        let unsupported = CacheError::InvalidationUnsupported { backend: "ttl-remote" };
        assert!(unsupported.to_string().contains("ttl-remote"));
    }

    #[test]
    fn test_failure_classification() {
        assert!(CacheError::BackendUnavailable("down".into()).is_backend_failure());
        assert!(!CacheError::BackendUnavailable("down".into()).is_decode_failure());
        assert!(CacheError::decode(ResultKind::Boolean, "maybe").is_decode_failure());
        assert!(!CacheError::Execution("boom".into()).is_backend_failure());
    }

    #[test]
    fn test_error_conversion() {
        let error: CacheError = "test error".into();
        assert!(matches!(error, CacheError::Other(_)));

        let error: CacheError = "test error".to_string().into();
        assert!(matches!(error, CacheError::Other(_)));
    }
}
