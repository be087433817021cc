//! Structured error types for dbupdate-core.
//!
//! Uses `thiserror` so the binary can match on what went wrong and pick an
//! exit code.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::ident::IdentifierError;

/// Main error type for bootstrap operations
#[derive(Error, Debug)]
pub enum BootstrapError {
    /// Server unreachable, authentication refused, or connect timed out
    #[error("connection failed: {reason}")]
    Connection { reason: String },

    /// Descriptor file absent at the expected path
    #[error("descriptor not found: {path:?}")]
    ConfigNotFound { path: PathBuf },

    /// Descriptor present but not a JSON array of objects
    #[error("invalid descriptor {path:?}: {source}")]
    DescriptorParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Descriptor entry lacks one of the required column keys
    #[error("missing required field '{field}' in descriptor entry {index}")]
    MissingField { field: &'static str, index: usize },

    /// Identifier refused before interpolation into SQL
    #[error("invalid identifier '{value}': {source}")]
    InvalidIdentifier {
        value: String,
        source: IdentifierError,
    },

    /// A single SQL statement failed on the server
    #[error("{source}")]
    Statement {
        statement: String,
        source: sqlx::Error,
    },

    /// I/O operation failed
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

/// Result type alias for dbupdate-core operations
pub type Result<T> = std::result::Result<T, BootstrapError>;

impl BootstrapError {
    /// Create a connection error
    pub fn connection(reason: impl Into<String>) -> Self {
        Self::Connection {
            reason: reason.into(),
        }
    }

    /// Create a descriptor-not-found error
    pub fn config_not_found(path: impl Into<PathBuf>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    /// Create an invalid identifier error
    pub fn invalid_identifier(value: impl Into<String>, source: IdentifierError) -> Self {
        Self::InvalidIdentifier {
            value: value.into(),
            source,
        }
    }

    /// Create a statement error carrying the SQL text that failed
    pub fn statement(statement: impl Into<String>, source: sqlx::Error) -> Self {
        Self::Statement {
            statement: statement.into(),
            source,
        }
    }

    /// SQL text attached to this error, if any
    pub fn statement_text(&self) -> Option<&str> {
        match self {
            Self::Statement { statement, .. } => Some(statement),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BootstrapError::MissingField {
            field: "eventTitle",
            index: 2,
        };
        assert_eq!(
            err.to_string(),
            "missing required field 'eventTitle' in descriptor entry 2"
        );

        let err = BootstrapError::config_not_found("/srv/app/update/config.json");
        assert!(err.to_string().contains("descriptor not found"));
        assert!(err.to_string().contains("/srv/app/update/config.json"));
    }

    #[test]
    fn test_statement_text_only_on_statement_errors() {
        let err = BootstrapError::statement(
            "CREATE TABLE t (x TEXT)",
            sqlx::Error::Protocol("boom".into()),
        );
        assert_eq!(err.statement_text(), Some("CREATE TABLE t (x TEXT)"));
        assert!(err.to_string().contains("boom"));

        let err = BootstrapError::connection("refused");
        assert_eq!(err.statement_text(), None);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let err: BootstrapError = io_err.into();

        assert!(matches!(err, BootstrapError::Io { .. }));
    }
}
