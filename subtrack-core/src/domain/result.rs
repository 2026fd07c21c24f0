//! Result and error types for the core library

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Core library error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid {field} format, expected MM-YYYY: {value:?}")]
    InvalidDateFormat { field: &'static str, value: String },

    #[error("subscription not found: {0}")]
    NotFound(Uuid),

    #[error("storage error: {context}: {source}")]
    Storage {
        context: String,
        #[source]
        source: StorageSource,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Underlying cause of a storage failure
#[derive(Error, Debug)]
pub enum StorageSource {
    #[error(transparent)]
    Database(#[from] duckdb::Error),

    #[error("{0}")]
    Message(String),
}

/// Coarse classification of [`Error`], used by boundaries to pick a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidDateFormat,
    NotFound,
    Storage,
    Config,
}

impl Error {
    /// Create an invalid date error for the named field
    pub fn invalid_date(field: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidDateFormat {
            field,
            value: value.into(),
        }
    }

    /// Wrap a DuckDB error with operation context
    pub fn storage(context: impl Into<String>, source: duckdb::Error) -> Self {
        Self::Storage {
            context: context.into(),
            source: StorageSource::Database(source),
        }
    }

    /// Create a storage error that has no underlying driver error
    pub fn storage_msg(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Storage {
            context: context.into(),
            source: StorageSource::Message(msg.into()),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidDateFormat { .. } => ErrorKind::InvalidDateFormat,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Storage { .. } | Error::Io(_) => ErrorKind::Storage,
            Error::Config(_) => ErrorKind::Config,
        }
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

/// Extension for attaching operation context to DuckDB results
pub(crate) trait StorageContext<T> {
    fn storage_context<F, S>(self, context: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> StorageContext<T> for std::result::Result<T, duckdb::Error> {
    fn storage_context<F, S>(self, context: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| Error::storage(context(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            Error::invalid_date("start_date", "7-2025").kind(),
            ErrorKind::InvalidDateFormat
        );
        assert_eq!(Error::NotFound(Uuid::nil()).kind(), ErrorKind::NotFound);
        assert_eq!(
            Error::storage_msg("insert", "disk full").kind(),
            ErrorKind::Storage
        );
        assert_eq!(Error::Config("bad".into()).kind(), ErrorKind::Config);
    }

    #[test]
    fn test_storage_message_includes_context() {
        let err = Error::storage_msg("update subscription 42", "connection lost");
        let msg = err.to_string();
        assert!(msg.contains("update subscription 42"));
        assert!(msg.contains("connection lost"));
    }

    #[test]
    fn test_invalid_date_message_names_field() {
        let err = Error::invalid_date("period_start", "2025-07");
        assert!(err.to_string().contains("period_start"));
        assert!(err.to_string().contains("2025-07"));
    }
}
