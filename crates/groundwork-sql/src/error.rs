//! Error types for rebinding, mapping and executing queries.

use crate::value::TypeMismatch;

/// Boxed error produced by a database backend.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while building, rebinding or running a query.
#[derive(Debug, thiserror::Error)]
pub enum SqlError {
    /// A parameter name could not be resolved by the argument source.
    #[error("invalid arg: wanted {name:?}, but {reason}")]
    InvalidArg {
        /// The parameter name without the leading `@`.
        name: String,
        /// Why the lookup failed.
        reason: String,
    },

    /// A record type cannot be mapped to columns or arguments.
    #[error("invalid record {record}: {reason}")]
    InvalidRecord {
        /// The Rust type name of the record.
        record: &'static str,
        /// Why the mapping failed.
        reason: String,
    },

    /// A single-row query did not return any row.
    #[error("no rows in result set")]
    NotFound,

    /// A column value could not be stored into its field.
    #[error("cannot scan column {column:?}: {source}")]
    Scan {
        /// The result column name.
        column: String,
        /// The underlying type mismatch.
        #[source]
        source: TypeMismatch,
    },

    /// A row was read before the cursor was advanced onto one.
    #[error("no current row, advance the rows first")]
    NoCurrentRow,

    /// No executor is available to run the query.
    #[error("no executor available: {0}")]
    NoExecutor(String),

    /// Error reported by the database backend.
    #[error("database error: {0}")]
    Backend(#[source] BoxError),
}

impl SqlError {
    /// Wraps a backend error.
    pub fn backend(error: impl Into<BoxError>) -> Self {
        Self::Backend(error.into())
    }

    /// Returns whether this is the [`SqlError::NotFound`] condition.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    pub(crate) fn invalid_arg(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidArg {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_record(record: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidRecord {
            record,
            reason: reason.into(),
        }
    }
}

/// Result type for query operations.
pub type Result<T> = std::result::Result<T, SqlError>;
