//! Error types for pgrecord

use crate::validation::ValidationErrors;
use thiserror::Error;
use tokio_postgres::error::DbError;

/// Result type alias for pgrecord operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for table and record operations
#[derive(Debug, Error)]
pub enum OrmError {
    /// Error reported by the database driver (connectivity, constraint, syntax).
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// An operation expecting at least one row got none.
    #[error("Not found: {0}")]
    NotFound(String),

    /// An operation expecting exactly one row got more.
    #[error("expected {expected} row(s), got {got}")]
    TooManyRows { expected: usize, got: usize },

    /// By-name access to a column the table does not have.
    #[error("Unknown attribute: {0}")]
    UnknownAttribute(String),

    /// A record hook rejected the record.
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Programming error: the call is not valid for this table or record state.
    #[error("Precondition violated: {0}")]
    Precondition(String),

    /// Domain error produced by a caller-supplied error mapper.
    #[error(transparent)]
    Custom(Box<dyn std::error::Error + Send + Sync + 'static>),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl OrmError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a too-many-rows error
    pub fn too_many_rows(expected: usize, got: usize) -> Self {
        Self::TooManyRows { expected, got }
    }

    /// Create a precondition error
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }

    /// Wrap an arbitrary domain error
    pub fn custom(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Custom(Box::new(err))
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is a too-many-rows error
    pub fn is_too_many_rows(&self) -> bool {
        matches!(self, Self::TooManyRows { .. })
    }

    /// Check if this is an unknown attribute error
    pub fn is_unknown_attribute(&self) -> bool {
        matches!(self, Self::UnknownAttribute(_))
    }

    /// Check if this is a precondition violation
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Precondition(_))
    }

    /// Per-field validation detail, if this is a validation failure.
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Validation(errs) => Some(errs),
            _ => None,
        }
    }

    /// The server-side error, if the driver reported one.
    pub fn db_error(&self) -> Option<&DbError> {
        match self {
            Self::Query(err) => err.as_db_error(),
            _ => None,
        }
    }

    /// SQLSTATE code of the server-side error, if any.
    pub fn sqlstate(&self) -> Option<&str> {
        self.db_error().map(|e| e.code().code())
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        self.sqlstate() == Some("23505")
    }
}
