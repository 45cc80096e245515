//! Error types and result types for storer operations.
//!
//! Every backend maps its native failures into one of the four kinds below.
//! Use [`StorerResult<T>`] as the return type for fallible operations.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all errors a [`Storer`](crate::storer::Storer) can surface.
///
/// Raw driver errors never cross the contract boundary; adapters translate
/// them into one of these variants first.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorerError {
    /// No record matched where one was required.
    #[error("not found")]
    NotFound,
    /// The table name, query, change, pagination or options were malformed.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// The backend cannot express this operation or option combination.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
    /// Connectivity, timeout, or underlying client library failure.
    #[error("Driver error: {0}")]
    Driver(String),
}

/// Fieldless discriminant of [`StorerError`], for branching without matching
/// on the message payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InvalidArgument,
    Unsupported,
    Driver,
}

impl StorerError {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorerError::NotFound => ErrorKind::NotFound,
            StorerError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            StorerError::Unsupported(_) => ErrorKind::Unsupported,
            StorerError::Driver(_) => ErrorKind::Driver,
        }
    }

    /// Returns `true` if this is [`StorerError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorerError::NotFound)
    }

    /// Wraps a failure to decode a stored record into a caller type.
    pub(crate) fn decode(err: impl std::fmt::Display) -> Self {
        StorerError::Driver(format!("failed to decode record: {err}"))
    }
}

/// A specialized `Result` type for storer operations.
pub type StorerResult<T> = Result<T, StorerError>;

impl From<BsonError> for StorerError {
    fn from(err: BsonError) -> Self {
        StorerError::InvalidArgument(err.to_string())
    }
}

impl From<SerdeJsonError> for StorerError {
    fn from(err: SerdeJsonError) -> Self {
        StorerError::InvalidArgument(err.to_string())
    }
}
