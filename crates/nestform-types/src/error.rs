use std::fmt;

use crate::RecordId;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur at the persisted-store boundary
#[derive(Debug)]
pub enum Error {
    /// Record does not exist (or belongs to another model)
    NotFound { model: String, id: RecordId },

    /// Model name is not declared in the schema
    UnknownModel(String),

    /// Backend-specific failure (SQLite, IO, serialization)
    Backend(Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Backend(Box::new(err))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotFound { model, id } => write!(f, "{} with id {} does not exist", model, id),
            Error::UnknownModel(name) => write!(f, "Unknown model: {}", name),
            Error::Backend(err) => write!(f, "Store error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Backend(err) => Some(err.as_ref()),
            Error::NotFound { .. } | Error::UnknownModel(_) => None,
        }
    }
}
