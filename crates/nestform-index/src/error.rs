use std::fmt;

/// Result type for nestform-index operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the index layer
#[derive(Debug)]
pub enum Error {
    /// Database operation failed
    Database(rusqlite::Error),

    /// IO operation failed
    Io(std::io::Error),

    /// Stored field document could not be encoded or decoded
    Json(serde_json::Error),

    /// Store file was written by a newer schema than this build understands
    SchemaVersion { found: i32, supported: i32 },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Database(err) => {
                let msg = err.to_string();
                // Detect schema mismatch errors and provide actionable hint
                if msg.contains("no such column") || msg.contains("no such table") {
                    write!(
                        f,
                        "Database schema mismatch: {}. The store layout is not the one this build expects.",
                        msg
                    )
                } else {
                    write!(f, "Database error: {}", err)
                }
            }
            Error::Io(err) => write!(f, "IO error: {}", err),
            Error::Json(err) => write!(f, "Field document error: {}", err),
            Error::SchemaVersion { found, supported } => write!(
                f,
                "Record store has schema version {} but this build supports up to {}; upgrade nestform",
                found, supported
            ),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Database(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::Json(err) => Some(err),
            Error::SchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

impl From<Error> for nestform_types::Error {
    fn from(err: Error) -> Self {
        nestform_types::Error::backend(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_mismatch_error_message() {
        // Simulate a "no such column" error
        let sqlite_err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(1),
            Some("no such column: parent_id".to_string()),
        );
        let err = Error::Database(sqlite_err);
        let msg = err.to_string();

        assert!(msg.contains("Database schema mismatch"));
        assert!(msg.contains("no such column: parent_id"));
    }

    #[test]
    fn test_regular_database_error_message() {
        let sqlite_err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(1),
            Some("UNIQUE constraint failed".to_string()),
        );
        let err = Error::Database(sqlite_err);
        let msg = err.to_string();

        assert!(msg.starts_with("Database error:"));
        assert!(!msg.contains("schema mismatch"));
    }

    #[test]
    fn test_converts_into_store_error() {
        let err: nestform_types::Error = Error::SchemaVersion {
            found: 2,
            supported: 1,
        }
        .into();
        assert!(matches!(err, nestform_types::Error::Backend(_)));
        assert!(err.to_string().starts_with("Store error: Record store has schema version 2"));
    }
}
