use std::fmt;
use std::path::PathBuf;

/// Result type for rendering operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while rendering or writing templates
#[derive(Debug)]
pub enum Error {
    /// Writing a generated template failed
    Io { path: PathBuf, source: std::io::Error },

    /// Client descriptor could not be serialized
    Json(serde_json::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io { path, source } => {
                write!(f, "Failed to write template {}: {}", path.display(), source)
            }
            Error::Json(err) => write!(f, "Descriptor serialization error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io { source, .. } => Some(source),
            Error::Json(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}
