use std::fmt;

/// Result type for nestform-runtime operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the runtime layer
#[derive(Debug)]
pub enum Error {
    /// Database/index layer error
    Index(nestform_index::Error),

    /// Store contract error (missing record, unknown model)
    Store(nestform_types::Error),

    /// Form engine error (precondition or failed save)
    Engine(nestform_engine::Error),

    /// Markup or template generation error
    Render(nestform_render::Error),

    /// IO operation failed
    Io(std::io::Error),

    /// File watcher error
    Watch(notify::Error),

    /// Configuration error
    Config(String),

    /// Workspace not initialized
    NotInitialized(String),

    /// Invalid operation or state
    InvalidOperation(String),
}

impl Error {
    /// True for a missing record or an unknown model name.
    pub fn is_not_found(&self) -> bool {
        let store = match self {
            Error::Store(err) => err,
            Error::Engine(nestform_engine::Error::Store(err)) => err,
            _ => return false,
        };
        matches!(
            store,
            nestform_types::Error::NotFound { .. } | nestform_types::Error::UnknownModel(_)
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Index(err) => write!(f, "Index error: {}", err),
            Error::Store(err) => write!(f, "{}", err),
            Error::Engine(err) => write!(f, "{}", err),
            Error::Render(err) => write!(f, "Render error: {}", err),
            Error::Io(err) => write!(f, "IO error: {}", err),
            Error::Watch(err) => write!(f, "Watch error: {}", err),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::NotInitialized(msg) => write!(f, "Workspace not initialized: {}", msg),
            Error::InvalidOperation(msg) => write!(f, "Invalid operation: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Index(err) => Some(err),
            Error::Store(err) => Some(err),
            Error::Engine(err) => Some(err),
            Error::Render(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::Watch(err) => Some(err),
            Error::Config(_) | Error::NotInitialized(_) | Error::InvalidOperation(_) => None,
        }
    }
}

impl From<nestform_index::Error> for Error {
    fn from(err: nestform_index::Error) -> Self {
        Error::Index(err)
    }
}

impl From<nestform_types::Error> for Error {
    fn from(err: nestform_types::Error) -> Self {
        Error::Store(err)
    }
}

impl From<nestform_engine::Error> for Error {
    fn from(err: nestform_engine::Error) -> Self {
        Error::Engine(err)
    }
}

impl From<nestform_render::Error> for Error {
    fn from(err: nestform_render::Error) -> Self {
        Error::Render(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<notify::Error> for Error {
    fn from(err: notify::Error) -> Self {
        Error::Watch(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Config(err.to_string())
    }
}
