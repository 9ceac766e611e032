use std::fmt;

/// Result type for nestform-engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Caller contract violations.
///
/// These are never produced by user input alone (except for tampered
/// management counters); they indicate a bug in the code driving the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreconditionError {
    /// `save()` called on a form or node that was never validated
    SaveBeforeValidate { prefix: String },

    /// `save()` called after validation reported errors
    SaveInvalid { prefix: String },

    /// `save()` called twice on the same form
    AlreadySaved { prefix: String },

    /// Children saved (commit) while the parent has no identifier yet
    ParentNotSaved { prefix: String },

    /// A non-nullable parent link would be written as null
    MissingParent { model: String },

    /// A management counter is present but not a non-negative integer
    MalformedCounter { key: String, value: String },

    /// Posted or requested rows exceed the absolute row limit
    TooManyForms {
        prefix: String,
        total: usize,
        limit: usize,
    },

    /// Row removal requested on a formset that does not allow deletion
    DeletionDisabled { prefix: String },

    /// Row index does not exist in the formset
    RowOutOfRange { prefix: String, index: usize },
}

fn display_prefix(prefix: &str) -> &str {
    if prefix.is_empty() { "<root>" } else { prefix }
}

impl fmt::Display for PreconditionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreconditionError::SaveBeforeValidate { prefix } => write!(
                f,
                "save() called before validation on '{}'",
                display_prefix(prefix)
            ),
            PreconditionError::SaveInvalid { prefix } => write!(
                f,
                "save() called on invalid form '{}'",
                display_prefix(prefix)
            ),
            PreconditionError::AlreadySaved { prefix } => {
                write!(f, "'{}' has already been saved", display_prefix(prefix))
            }
            PreconditionError::ParentNotSaved { prefix } => write!(
                f,
                "cannot save rows of '{}' before their parent has an identifier",
                prefix
            ),
            PreconditionError::MissingParent { model } => {
                write!(f, "{} requires a parent but none was assigned", model)
            }
            PreconditionError::MalformedCounter { key, value } => write!(
                f,
                "ManagementForm data has been tampered with: {}={:?}",
                key, value
            ),
            PreconditionError::TooManyForms {
                prefix,
                total,
                limit,
            } => write!(
                f,
                "'{}' declares {} rows, above the limit of {}",
                prefix, total, limit
            ),
            PreconditionError::DeletionDisabled { prefix } => {
                write!(f, "rows of '{}' cannot be deleted", prefix)
            }
            PreconditionError::RowOutOfRange { prefix, index } => {
                write!(f, "'{}' has no row {}", prefix, index)
            }
        }
    }
}

impl std::error::Error for PreconditionError {}

/// Error types that can occur in the engine layer
#[derive(Debug)]
pub enum Error {
    /// Programming-contract violation; not user-facing
    Precondition(PreconditionError),

    /// Persisted store failure before anything was committed
    Store(nestform_types::Error),

    /// A store write failed after earlier writes of the same tree were
    /// committed. Those writes are NOT rolled back.
    PartialSave {
        committed: usize,
        source: Box<Error>,
    },

    /// Submitted body could not be decoded
    PostedData(String),
}

impl Error {
    pub fn is_precondition(&self) -> bool {
        match self {
            Error::Precondition(_) => true,
            Error::PartialSave { source, .. } => source.is_precondition(),
            _ => false,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Precondition(err) => write!(f, "Precondition failed: {}", err),
            Error::Store(err) => write!(f, "{}", err),
            Error::PartialSave { committed, source } => write!(
                f,
                "Save failed after {} committed write(s); committed rows were kept: {}",
                committed, source
            ),
            Error::PostedData(msg) => write!(f, "Invalid submission: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Precondition(err) => Some(err),
            Error::Store(err) => Some(err),
            Error::PartialSave { source, .. } => Some(source.as_ref()),
            Error::PostedData(_) => None,
        }
    }
}

impl From<PreconditionError> for Error {
    fn from(err: PreconditionError) -> Self {
        Error::Precondition(err)
    }
}

impl From<nestform_types::Error> for Error {
    fn from(err: nestform_types::Error) -> Self {
        Error::Store(err)
    }
}
