//! Error kinds shared by the catalog, the progress store and logging sessions.
//!
//! Every variant is recoverable: the caller fixes its input and retries.
//! `StorageUnavailable` is the only kind caused by the environment rather
//! than by the request, and a failing mutation never leaves partial writes.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("unknown lesson: {0}")]
    UnknownLesson(String),

    #[error("invalid child id: {0:?}")]
    InvalidChildId(String),

    #[error("invalid entry: {0}")]
    InvalidEntry(String),

    #[error("invalid step: {0}")]
    InvalidStep(String),

    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    #[error("nothing selected: pick at least one item before committing")]
    IncompleteSelections,

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Stable machine-readable code, used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::UnknownLesson(_) => "unknown_lesson",
            Self::InvalidChildId(_) => "invalid_child_id",
            Self::InvalidEntry(_) => "invalid_entry",
            Self::InvalidStep(_) => "invalid_step",
            Self::InvalidSelection(_) => "invalid_selection",
            Self::IncompleteSelections => "incomplete_selections",
            Self::StorageUnavailable(_) => "storage_unavailable",
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Self::StorageUnavailable(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::StorageUnavailable(format!("corrupt stored value: {}", e))
    }
}
