//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::EvaluationError;
use quiz_core::model::NoteId;
use storage::sqlite::SqliteInitError;
use storage::ProgressError;

use crate::sessions::QuizMode;

/// Errors emitted by content sources.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SourceError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("invalid path {path}: {reason}")]
    InvalidPath { path: String, reason: String },
    #[error("read failed: {0}")]
    Io(String),
}

/// Errors emitted by `QuestionStore`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuestionLoadError {
    #[error("failed to load {path}: {source}")]
    Fetch {
        path: String,
        #[source]
        source: SourceError,
    },
    #[error("malformed question batch {path}: {reason}")]
    Malformed { path: String, reason: String },
}

impl QuestionLoadError {
    /// Path of the batch that aborted the load.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            QuestionLoadError::Fetch { path, .. } | QuestionLoadError::Malformed { path, .. } => {
                path
            }
        }
    }
}

/// Errors emitted by quiz sessions.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("{}", .mode.empty_message())]
    Empty { mode: QuizMode },
    #[error(transparent)]
    Load(#[from] QuestionLoadError),
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
}

/// Errors emitted by `TextbookService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TextbookError {
    #[error("could not find note with ID: {0}")]
    UnknownNote(NoteId),
    #[error("could not load {path}: {source}")]
    Source {
        path: String,
        #[source]
        source: SourceError,
    },
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Source(#[from] SourceError),
}
