//! Storage error types for progman-storage.

use std::path::PathBuf;

use thiserror::Error;

use crate::files::BodyKind;

/// Errors produced by storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// SQLite operation failed.
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Schema migration failed.
    #[error("migration error: {0}")]
    Migration(String),

    /// A filesystem operation failed.
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No metadata record exists for the program.
    #[error("program not found: {0}")]
    ProgramNotFound(String),

    /// A metadata record already exists for the program.
    #[error("program already exists: {0}")]
    ProgramExists(String),

    /// The program has no body file of the given kind.
    #[error("{kind} body not found for program {id}")]
    BodyNotFound { kind: BodyKind, id: String },

    /// A body file already exists where a new one was to be created.
    #[error("{kind} body already exists for program {id}")]
    BodyExists { kind: BodyKind, id: String },

    /// A stored value could not be decoded.
    #[error("corrupt record: {reason}")]
    Corrupt { reason: String },
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }
}
