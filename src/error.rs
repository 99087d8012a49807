//! Error types for the log tailer library.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for tailing operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors when opening, stating or reading the tailed file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors from the change-notification backend.
    #[error("File watcher error: {0}")]
    Watcher(#[from] notify::Error),

    /// File path errors.
    #[error("Invalid file path: {message}")]
    InvalidPath { message: String },

    /// A second line stream was requested while one is still alive.
    #[error("A line stream is already active for {}", path.display())]
    AlreadyTailing { path: PathBuf },
}

impl Error {
    /// Returns `true` when the error only means the target path does not
    /// exist right now.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Io(err) => err.kind() == std::io::ErrorKind::NotFound,
            Error::Watcher(err) => match &err.kind {
                notify::ErrorKind::PathNotFound => true,
                notify::ErrorKind::Io(io) => io.kind() == std::io::ErrorKind::NotFound,
                _ => false,
            },
            _ => false,
        }
    }
}

/// A convenient Result type for tailing operations.
pub type Result<T> = std::result::Result<T, Error>;
