//! Error types for the rgssad crate.

use gamearc_common::ErrorKind;
use thiserror::Error;

/// Errors that can occur when opening an rgssad archive.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Common library error.
    #[error("{0}")]
    Common(#[from] gamearc_common::Error),

    /// The version byte following the magic is not 3.
    #[error("unsupported rgss version {0}")]
    UnsupportedVersion(u8),

    /// A decoded path is not valid UTF-8.
    #[error("path is not valid UTF-8: {0:?}")]
    PathEncoding(String),
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::Io,
            Self::Common(e) => e.kind(),
            Self::UnsupportedVersion(_) | Self::PathEncoding(_) => ErrorKind::Format,
        }
    }
}

/// Result type for rgssad operations.
pub type Result<T> = std::result::Result<T, Error>;
