//! Error types for the asar crate.

use gamearc_common::ErrorKind;
use thiserror::Error;

/// Errors that can occur when opening an asar archive.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Common library error.
    #[error("{0}")]
    Common(#[from] gamearc_common::Error),

    /// The size pickle at the start of the file is not 4 bytes long.
    #[error("malformed prologue: expected size pickle length 4, got {0}")]
    MalformedPrologue(u32),

    /// The JSON index could not be decoded.
    #[error("index JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A node name in the index is `..` or `/`.
    #[error("bad path: {0:?}")]
    BadPath(String),

    /// A leaf offset is missing or not a decimal integer.
    #[error("bad offset {offset:?} for {path:?}")]
    BadOffset { path: String, offset: Option<String> },
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::Io,
            Self::Common(e) => e.kind(),
            Self::MalformedPrologue(_) | Self::Json(_) | Self::BadOffset { .. } => {
                ErrorKind::Format
            }
            Self::BadPath(_) => ErrorKind::UnsafePath,
        }
    }
}

/// Result type for asar operations.
pub type Result<T> = std::result::Result<T, Error>;
