//! Error types for the Blorb crate.

use gamearc_common::ErrorKind;
use thiserror::Error;

/// Errors that can occur when opening a Blorb file.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Common library error.
    #[error("{0}")]
    Common(#[from] gamearc_common::Error),

    /// One of the fixed prologue tags did not match.
    #[error("bad magic: expected {field} {expected:?}, got {actual:?}")]
    BadMagic {
        field: &'static str,
        expected: String,
        actual: String,
    },

    /// The index chunk length disagrees with its record count.
    #[error("size mismatch: expected index size {expected}, got {actual} (count: {count})")]
    SizeMismatch { expected: u64, actual: u32, count: u32 },

    /// An index record names a resource usage outside the known set.
    #[error("unknown resource type {0:?}")]
    UnknownResourceType(String),
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::Io,
            Self::Common(e) => e.kind(),
            Self::BadMagic { .. } | Self::UnknownResourceType(_) => ErrorKind::Format,
            Self::SizeMismatch { .. } => ErrorKind::SizeMismatch,
        }
    }
}

/// Result type for Blorb operations.
pub type Result<T> = std::result::Result<T, Error>;
