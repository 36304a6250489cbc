//! Error types for the rpa crate.

use gamearc_common::ErrorKind;
use thiserror::Error;

/// Errors that can occur when opening an rpa archive.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Common library error.
    #[error("{0}")]
    Common(#[from] gamearc_common::Error),

    /// A header field is not hexadecimal.
    #[error("invalid {field} in header: {value:?}")]
    InvalidHexField { field: &'static str, value: String },

    /// The header is not terminated by a newline at byte 33.
    #[error("incomplete header")]
    IncompleteHeader,

    /// The trailer offset points at or past the end of the file.
    #[error("trailer offset out of range: offset {offset}, size {size}")]
    TrailerOffsetOutOfRange { offset: u64, size: u64 },

    /// The trailer is not a valid zlib stream.
    #[error("trailer decompress: {0}")]
    Decompress(#[source] std::io::Error),

    /// The decompressed trailer is not a valid pickle.
    #[error("trailer decode: {0}")]
    Pickle(#[from] serde_pickle::Error),

    /// The trailer root object is not a `dict`.
    #[error("trailer is not a map, got {0}")]
    TrailerNotMap(&'static str),

    /// A trailer entry does not have the `[(offset, size, extra)]` shape.
    #[error("malformed trailer entry {path:?}: {reason}")]
    MalformedEntry { path: String, reason: String },

    /// A decoded entry offset lies at or past the end of the file.
    #[error("offset {offset} of {path:?} beyond file size {size}")]
    OffsetOutOfRange { path: String, offset: u64, size: u64 },
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::Io,
            Self::Common(e) => e.kind(),
            Self::InvalidHexField { .. }
            | Self::IncompleteHeader
            | Self::Decompress(_)
            | Self::Pickle(_)
            | Self::TrailerNotMap(_)
            | Self::MalformedEntry { .. } => ErrorKind::Format,
            Self::TrailerOffsetOutOfRange { .. } | Self::OffsetOutOfRange { .. } => {
                ErrorKind::SizeMismatch
            }
        }
    }
}

/// Result type for rpa operations.
pub type Result<T> = std::result::Result<T, Error>;
