//! Error types for gamearc-common.

use thiserror::Error;

/// Coarse classification of a failure while opening or reading a container.
///
/// Every codec error maps onto one of these through its `kind()` method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Magic, version or constant mismatch.
    Format,
    /// Declared lengths inconsistent with computed expectations.
    SizeMismatch,
    /// Path traversal or absolute path in index data.
    UnsafePath,
    /// Recognized but unimplemented feature.
    ///
    /// Such entries are skipped at open time rather than failing it, so no
    /// error returns this kind; the skip warnings carry it as their `kind`
    /// field.
    UnsupportedFeature,
    /// Read failure against the underlying source.
    Io,
}

/// Common error type for gamearc operations.
#[derive(Debug, Error)]
pub enum Error {
    /// End of buffer reached while reading.
    #[error("unexpected end of buffer: needed {needed} bytes but only {available} available")]
    UnexpectedEof { needed: usize, available: usize },

    /// Invalid magic bytes encountered.
    #[error("invalid magic: expected {expected:?}, got {actual:?}")]
    InvalidMagic {
        expected: Vec<u8>,
        actual: Vec<u8>,
    },

    /// Value did not match expected.
    #[error("expected value {expected}, got {actual}")]
    ExpectedValue { expected: String, actual: String },

    /// Path is absolute, escapes the archive root, or is otherwise unusable.
    #[error("unsafe path: {0:?}")]
    UnsafePath(String),

    /// Entry byte range extends past the end of the source.
    #[error("entry out of bounds: offset {offset} + size {size} exceeds source size {source_size}")]
    EntryOutOfBounds {
        offset: u64,
        size: u64,
        source_size: u64,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidMagic { .. } | Self::ExpectedValue { .. } => ErrorKind::Format,
            Self::UnexpectedEof { .. } | Self::EntryOutOfBounds { .. } => ErrorKind::SizeMismatch,
            Self::UnsafePath(_) => ErrorKind::UnsafePath,
            Self::Io(_) => ErrorKind::Io,
        }
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
