//! Error types for the wolf crate.

use gamearc_common::ErrorKind;
use thiserror::Error;

/// Errors that can occur when opening a wolf archive.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Common library error.
    #[error("{0}")]
    Common(#[from] gamearc_common::Error),

    /// The decrypted header does not start with `DX`.
    #[error("file header must start with DX, got {0:?}")]
    BadMagic([u8; 2]),

    /// The header declares a version other than 6.
    #[error("unsupported version {0}, expected 6")]
    UnsupportedVersion(u16),

    /// The header declares a codepage other than 932.
    #[error("unsupported codepage {0}, expected 932 (Shift-JIS)")]
    UnsupportedCodepage(u64),

    /// A file or directory name is not a single path segment.
    #[error("bad path: {0:?}")]
    BadName(String),

    /// A directory record is reached more than once.
    #[error("directory at offset {0} visited twice")]
    DirectoryCycle(u64),
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::Io,
            Self::Common(e) => e.kind(),
            Self::BadMagic(_)
            | Self::UnsupportedVersion(_)
            | Self::UnsupportedCodepage(_)
            | Self::DirectoryCycle(_) => ErrorKind::Format,
            Self::BadName(_) => ErrorKind::UnsafePath,
        }
    }
}

/// Result type for wolf operations.
pub type Result<T> = std::result::Result<T, Error>;
