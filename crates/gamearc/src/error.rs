//! Error type spanning every codec.

use gamearc_common::ErrorKind;
use thiserror::Error;

/// Errors from opening or reading any supported container.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("asar: {0}")]
    Asar(#[from] gamearc_asar::Error),

    #[error("blorb: {0}")]
    Blorb(#[from] gamearc_blorb::Error),

    #[error("rgssad: {0}")]
    Rgssad(#[from] gamearc_rgssad::Error),

    #[error("rpa: {0}")]
    Rpa(#[from] gamearc_rpa::Error),

    #[error("wolf: {0}")]
    Wolf(#[from] gamearc_wolf::Error),

    /// No supported container signature was found.
    #[error("unrecognized container format")]
    UnknownFormat,

    /// An entry index is out of range for the archive.
    #[error("no entry at index {0}")]
    NoSuchEntry(usize),
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::Io,
            Self::Asar(e) => e.kind(),
            Self::Blorb(e) => e.kind(),
            Self::Rgssad(e) => e.kind(),
            Self::Rpa(e) => e.kind(),
            Self::Wolf(e) => e.kind(),
            Self::UnknownFormat => ErrorKind::Format,
            Self::NoSuchEntry(_) => ErrorKind::SizeMismatch,
        }
    }
}

/// Result type for facade operations.
pub type Result<T> = std::result::Result<T, Error>;
