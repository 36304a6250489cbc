//! Common utilities for gamearc.
//!
//! This crate provides the foundation shared by every container codec:
//!
//! - [`ReadAt`] - Positioned reads against a random-access byte source
//! - [`SectionReader`] - Bounded, seekable view of one entry, optionally decrypting
//! - [`EntryCipher`] - Position-aware content transform applied by a [`SectionReader`]
//! - [`BinaryReader`] - Zero-copy binary reading from byte slices
//! - [`path`] - Lexical path cleaning and directory-traversal validation

mod error;
mod reader;
mod section;
mod source;

pub mod path;

pub use error::{Error, ErrorKind, Result};
pub use reader::BinaryReader;
pub use section::{EntryCipher, Plain, SectionReader};
pub use source::{map_file, ReadAt};

/// Re-export zerocopy traits for convenience
pub use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// Check that `offset + size` lies within a source of `source_size` bytes.
pub fn check_range(offset: u64, size: u64, source_size: u64) -> Result<()> {
    match offset.checked_add(size) {
        Some(end) if end <= source_size => Ok(()),
        _ => Err(Error::EntryOutOfBounds {
            offset,
            size,
            source_size,
        }),
    }
}
