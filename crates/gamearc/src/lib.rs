//! gamearc - game asset container decoding library.
//!
//! This crate provides a unified interface to the per-format codec crates.
//! Every codec opens a random-access source of known size, parses its index
//! once, and exposes validated relative paths plus bounded, seekable (and
//! where needed, decrypting) entry readers.
//!
//! # Crates
//!
//! - [`gamearc_common`] - `ReadAt`, `SectionReader`, path validation
//! - [`gamearc_asar`] - asar archives (JSON index)
//! - [`gamearc_blorb`] - Blorb resource files (IFF resource index)
//! - [`gamearc_rgssad`] - RPG Maker VX Ace archives (rolling-key cipher)
//! - [`gamearc_rpa`] - Ren'Py archives (pickled trailer)
//! - [`gamearc_wolf`] - WOLF RPG Editor archives (encrypted directory tree)
//!
//! # Example
//!
//! ```no_run
//! use gamearc::prelude::*;
//!
//! let archive = Archive::open_file("Game.rgss3a", None)?;
//! println!("{} archive, {} entries", archive.format(), archive.entry_count());
//! for entry in archive.entries() {
//!     println!("{} ({} bytes)", entry.path, entry.size);
//! }
//! # Ok::<(), gamearc::Error>(())
//! ```

mod archive;
mod error;
mod format;

// Re-export all sub-crates
pub use gamearc_asar as asar;
pub use gamearc_blorb as blorb;
pub use gamearc_common as common;
pub use gamearc_rgssad as rgssad;
pub use gamearc_rpa as rpa;
pub use gamearc_wolf as wolf;

pub use archive::{Archive, EntryInfo};
pub use error::{Error, Result};
pub use format::{Format, SNIFF_LEN};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{Archive, EntryInfo, Format};
    pub use gamearc_asar::{AsarArchive, AsarEntry};
    pub use gamearc_blorb::{BlorbArchive, BlorbEntry, ChunkFormat, ResourceKind};
    pub use gamearc_common::{path, EntryCipher, ErrorKind, ReadAt, SectionReader};
    pub use gamearc_rgssad::{RgssadArchive, RgssadEntry, RollingKey};
    pub use gamearc_rpa::{RpaArchive, RpaEntry};
    pub use gamearc_wolf::{SizeAnchoredXor, WolfArchive, WolfEntry};
}

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
