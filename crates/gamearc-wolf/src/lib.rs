//! Reader for WOLF RPG Editor `.wolf` archives (DXArchive version 6).
//!
//! # Layout
//!
//! - 48-byte header, XORed with a 12-byte key that is itself assembled from
//!   three spans of the encrypted header
//! - Data section holding every file, each XORed with the same key at a phase
//!   anchored to the file's size
//! - Trailer, XORed with the key, holding a name table, a file table of
//!   64-byte records and a directory table of 32-byte records
//!
//! Names are Shift-JIS. Files stored compressed are skipped.
//!
//! # Example
//!
//! ```no_run
//! use gamearc_wolf::WolfArchive;
//!
//! let archive = WolfArchive::open_file("Data.wolf")?;
//! for entry in archive.iter() {
//!     println!("{} ({} bytes)", entry.path(), entry.size());
//! }
//! # Ok::<(), gamearc_wolf::Error>(())
//! ```

mod archive;
mod crypto;
mod error;
mod header;
mod tree;

pub use archive::{WolfArchive, WolfEntry};
pub use crypto::{ArchiveKey, SizeAnchoredXor};
pub use error::{Error, Result};
pub use header::{Header, CODEPAGE_SHIFT_JIS, VERSION};
pub use tree::FileTimes;
