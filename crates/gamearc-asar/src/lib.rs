//! Reader for asar archives.
//!
//! An asar archive is a 16-byte prologue, a JSON document describing a
//! directory tree, and a data section holding every file back to back:
//!
//! - `u32` size pickle length (always 4) and `u32` index section length
//! - `u32` index payload length (unused) and `u32` JSON length
//! - JSON tree: directories carry a `files` map, leaves carry a decimal
//!   string `offset`, an integer `size` and an `executable` flag
//!
//! Leaf offsets are relative to the data section, which starts right after
//! the index section. Entries are stored in the clear.
//!
//! # Example
//!
//! ```no_run
//! use gamearc_asar::AsarArchive;
//!
//! let archive = AsarArchive::open_file("app.asar")?;
//! for entry in archive.iter() {
//!     println!("{}: {} bytes", entry.path(), entry.size());
//! }
//! # Ok::<(), gamearc_asar::Error>(())
//! ```

mod archive;
mod error;

pub use archive::{AsarArchive, AsarEntry};
pub use error::{Error, Result};
