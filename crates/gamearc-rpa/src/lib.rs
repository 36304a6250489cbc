//! Reader for Ren'Py `RPA-3.0` archives.
//!
//! The 34-byte ASCII header carries the offset of a trailer and an XOR key:
//!
//! ```text
//! RPA-3.0 {trailer_offset:016x} {key:08x}\n
//! ```
//!
//! The trailer runs from that offset to the end of the file. It is a zlib
//! stream holding a pickled `dict` mapping each path to
//! `[(offset ^ key, size ^ key, prefix)]`. Entry contents are stored in the
//! clear.

mod archive;
mod error;
mod trailer;

pub use archive::{RpaArchive, RpaEntry};
pub use error::{Error, Result};
