//! Reader for Blorb resource files.
//!
//! A Blorb file is an IFF `FORM` of type `IFRS` whose first chunk is a
//! resource index (`RIdx`). Each index record names a resource usage
//! (picture, sound, data, executable), a resource number, and the offset of
//! the chunk holding the resource. The chunk's own 8-byte header gives the
//! payload format and length.
//!
//! # Example
//!
//! ```no_run
//! use gamearc_blorb::{BlorbArchive, ResourceKind};
//!
//! let archive = BlorbArchive::open_file("story.gblorb")?;
//! for pic in archive.resources(ResourceKind::Picture) {
//!     println!("{} ({} bytes)", pic.file_name(), pic.size());
//! }
//! # Ok::<(), gamearc_blorb::Error>(())
//! ```

mod archive;
mod error;
mod resource;

pub use archive::{BlorbArchive, BlorbEntry};
pub use error::{Error, Result};
pub use resource::{ChunkFormat, ResourceKind};
