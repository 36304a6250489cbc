//! Reader for RPG Maker VX Ace encrypted archives (`.rgss3a`).
//!
//! The archive starts with a 12-byte header seeding a 32-bit key, followed
//! by a chain of obfuscated index records terminated by a record whose file
//! offset decodes to zero. Every file's content is XORed with its own rolling
//! key, which advances `k -> 7k + 3` every four bytes.
//!
//! Entry readers decrypt at any offset without touching earlier bytes; see
//! [`RollingKey`].
//!
//! # Example
//!
//! ```no_run
//! use gamearc_rgssad::RgssadArchive;
//!
//! let archive = RgssadArchive::open_file("Game.rgss3a")?;
//! for entry in archive.iter() {
//!     let data = archive.read(entry)?;
//!     println!("{}: {} bytes", entry.path(), data.len());
//! }
//! # Ok::<(), gamearc_rgssad::Error>(())
//! ```

mod archive;
mod crypto;
mod error;

pub use archive::{RgssadArchive, RgssadEntry};
pub use crypto::{advance, step, RollingKey};
pub use error::{Error, Result};
