//! Format-agnostic archive handle.

use std::io::{self, Write};
use std::path::Path;

use gamearc_asar::AsarArchive;
use gamearc_blorb::BlorbArchive;
use gamearc_common::{map_file, ReadAt};
use gamearc_rgssad::RgssadArchive;
use gamearc_rpa::RpaArchive;
use gamearc_wolf::WolfArchive;
use memmap2::Mmap;
use tracing::debug;

use crate::{Error, Format, Result};

/// Summary of one entry, independent of the container format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    /// Position in the archive's entry list.
    pub index: usize,
    /// Validated relative path.
    pub path: String,
    /// Plaintext size in bytes.
    pub size: u64,
}

/// An opened container of any supported format.
pub enum Archive<R> {
    Asar(AsarArchive<R>),
    Blorb(BlorbArchive<R>),
    Rgssad(RgssadArchive<R>),
    Rpa(RpaArchive<R>),
    Wolf(WolfArchive<R>),
}

/// Run `$body` against whichever codec archive `$self` holds.
macro_rules! each {
    ($self:expr, $archive:ident => $body:expr) => {
        match $self {
            Archive::Asar($archive) => $body,
            Archive::Blorb($archive) => $body,
            Archive::Rgssad($archive) => $body,
            Archive::Rpa($archive) => $body,
            Archive::Wolf($archive) => $body,
        }
    };
}

impl Archive<Mmap> {
    /// Memory-map and open a container on disk, detecting its format when `format` is `None`.
    pub fn open_file<P: AsRef<Path>>(path: P, format: Option<Format>) -> Result<Self> {
        let mmap = map_file(path)?;
        let size = mmap.len() as u64;
        Self::open(mmap, size, format)
    }
}

impl<R: ReadAt> Archive<R> {
    /// Open a container of `size` bytes, detecting its format when `format` is `None`.
    pub fn open(source: R, size: u64, format: Option<Format>) -> Result<Self> {
        let format = match format {
            Some(format) => format,
            None => Format::detect_source(&source, size)?.ok_or(Error::UnknownFormat)?,
        };
        debug!(%format, size, "opening archive");

        Ok(match format {
            Format::Asar => Self::Asar(AsarArchive::open(source, size)?),
            Format::Blorb => Self::Blorb(BlorbArchive::open(source, size)?),
            Format::Rgssad => Self::Rgssad(RgssadArchive::open(source, size)?),
            Format::Rpa => Self::Rpa(RpaArchive::open(source, size)?),
            Format::Wolf => Self::Wolf(WolfArchive::open(source, size)?),
        })
    }

    /// The container format.
    pub fn format(&self) -> Format {
        match self {
            Self::Asar(_) => Format::Asar,
            Self::Blorb(_) => Format::Blorb,
            Self::Rgssad(_) => Format::Rgssad,
            Self::Rpa(_) => Format::Rpa,
            Self::Wolf(_) => Format::Wolf,
        }
    }

    /// Get the number of entries.
    pub fn entry_count(&self) -> usize {
        each!(self, a => a.entry_count())
    }

    /// Summaries of all entries, in the codec's order.
    pub fn entries(&self) -> Vec<EntryInfo> {
        each!(self, a => a
            .iter()
            .enumerate()
            .map(|(index, e)| EntryInfo {
                index,
                path: e.path().to_string(),
                size: e.size(),
            })
            .collect())
    }

    /// Stream the plaintext of entry `index` into `out`, returning the byte count.
    pub fn copy_to<W: Write + ?Sized>(&self, index: usize, out: &mut W) -> Result<u64> {
        let copied = each!(self, a => {
            let entry = a.entries().get(index).ok_or(Error::NoSuchEntry(index))?;
            io::copy(&mut a.reader(entry), out)?
        });
        Ok(copied)
    }

    /// Read the plaintext of entry `index` into memory.
    pub fn read(&self, index: usize) -> Result<Vec<u8>> {
        let data = each!(self, a => {
            let entry = a.entries().get(index).ok_or(Error::NoSuchEntry(index))?;
            a.read(entry)?
        });
        Ok(data)
    }
}

impl<R> std::fmt::Debug for Archive<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        each!(self, a => std::fmt::Debug::fmt(a, f))
    }
}
