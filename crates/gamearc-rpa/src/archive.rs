//! RPA-3.0 archive reader.

use std::io::Read;
use std::path::Path;

use flate2::read::ZlibDecoder;
use gamearc_common::{check_range, map_file, path, Plain, ReadAt, SectionReader};
use memmap2::Mmap;
use serde_pickle::DeOptions;
use tracing::{debug, trace};

use crate::trailer::{self, TrailerRecord};
use crate::{Error, Result};

const MAGIC: &[u8; 8] = b"RPA-3.0 ";

/// `RPA-3.0 ` + 16 hex digits + space + 8 hex digits + newline.
const HEADER_SIZE: usize = 34;

/// A file inside an rpa archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpaEntry {
    path: String,
    offset: u64,
    size: u64,
}

impl RpaEntry {
    /// Validated relative path, with the archive's own directory stripped.
    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Absolute offset of the file data.
    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Size of the file in bytes.
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }
}

/// An opened rpa archive.
pub struct RpaArchive<R> {
    source: R,
    size: u64,
    trailer_offset: u64,
    key: u64,
    entries: Vec<RpaEntry>,
}

impl RpaArchive<Mmap> {
    /// Memory-map and open an archive on disk.
    pub fn open_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mmap = map_file(path)?;
        let size = mmap.len() as u64;
        Self::open(mmap, size)
    }
}

impl<R: ReadAt> RpaArchive<R> {
    /// Parse the header and trailer of an archive of `size` bytes.
    pub fn open(source: R, size: u64) -> Result<Self> {
        check_range(0, HEADER_SIZE as u64, size)?;
        let mut header = [0u8; HEADER_SIZE];
        source.read_exact_at(0, &mut header)?;

        if &header[0..8] != MAGIC {
            return Err(gamearc_common::Error::InvalidMagic {
                expected: MAGIC.to_vec(),
                actual: header[0..8].to_vec(),
            }
            .into());
        }
        let trailer_offset = parse_hex("trailer offset", &header[8..24])?;
        if trailer_offset >= size {
            return Err(Error::TrailerOffsetOutOfRange {
                offset: trailer_offset,
                size,
            });
        }
        let key = parse_hex("key", &header[25..33])?;
        if header[33] != b'\n' {
            return Err(Error::IncompleteHeader);
        }
        debug!(trailer_offset, key, "rpa header");

        let compressed = SectionReader::new(&source, trailer_offset, size - trailer_offset, Plain);
        let mut pickled = Vec::new();
        ZlibDecoder::new(compressed)
            .read_to_end(&mut pickled)
            .map_err(Error::Decompress)?;
        debug!(compressed = size - trailer_offset, decompressed = pickled.len(), "rpa trailer");

        let root = serde_pickle::value_from_slice(&pickled, DeOptions::new().decode_strings())?;
        let mut entries = trailer::narrow(root, key)?
            .into_iter()
            .map(|record| to_entry(record, size))
            .collect::<Result<Vec<_>>>()?;
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        debug!(entries = entries.len(), "rpa index loaded");

        Ok(Self {
            source,
            size,
            trailer_offset,
            key,
            entries,
        })
    }

    /// Total size of the underlying source.
    #[inline]
    pub fn source_size(&self) -> u64 {
        self.size
    }

    /// Offset of the compressed trailer.
    #[inline]
    pub fn trailer_offset(&self) -> u64 {
        self.trailer_offset
    }

    /// Key that entry offsets and sizes are XORed with.
    #[inline]
    pub fn key(&self) -> u64 {
        self.key
    }

    /// Get the number of entries.
    #[inline]
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// All entries, ordered by path.
    #[inline]
    pub fn entries(&self) -> &[RpaEntry] {
        &self.entries
    }

    /// Iterate over entries.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &RpaEntry> + '_ {
        self.entries.iter()
    }

    /// Find an entry by its exact path.
    pub fn find(&self, path: &str) -> Option<&RpaEntry> {
        self.entries
            .binary_search_by(|e| e.path.as_str().cmp(path))
            .ok()
            .map(|i| &self.entries[i])
    }

    /// Open a bounded, seekable reader over an entry's contents.
    pub fn reader<'a>(&'a self, entry: &RpaEntry) -> SectionReader<'a, R> {
        SectionReader::new(&self.source, entry.offset, entry.size, Plain)
    }

    /// Read an entry's contents into memory.
    pub fn read(&self, entry: &RpaEntry) -> Result<Vec<u8>> {
        Ok(self.reader(entry).read_all()?)
    }
}

impl<R> std::fmt::Debug for RpaArchive<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpaArchive")
            .field("size", &self.size)
            .field("trailer_offset", &self.trailer_offset)
            .field("entries", &self.entries.len())
            .finish()
    }
}

fn parse_hex(field: &'static str, digits: &[u8]) -> Result<u64> {
    std::str::from_utf8(digits)
        .ok()
        .and_then(|s| u64::from_str_radix(s, 16).ok())
        .ok_or_else(|| Error::InvalidHexField {
            field,
            value: String::from_utf8_lossy(digits).into_owned(),
        })
}

/// Strip the leading directory from a record path and validate the rest.
fn to_entry(record: TrailerRecord, source_size: u64) -> Result<RpaEntry> {
    let cleaned = path::clean_path(&record.path);
    let stripped = cleaned.split_once('/').map_or("", |(_, rest)| rest);
    let path = path::sanitize(stripped)?;

    if record.offset >= source_size {
        return Err(Error::OffsetOutOfRange {
            path,
            offset: record.offset,
            size: source_size,
        });
    }
    check_range(record.offset, record.size, source_size)?;

    trace!(%path, offset = record.offset, size = record.size, "rpa entry");
    Ok(RpaEntry {
        path,
        offset: record.offset,
        size: record.size,
    })
}
