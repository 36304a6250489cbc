//! Wolf archive reader.

use std::path::Path;

use gamearc_common::{check_range, map_file, path, ReadAt, SectionReader};
use memmap2::Mmap;
use tracing::debug;

use crate::crypto::{ArchiveKey, SizeAnchoredXor};
use crate::header::{Header, HEADER_SIZE};
use crate::tree::{self, FileTimes};
use crate::Result;

/// A stored file inside a wolf archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WolfEntry {
    path: String,
    offset: u64,
    size: u64,
    times: FileTimes,
}

impl WolfEntry {
    /// Validated relative path, `/`-separated.
    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Absolute offset of the encrypted content.
    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Size of the content in bytes.
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Timestamps from the file record, as raw `FILETIME` values.
    #[inline]
    pub fn times(&self) -> FileTimes {
        self.times
    }
}

/// An opened wolf archive.
pub struct WolfArchive<R> {
    source: R,
    size: u64,
    key: ArchiveKey,
    header: Header,
    entries: Vec<WolfEntry>,
    skipped: usize,
}

impl WolfArchive<Mmap> {
    /// Memory-map and open an archive on disk.
    pub fn open_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mmap = map_file(path)?;
        let size = mmap.len() as u64;
        Self::open(mmap, size)
    }
}

impl<R: ReadAt> WolfArchive<R> {
    /// Decrypt the header and trailer of an archive of `size` bytes and walk its tree.
    pub fn open(source: R, size: u64) -> Result<Self> {
        check_range(0, HEADER_SIZE as u64, size)?;
        let mut raw = [0u8; HEADER_SIZE];
        source.read_exact_at(0, &mut raw)?;
        let (header, key) = Header::decrypt(raw)?;

        let trailer_offset = header.trailer_offset;
        let trailer_size = u64::from(header.trailer_size);
        let data_offset = header.data_offset;
        let (file_table, dir_table) = (header.file_table, header.dir_table);
        debug!(trailer_offset, trailer_size, data_offset, file_table, dir_table, "wolf header");

        check_range(trailer_offset, trailer_size, size)?;
        let mut trailer = vec![0u8; trailer_size as usize];
        source.read_exact_at(trailer_offset, &mut trailer)?;
        key.xor(&mut trailer);

        let walk = tree::walk(&trailer, file_table, dir_table)?;
        let entries = walk
            .files
            .into_iter()
            .map(|file| -> Result<WolfEntry> {
                let path = path::sanitize(&file.path)?;
                let offset = data_offset.saturating_add(file.data_offset);
                check_range(offset, file.size, size)?;
                Ok(WolfEntry {
                    path,
                    offset,
                    size: file.size,
                    times: file.times,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        debug!(entries = entries.len(), skipped = walk.skipped, "wolf index loaded");

        Ok(Self {
            source,
            size,
            key,
            header,
            entries,
            skipped: walk.skipped,
        })
    }

    /// Total size of the underlying source.
    #[inline]
    pub fn source_size(&self) -> u64 {
        self.size
    }

    /// The archive key.
    #[inline]
    pub fn key(&self) -> &ArchiveKey {
        &self.key
    }

    /// The decrypted header.
    #[inline]
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Number of compressed records left out of [`entries`](Self::entries).
    #[inline]
    pub fn skipped_compressed(&self) -> usize {
        self.skipped
    }

    /// Get the number of entries.
    #[inline]
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// All stored entries, depth first in file-table order.
    #[inline]
    pub fn entries(&self) -> &[WolfEntry] {
        &self.entries
    }

    /// Iterate over entries.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &WolfEntry> + '_ {
        self.entries.iter()
    }

    /// Find an entry by its exact path.
    pub fn find(&self, path: &str) -> Option<&WolfEntry> {
        self.entries.iter().find(|e| e.path == path)
    }

    /// Open a decrypting, seekable reader over an entry's contents.
    pub fn reader<'a>(&'a self, entry: &WolfEntry) -> SectionReader<'a, R, SizeAnchoredXor> {
        let cipher = SizeAnchoredXor::new(self.key, entry.size);
        SectionReader::new(&self.source, entry.offset, entry.size, cipher)
    }

    /// Read and decrypt an entry's contents into memory.
    pub fn read(&self, entry: &WolfEntry) -> Result<Vec<u8>> {
        Ok(self.reader(entry).read_all()?)
    }
}

impl<R> std::fmt::Debug for WolfArchive<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WolfArchive")
            .field("size", &self.size)
            .field("entries", &self.entries.len())
            .field("skipped", &self.skipped)
            .finish()
    }
}
