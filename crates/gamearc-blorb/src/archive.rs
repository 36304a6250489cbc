//! Blorb resource index reader.

use std::path::Path;

use byteorder::{BigEndian, ByteOrder};
use gamearc_common::{check_range, map_file, path, Plain, ReadAt, SectionReader};
use memmap2::Mmap;
use tracing::{debug, trace};
use zerocopy::byteorder::{BigEndian as Be, U32};
use zerocopy::{FromBytes, Immutable, KnownLayout, Unaligned};

use crate::{ChunkFormat, Error, ResourceKind, Result};

/// Size of the `FORM`/`IFRS`/`RIdx` prologue, including the index length and count.
const PROLOGUE_SIZE: usize = 24;

/// Size of one resource index record.
const RECORD_SIZE: u64 = 12;

/// Size of the chunk header preceding every resource payload.
const CHUNK_HEADER_SIZE: u64 = 8;

/// One record of the `RIdx` chunk.
#[derive(Debug, Clone, Copy, FromBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
struct IndexRecord {
    usage: [u8; 4],
    number: U32<Be>,
    start: U32<Be>,
}

/// A resource inside a Blorb file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlorbEntry {
    kind: ResourceKind,
    id: u32,
    format: ChunkFormat,
    path: String,
    offset: u64,
    size: u64,
}

impl BlorbEntry {
    /// Resource usage from the index.
    #[inline]
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Resource number from the index.
    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Payload format sniffed from the chunk header.
    #[inline]
    pub fn format(&self) -> ChunkFormat {
        self.format
    }

    /// `{id:04}.{ext}`, the name the resource is extracted under.
    pub fn file_name(&self) -> String {
        format!("{:04}.{}", self.id, self.format.extension())
    }

    /// Relative extraction path.
    ///
    /// Pictures sit at the root; other kinds live under a directory named after the kind.
    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Absolute offset of the payload (past the chunk header).
    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Payload size in bytes.
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }
}

/// An opened Blorb file.
pub struct BlorbArchive<R> {
    source: R,
    size: u64,
    form_length: u32,
    entries: Vec<BlorbEntry>,
    buckets: [Vec<usize>; 5],
}

impl BlorbArchive<Mmap> {
    /// Memory-map and open a Blorb file on disk.
    pub fn open_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mmap = map_file(path)?;
        let size = mmap.len() as u64;
        Self::open(mmap, size)
    }
}

impl<R: ReadAt> BlorbArchive<R> {
    /// Parse the resource index of a file of `size` bytes.
    pub fn open(source: R, size: u64) -> Result<Self> {
        let mut prologue = [0u8; PROLOGUE_SIZE];
        source.read_exact_at(0, &mut prologue)?;

        expect_tag("group chunk", b"FORM", &prologue[0..4])?;
        let form_length = BigEndian::read_u32(&prologue[4..8]);
        expect_tag("form type", b"IFRS", &prologue[8..12])?;
        expect_tag("first chunk type", b"RIdx", &prologue[12..16])?;

        let index_size = BigEndian::read_u32(&prologue[16..20]);
        let count = BigEndian::read_u32(&prologue[20..24]);
        let expected = 4 + u64::from(count) * RECORD_SIZE;
        if expected != u64::from(index_size) {
            return Err(Error::SizeMismatch {
                expected,
                actual: index_size,
                count,
            });
        }
        debug!(form_length, count, "blorb resource index");

        let records_size = expected - 4;
        check_range(PROLOGUE_SIZE as u64, records_size, size)?;
        let mut index = vec![0u8; records_size as usize];
        source.read_exact_at(PROLOGUE_SIZE as u64, &mut index)?;

        let mut entries = Vec::with_capacity(count as usize);
        let mut buckets: [Vec<usize>; 5] = Default::default();

        for chunk in index.chunks_exact(RECORD_SIZE as usize) {
            let record = IndexRecord::read_from_bytes(chunk).map_err(|_| {
                gamearc_common::Error::UnexpectedEof {
                    needed: RECORD_SIZE as usize,
                    available: chunk.len(),
                }
            })?;
            let kind = ResourceKind::from_tag(&record.usage).ok_or_else(|| {
                Error::UnknownResourceType(String::from_utf8_lossy(&record.usage).into_owned())
            })?;

            let start = u64::from(record.start.get());
            check_range(start, CHUNK_HEADER_SIZE, size)?;
            let mut header = [0u8; CHUNK_HEADER_SIZE as usize];
            source.read_exact_at(start, &mut header)?;

            let format = ChunkFormat::from_magic([header[0], header[1], header[2], header[3]]);
            let payload_size = u64::from(BigEndian::read_u32(&header[4..8]));
            let offset = start + CHUNK_HEADER_SIZE;
            check_range(offset, payload_size, size)?;

            let id = record.number.get();
            let file_name = format!("{:04}.{}", id, format.extension());
            let entry_path = match kind {
                ResourceKind::Picture => file_name,
                other => path::join(other.name(), &file_name),
            };
            let entry_path = path::sanitize(&entry_path)?;

            trace!(%kind, id, %format, offset, size = payload_size, "blorb resource");
            buckets[kind.index()].push(entries.len());
            entries.push(BlorbEntry {
                kind,
                id,
                format,
                path: entry_path,
                offset,
                size: payload_size,
            });
        }

        Ok(Self {
            source,
            size,
            form_length,
            entries,
            buckets,
        })
    }

    /// Total size of the underlying source.
    #[inline]
    pub fn source_size(&self) -> u64 {
        self.size
    }

    /// Length field of the outer `FORM` chunk, read but not validated.
    #[inline]
    pub fn form_length(&self) -> u32 {
        self.form_length
    }

    /// Get the number of resources.
    #[inline]
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// All resources, in index order.
    #[inline]
    pub fn entries(&self) -> &[BlorbEntry] {
        &self.entries
    }

    /// Iterate over all resources in index order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &BlorbEntry> + '_ {
        self.entries.iter()
    }

    /// Iterate over the resources of one kind, in index order.
    pub fn resources(&self, kind: ResourceKind) -> impl Iterator<Item = &BlorbEntry> + '_ {
        self.buckets[kind.index()].iter().map(|&i| &self.entries[i])
    }

    /// Find a resource by kind and number.
    pub fn find(&self, kind: ResourceKind, id: u32) -> Option<&BlorbEntry> {
        self.resources(kind).find(|e| e.id == id)
    }

    /// Open a bounded, seekable reader over a resource payload.
    pub fn reader<'a>(&'a self, entry: &BlorbEntry) -> SectionReader<'a, R> {
        SectionReader::new(&self.source, entry.offset, entry.size, Plain)
    }

    /// Read a resource payload into memory.
    pub fn read(&self, entry: &BlorbEntry) -> Result<Vec<u8>> {
        Ok(self.reader(entry).read_all()?)
    }
}

impl<R> std::fmt::Debug for BlorbArchive<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlorbArchive")
            .field("size", &self.size)
            .field("entries", &self.entries.len())
            .finish()
    }
}

fn expect_tag(field: &'static str, expected: &[u8; 4], actual: &[u8]) -> Result<()> {
    if actual != expected {
        return Err(Error::BadMagic {
            field,
            expected: String::from_utf8_lossy(expected).into_owned(),
            actual: String::from_utf8_lossy(actual).into_owned(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use gamearc_common::ErrorKind;

    use super::*;

    /// Build a Blorb file from `(usage, number, chunk type, payload)` tuples.
    fn build(resources: &[(&[u8; 4], u32, &[u8; 4], &[u8])]) -> Vec<u8> {
        let count = resources.len() as u32;
        let index_size = 4 + count * 12;
        let mut chunks_start = PROLOGUE_SIZE as u32 + count * 12;

        let mut index = Vec::new();
        let mut chunks = Vec::new();
        for (usage, number, chunk_type, payload) in resources {
            index.extend_from_slice(*usage);
            index.extend_from_slice(&number.to_be_bytes());
            index.extend_from_slice(&chunks_start.to_be_bytes());

            chunks.extend_from_slice(*chunk_type);
            chunks.extend_from_slice(&(payload.len() as u32).to_be_bytes());
            chunks.extend_from_slice(payload);
            if payload.len() % 2 == 1 {
                chunks.push(0);
            }
            chunks_start = PROLOGUE_SIZE as u32 + count * 12 + chunks.len() as u32;
        }

        let mut out = Vec::new();
        out.extend_from_slice(b"FORM");
        out.extend_from_slice(&0u32.to_be_bytes());
        out.extend_from_slice(b"IFRSRIdx");
        out.extend_from_slice(&index_size.to_be_bytes());
        out.extend_from_slice(&count.to_be_bytes());
        out.extend_from_slice(&index);
        out.extend_from_slice(&chunks);
        let form_length = (out.len() - 8) as u32;
        out[4..8].copy_from_slice(&form_length.to_be_bytes());
        out
    }

    #[test]
    fn test_resources_bucketed_by_kind() {
        let data = build(&[
            (b"Pict", 1, b"PNG ", b"\x89PNG..."),
            (b"Snd ", 3, b"OGGV", b"ogg"),
            (b"Pict", 2, b"JPEG", b"\xff\xd8"),
            (b"Exec", 0, b"GLUL", b"Glul"),
        ]);
        let archive = BlorbArchive::open(data.clone(), data.len() as u64).unwrap();

        assert_eq!(archive.entry_count(), 4);
        assert_eq!(archive.form_length() as usize, data.len() - 8);

        let pictures: Vec<_> = archive
            .resources(ResourceKind::Picture)
            .map(|e| e.file_name())
            .collect();
        assert_eq!(pictures, ["0001.png", "0002.jpg"]);

        let sound = archive.find(ResourceKind::Sound, 3).unwrap();
        assert_eq!(sound.format(), ChunkFormat::Other(*b"OGGV"));
        assert_eq!(sound.path(), "snd/0003.OGGV");
        assert_eq!(archive.read(sound).unwrap(), b"ogg");

        let exec = archive.resources(ResourceKind::Executable).next().unwrap();
        assert_eq!(exec.format(), ChunkFormat::Glulx);
        assert_eq!(exec.path(), "exec/0000.glul");
        assert_eq!(archive.resources(ResourceKind::Data).count(), 0);
    }

    #[test]
    fn test_entry_offset_skips_chunk_header() {
        let data = build(&[(b"Pict", 7, b"PNG ", b"abcd")]);
        let archive = BlorbArchive::open(data.clone(), data.len() as u64).unwrap();
        let entry = &archive.entries()[0];

        assert_eq!(entry.offset(), PROLOGUE_SIZE as u64 + 12 + 8);
        assert_eq!(entry.size(), 4);
        assert_eq!(entry.path(), "0007.png");
    }

    #[test]
    fn test_bad_magic() {
        let mut data = build(&[]);
        data[8..12].copy_from_slice(b"AIFF");
        let err = BlorbArchive::open(data.clone(), data.len() as u64).unwrap_err();
        assert!(matches!(err, Error::BadMagic { field: "form type", .. }));
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn test_index_size_mismatch() {
        let mut data = build(&[(b"Pict", 1, b"PNG ", b"x")]);
        data[16..20].copy_from_slice(&20u32.to_be_bytes());
        let err = BlorbArchive::open(data.clone(), data.len() as u64).unwrap_err();
        assert!(matches!(
            err,
            Error::SizeMismatch { expected: 16, actual: 20, count: 1 }
        ));
        assert_eq!(err.kind(), ErrorKind::SizeMismatch);
    }

    #[test]
    fn test_unknown_resource_type_fails_whole_open() {
        let data = build(&[
            (b"Pict", 1, b"PNG ", b"x"),
            (b"Font", 2, b"TTF ", b"y"),
        ]);
        let err = BlorbArchive::open(data.clone(), data.len() as u64).unwrap_err();
        assert!(matches!(err, Error::UnknownResourceType(ref t) if t == "Font"));
    }

    #[test]
    fn test_chunk_past_end_of_source() {
        let mut data = build(&[(b"Pict", 1, b"PNG ", b"x")]);
        let len = data.len();
        data.truncate(len - 2);
        let err = BlorbArchive::open(data.clone(), data.len() as u64).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SizeMismatch);
    }
}
