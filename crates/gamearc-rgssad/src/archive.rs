//! rgss3a archive reader.

use std::path::Path;

use gamearc_common::{check_range, map_file, path, BinaryReader, ReadAt, SectionReader};
use memmap2::Mmap;
use tracing::{debug, trace};

use crate::{Error, Result, RollingKey};

/// Archive magic, followed by the version byte.
const MAGIC: &[u8; 7] = b"RGSSAD\0";

/// The only supported archive version.
const VERSION: u8 = 3;

/// Size of the fixed header: magic, version, seed.
const HEADER_SIZE: u64 = 12;

/// Size of one index record.
const RECORD_SIZE: u64 = 16;

/// A file inside an rgssad archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgssadEntry {
    path: String,
    offset: u64,
    size: u64,
    key: u32,
}

impl RgssadEntry {
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

    /// Initial content key.
    #[inline]
    pub fn key(&self) -> u32 {
        self.key
    }

    /// The content cipher for this entry.
    #[inline]
    pub fn cipher(&self) -> RollingKey {
        RollingKey::new(self.key)
    }
}

/// An opened rgssad archive.
pub struct RgssadArchive<R> {
    source: R,
    size: u64,
    entries: Vec<RgssadEntry>,
}

impl RgssadArchive<Mmap> {
    /// Memory-map and open an archive on disk.
    pub fn open_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mmap = map_file(path)?;
        let size = mmap.len() as u64;
        Self::open(mmap, size)
    }
}

impl<R: ReadAt> RgssadArchive<R> {
    /// Parse the index of an archive of `size` bytes.
    pub fn open(source: R, size: u64) -> Result<Self> {
        check_range(0, HEADER_SIZE, size)?;
        let mut header = [0u8; HEADER_SIZE as usize];
        source.read_exact_at(0, &mut header)?;

        let mut reader = BinaryReader::new(&header);
        reader.expect_magic(MAGIC)?;
        let version = reader.read_u8()?;
        if version != VERSION {
            return Err(Error::UnsupportedVersion(version));
        }
        let seed = reader.read_u32()?;
        let key = seed.wrapping_mul(9).wrapping_add(3);
        debug!(seed, key, "rgssad header");

        let entries = read_index(&source, size, key)?;
        debug!(entries = entries.len(), "rgssad index loaded");

        Ok(Self {
            source,
            size,
            entries,
        })
    }

    /// Total size of the underlying source.
    #[inline]
    pub fn source_size(&self) -> u64 {
        self.size
    }

    /// Get the number of entries.
    #[inline]
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// All entries, in index order.
    #[inline]
    pub fn entries(&self) -> &[RgssadEntry] {
        &self.entries
    }

    /// Iterate over entries.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &RgssadEntry> + '_ {
        self.entries.iter()
    }

    /// Find an entry by its exact path.
    pub fn find(&self, path: &str) -> Option<&RgssadEntry> {
        self.entries.iter().find(|e| e.path == path)
    }

    /// Open a decrypting, seekable reader over an entry's contents.
    pub fn reader<'a>(&'a self, entry: &RgssadEntry) -> SectionReader<'a, R, RollingKey> {
        SectionReader::new(&self.source, entry.offset, entry.size, entry.cipher())
    }

    /// Read and decrypt an entry's contents into memory.
    pub fn read(&self, entry: &RgssadEntry) -> Result<Vec<u8>> {
        Ok(self.reader(entry).read_all()?)
    }
}

impl<R> std::fmt::Debug for RgssadArchive<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RgssadArchive")
            .field("size", &self.size)
            .field("entries", &self.entries.len())
            .finish()
    }
}

/// Walk the record chain until the zero-offset terminator.
///
/// Every record field and every path byte is masked with the same `key`.
fn read_index<R: ReadAt>(source: &R, size: u64, key: u32) -> Result<Vec<RgssadEntry>> {
    let mask = key.to_le_bytes();
    let mut entries = Vec::new();
    let mut offset = HEADER_SIZE;

    loop {
        check_range(offset, RECORD_SIZE, size)?;
        let mut record = [0u8; RECORD_SIZE as usize];
        source.read_exact_at(offset, &mut record)?;
        offset += RECORD_SIZE;

        let mut reader = BinaryReader::new(&record);
        let file_offset = u64::from(reader.read_u32()? ^ key);
        let file_size = u64::from(reader.read_u32()? ^ key);
        let file_key = reader.read_u32()? ^ key;
        let path_len = u64::from(reader.read_u32()? ^ key);

        if file_offset == 0 {
            return Ok(entries);
        }

        check_range(offset, path_len, size)?;
        let mut raw = vec![0u8; path_len as usize];
        source.read_exact_at(offset, &mut raw)?;
        offset += path_len;

        for (i, byte) in raw.iter_mut().enumerate() {
            *byte ^= mask[i % 4];
            if *byte == b'\\' {
                *byte = b'/';
            }
        }
        let raw = String::from_utf8(raw)
            .map_err(|e| Error::PathEncoding(String::from_utf8_lossy(e.as_bytes()).into_owned()))?;
        let path = path::sanitize(&raw)?;
        check_range(file_offset, file_size, size)?;

        trace!(%path, offset = file_offset, size = file_size, key = file_key, "rgssad entry");
        entries.push(RgssadEntry {
            path,
            offset: file_offset,
            size: file_size,
            key: file_key,
        });
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Seek, SeekFrom};

    use gamearc_common::{EntryCipher, ErrorKind};

    use super::*;

    const SEED: u32 = 0x0BAD_5EED;

    /// Build an archive holding `(path, key, plaintext)` files.
    fn build(files: &[(&str, u32, &[u8])]) -> Vec<u8> {
        let key = SEED.wrapping_mul(9).wrapping_add(3);
        let mask = key.to_le_bytes();

        let index_size: usize = files.iter().map(|(p, _, _)| 16 + p.len()).sum::<usize>() + 16;
        let mut data_offset = (HEADER_SIZE as usize + index_size) as u32;

        let mut out = Vec::new();
        out.extend_from_slice(MAGIC);
        out.push(VERSION);
        out.extend_from_slice(&SEED.to_le_bytes());

        for (path, file_key, content) in files {
            for field in [data_offset, content.len() as u32, *file_key, path.len() as u32] {
                out.extend_from_slice(&(field ^ key).to_le_bytes());
            }
            out.extend(path.bytes().enumerate().map(|(i, b)| b ^ mask[i % 4]));
            data_offset += content.len() as u32;
        }
        for _ in 0..4 {
            out.extend_from_slice(&key.to_le_bytes());
        }

        for (_, file_key, content) in files {
            let mut encrypted = content.to_vec();
            RollingKey::new(*file_key).apply(0, &mut encrypted);
            out.extend_from_slice(&encrypted);
        }
        out
    }

    #[test]
    fn test_index_and_content() {
        let data = build(&[
            ("Data\\Actors.rvdata2", 0x1111_2222, b"actors go here"),
            ("Graphics/System/Window.png", 7, b"\x89PNG window skin"),
        ]);
        let archive = RgssadArchive::open(data.clone(), data.len() as u64).unwrap();

        let paths: Vec<_> = archive.iter().map(|e| e.path()).collect();
        assert_eq!(paths, ["Data/Actors.rvdata2", "Graphics/System/Window.png"]);

        let actors = archive.find("Data/Actors.rvdata2").unwrap();
        assert_eq!(actors.key(), 0x1111_2222);
        assert_eq!(archive.read(actors).unwrap(), b"actors go here");

        let window = &archive.entries()[1];
        assert_eq!(archive.read(window).unwrap(), b"\x89PNG window skin");
    }

    #[test]
    fn test_seek_into_middle_of_block() {
        let content: Vec<u8> = (0..64u8).collect();
        let data = build(&[("Audio/BGM/Theme.ogg", 0xA5A5_0001, &content)]);
        let archive = RgssadArchive::open(data.clone(), data.len() as u64).unwrap();
        let entry = &archive.entries()[0];

        let mut reader = archive.reader(entry);
        reader.seek(SeekFrom::Start(13)).unwrap();
        let mut buf = [0u8; 10];
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, &content[13..23]);

        let mut first = vec![0u8; 30];
        let mut second = vec![0u8; 34];
        let mut reader = archive.reader(entry);
        reader.read_exact(&mut first).unwrap();
        reader.read_exact(&mut second).unwrap();
        first.extend_from_slice(&second);
        assert_eq!(first, content);
    }

    #[test]
    fn test_empty_index() {
        let data = build(&[]);
        let archive = RgssadArchive::open(data.clone(), data.len() as u64).unwrap();
        assert_eq!(archive.entry_count(), 0);
    }

    #[test]
    fn test_bad_magic() {
        let mut data = build(&[]);
        data[0] = b'X';
        let err = RgssadArchive::open(data.clone(), data.len() as u64).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn test_unsupported_version() {
        let mut data = build(&[]);
        data[7] = 1;
        let err = RgssadArchive::open(data.clone(), data.len() as u64).unwrap_err();
        assert!(matches!(err, Error::UnsupportedVersion(1)));
    }

    #[test]
    fn test_rejects_escaping_path() {
        let data = build(&[("..\\..\\Windows\\evil.dll", 1, b"x")]);
        let err = RgssadArchive::open(data.clone(), data.len() as u64).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsafePath);
    }

    #[test]
    fn test_rejects_absolute_path() {
        let data = build(&[("/etc/passwd", 1, b"x")]);
        let err = RgssadArchive::open(data.clone(), data.len() as u64).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsafePath);
    }

    #[test]
    fn test_rejects_non_utf8_path() {
        let mut data = build(&[("ab.txt", 1, b"x")]);
        // Turn the first path byte into 0xFF once unmasked.
        data[HEADER_SIZE as usize + 16] ^= b'a' ^ 0xFF;
        let err = RgssadArchive::open(data.clone(), data.len() as u64).unwrap_err();
        assert!(matches!(err, Error::PathEncoding(ref p) if p.ends_with("b.txt")));
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn test_missing_terminator() {
        let mut data = build(&[("a.txt", 1, b"")]);
        let header_and_record = HEADER_SIZE as usize + 16 + "a.txt".len();
        data.truncate(header_and_record + 8);
        let err = RgssadArchive::open(data.clone(), data.len() as u64).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SizeMismatch);
    }
}
