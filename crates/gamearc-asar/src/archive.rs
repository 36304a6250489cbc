//! asar archive reader.

use std::collections::BTreeMap;
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};
use gamearc_common::{check_range, map_file, path, ErrorKind, Plain, ReadAt, SectionReader};
use memmap2::Mmap;
use serde::Deserialize;
use tracing::{debug, trace, warn};

use crate::{Error, Result};

/// Size of the fixed prologue preceding the JSON document.
const PROLOGUE_SIZE: usize = 16;

/// Length of the size pickle that precedes the index section.
const SIZE_PICKLE_LENGTH: u32 = 4;

/// The index section starts right after the 8-byte size pickle.
const INDEX_SECTION_START: u64 = 8;

/// A file inside an asar archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsarEntry {
    path: String,
    offset: u64,
    size: u64,
    executable: bool,
}

impl AsarEntry {
    /// Validated relative path, `/`-separated.
    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Absolute offset of the file data in the archive.
    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Size of the file in bytes.
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Whether the index marks the file as executable.
    #[inline]
    pub fn is_executable(&self) -> bool {
        self.executable
    }
}

/// An opened asar archive.
pub struct AsarArchive<R> {
    source: R,
    size: u64,
    data_origin: u64,
    entries: Vec<AsarEntry>,
}

/// One node of the JSON index tree.
#[derive(Debug, Deserialize)]
struct Node {
    files: Option<BTreeMap<String, Node>>,
    offset: Option<String>,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    executable: bool,
    #[serde(default)]
    unpacked: bool,
    link: Option<String>,
}

impl AsarArchive<Mmap> {
    /// Memory-map and open an archive on disk.
    pub fn open_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mmap = map_file(path)?;
        let size = mmap.len() as u64;
        Self::open(mmap, size)
    }
}

impl<R: ReadAt> AsarArchive<R> {
    /// Parse the index of an archive of `size` bytes.
    pub fn open(source: R, size: u64) -> Result<Self> {
        let mut prologue = [0u8; PROLOGUE_SIZE];
        source.read_exact_at(0, &mut prologue)?;

        let pickle_length = LittleEndian::read_u32(&prologue[0..4]);
        if pickle_length != SIZE_PICKLE_LENGTH {
            return Err(Error::MalformedPrologue(pickle_length));
        }
        let index_length = LittleEndian::read_u32(&prologue[4..8]);
        let _payload_length = LittleEndian::read_u32(&prologue[8..12]);
        let json_length = LittleEndian::read_u32(&prologue[12..16]);
        debug!(index_length, json_length, "asar prologue");

        check_range(PROLOGUE_SIZE as u64, u64::from(json_length), size)?;
        let mut json = vec![0u8; json_length as usize];
        source.read_exact_at(PROLOGUE_SIZE as u64, &mut json)?;
        let root: Node = serde_json::from_slice(&json)?;

        let data_origin = INDEX_SECTION_START + u64::from(index_length);
        let mut entries = Vec::new();
        walk(&root, "", data_origin, size, &mut entries)?;
        debug!(entries = entries.len(), data_origin, "asar index loaded");

        Ok(Self {
            source,
            size,
            data_origin,
            entries,
        })
    }

    /// Total size of the underlying source.
    #[inline]
    pub fn source_size(&self) -> u64 {
        self.size
    }

    /// Offset of the data section that leaf offsets are relative to.
    #[inline]
    pub fn data_origin(&self) -> u64 {
        self.data_origin
    }

    /// Get the number of entries.
    #[inline]
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// All entries, in depth-first index order.
    #[inline]
    pub fn entries(&self) -> &[AsarEntry] {
        &self.entries
    }

    /// Iterate over entries.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &AsarEntry> + '_ {
        self.entries.iter()
    }

    /// Find an entry by its exact path.
    pub fn find(&self, path: &str) -> Option<&AsarEntry> {
        self.entries.iter().find(|e| e.path == path)
    }

    /// Open a bounded, seekable reader over an entry's contents.
    pub fn reader<'a>(&'a self, entry: &AsarEntry) -> SectionReader<'a, R> {
        SectionReader::new(&self.source, entry.offset, entry.size, Plain)
    }

    /// Read an entry's contents into memory.
    pub fn read(&self, entry: &AsarEntry) -> Result<Vec<u8>> {
        Ok(self.reader(entry).read_all()?)
    }
}

impl<R> std::fmt::Debug for AsarArchive<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsarArchive")
            .field("size", &self.size)
            .field("entries", &self.entries.len())
            .finish()
    }
}

fn walk(
    node: &Node,
    parent: &str,
    data_origin: u64,
    source_size: u64,
    out: &mut Vec<AsarEntry>,
) -> Result<()> {
    let Some(children) = &node.files else {
        return Ok(());
    };

    for (name, child) in children {
        if name == ".." || name == "/" {
            return Err(Error::BadPath(format!("{parent}/{name}")));
        }
        let joined = path::join(parent, name);

        if child.files.is_some() {
            walk(child, &joined, data_origin, source_size, out)?;
            continue;
        }
        if child.unpacked {
            let kind = ErrorKind::UnsupportedFeature;
            warn!(path = %joined, ?kind, "skipping entry stored outside the archive");
            continue;
        }
        if let Some(target) = &child.link {
            let kind = ErrorKind::UnsupportedFeature;
            warn!(path = %joined, %target, ?kind, "skipping symlink entry");
            continue;
        }

        let path = path::sanitize(&joined)?;
        let relative: u64 = child
            .offset
            .as_deref()
            .and_then(|o| o.parse().ok())
            .ok_or_else(|| Error::BadOffset {
                path: path.clone(),
                offset: child.offset.clone(),
            })?;
        let offset = data_origin.saturating_add(relative);
        check_range(offset, child.size, source_size)?;

        trace!(%path, offset, size = child.size, "asar entry");
        out.push(AsarEntry {
            path,
            offset,
            size: child.size,
            executable: child.executable,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Seek, SeekFrom};

    use super::*;

    /// Lay out an archive the way the packer does: size pickle, index pickle, data.
    fn build(json: &str, data: &[u8]) -> Vec<u8> {
        let padded = (json.len() + 3) & !3;
        let payload_length = 4 + padded as u32;
        let index_length = 4 + payload_length;

        let mut out = Vec::new();
        out.extend_from_slice(&4u32.to_le_bytes());
        out.extend_from_slice(&index_length.to_le_bytes());
        out.extend_from_slice(&payload_length.to_le_bytes());
        out.extend_from_slice(&(json.len() as u32).to_le_bytes());
        out.extend_from_slice(json.as_bytes());
        out.resize(16 + padded, 0);
        out.extend_from_slice(data);
        out
    }

    #[test]
    fn test_single_file() {
        let json = r#"{"files":{"a.txt":{"offset":"0","size":5}}}"#;
        let data = build(json, b"hello");
        let archive = AsarArchive::open(data.clone(), data.len() as u64).unwrap();

        assert_eq!(archive.entry_count(), 1);
        let entry = &archive.entries()[0];
        assert_eq!(entry.path(), "a.txt");
        assert_eq!(entry.offset(), archive.data_origin());
        assert_eq!(entry.size(), 5);
        assert_eq!(archive.read(entry).unwrap(), b"hello");
    }

    #[test]
    fn test_data_origin_follows_index_section() {
        let json = r#"{"files":{}}"#;
        let data = build(json, b"");
        let archive = AsarArchive::open(data.clone(), data.len() as u64).unwrap();
        assert_eq!(archive.data_origin(), data.len() as u64);
        assert_eq!(archive.entry_count(), 0);
    }

    #[test]
    fn test_nested_directories() {
        let json = r#"{"files":{
            "lib":{"files":{
                "util.js":{"offset":"3","size":4,"executable":true},
                "deep":{"files":{"x.bin":{"offset":"7","size":1}}}
            }},
            "index.js":{"offset":"0","size":3}
        }}"#;
        let data = build(json, b"abcUTILx");
        let archive = AsarArchive::open(data.clone(), data.len() as u64).unwrap();

        let paths: Vec<_> = archive.iter().map(|e| e.path()).collect();
        assert_eq!(paths, ["index.js", "lib/deep/x.bin", "lib/util.js"]);

        let util = archive.find("lib/util.js").unwrap();
        assert!(util.is_executable());
        assert_eq!(archive.read(util).unwrap(), b"UTIL");

        let mut reader = archive.reader(util);
        reader.seek(SeekFrom::Start(2)).unwrap();
        let mut rest = String::new();
        reader.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "IL");
    }

    #[test]
    fn test_malformed_prologue() {
        let mut data = build(r#"{"files":{}}"#, b"");
        data[0] = 8;
        let err = AsarArchive::open(data.clone(), data.len() as u64).unwrap_err();
        assert!(matches!(err, Error::MalformedPrologue(8)));
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn test_rejects_dotdot_name() {
        let json = r#"{"files":{"..":{"files":{"evil":{"offset":"0","size":0}}}}}"#;
        let data = build(json, b"");
        let err = AsarArchive::open(data.clone(), data.len() as u64).unwrap_err();
        assert!(matches!(err, Error::BadPath(_)));
        assert_eq!(err.kind(), ErrorKind::UnsafePath);
    }

    #[test]
    fn test_rejects_slash_name() {
        let json = r#"{"files":{"/":{"files":{"etc":{"offset":"0","size":0}}}}}"#;
        let data = build(json, b"");
        let err = AsarArchive::open(data.clone(), data.len() as u64).unwrap_err();
        assert!(matches!(err, Error::BadPath(_)));
        assert_eq!(err.kind(), ErrorKind::UnsafePath);
    }

    #[test]
    fn test_rejects_backslash_escape() {
        let json = r#"{"files":{"..\\..\\x":{"offset":"0","size":0}}}"#;
        let data = build(json, b"");
        let err = AsarArchive::open(data.clone(), data.len() as u64).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsafePath);
    }

    #[test]
    fn test_rejects_escape_inside_name() {
        let json = r#"{"files":{"a/../../evil":{"offset":"0","size":0}}}"#;
        let data = build(json, b"");
        let err = AsarArchive::open(data.clone(), data.len() as u64).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsafePath);
    }

    #[test]
    fn test_skips_unpacked_and_links() {
        let json = r#"{"files":{
            "native.node":{"size":10,"unpacked":true},
            "current":{"link":"lib/v2"},
            "kept.txt":{"offset":"0","size":2}
        }}"#;
        let data = build(json, b"ok");
        let archive = AsarArchive::open(data.clone(), data.len() as u64).unwrap();
        let paths: Vec<_> = archive.iter().map(|e| e.path()).collect();
        assert_eq!(paths, ["kept.txt"]);
    }

    #[test]
    fn test_entry_past_end_of_source() {
        let json = r#"{"files":{"big":{"offset":"0","size":100}}}"#;
        let data = build(json, b"tiny");
        let err = AsarArchive::open(data.clone(), data.len() as u64).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SizeMismatch);
    }

    #[test]
    fn test_bad_offset() {
        let json = r#"{"files":{"a":{"offset":"zero","size":0}}}"#;
        let data = build(json, b"");
        let err = AsarArchive::open(data.clone(), data.len() as u64).unwrap_err();
        assert!(matches!(err, Error::BadOffset { .. }));
    }
}
