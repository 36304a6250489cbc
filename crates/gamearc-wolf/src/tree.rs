//! Directory tree walk over the decrypted trailer.

use std::collections::HashSet;

use encoding_rs::SHIFT_JIS;
use gamearc_common::{
    path, BinaryReader, ErrorKind, FromBytes, Immutable, IntoBytes, KnownLayout,
};
use tracing::{trace, warn};

use crate::{Error, Result};

/// Windows `FILE_ATTRIBUTE_DIRECTORY`.
const ATTRIBUTE_DIRECTORY: u64 = 0x10;

/// A directory table record.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
pub(crate) struct DirRecord {
    /// File table offset of this directory's own record
    pub self_offset: u64,
    /// Directory table offset of the parent directory
    pub parent: u64,
    /// Number of records in the file list
    pub file_count: u64,
    /// File table offset of the first record in the file list
    pub file_list: u64,
}

/// A file table record.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
pub(crate) struct FileRecord {
    /// Name table offset
    pub name: u64,
    /// Windows file attributes
    pub attributes: u64,
    pub created: u64,
    pub accessed: u64,
    pub written: u64,
    /// Data offset for files, directory table offset for directories
    pub data_offset: u64,
    pub size: u64,
    /// Stored size when compressed, negative when stored as is
    pub compressed_size: u64,
}

/// Raw Windows `FILETIME` stamps carried by a file record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileTimes {
    pub created: u64,
    pub accessed: u64,
    pub written: u64,
}

/// A stored file found by the walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TreeFile {
    pub path: String,
    /// Offset relative to the header's data offset
    pub data_offset: u64,
    pub size: u64,
    pub times: FileTimes,
}

/// Result of walking the whole tree.
#[derive(Debug, Default)]
pub(crate) struct Walk {
    pub files: Vec<TreeFile>,
    /// Records skipped because they are compressed
    pub skipped: usize,
}

/// A directory whose file list is partially consumed.
struct Frame {
    path: String,
    file_list: u64,
    file_count: u64,
    next: u64,
}

/// Walk every directory reachable from the root, depth first in file-table order.
pub(crate) fn walk(trailer: &[u8], file_table: u64, dir_table: u64) -> Result<Walk> {
    let mut out = Walk::default();
    let mut visited = HashSet::new();
    let mut stack = vec![open_dir(trailer, dir_table, 0, String::new(), &mut visited)?];

    while let Some(frame) = stack.last_mut() {
        if frame.next == frame.file_count {
            stack.pop();
            continue;
        }
        let index = frame.next;
        frame.next += 1;

        let at = file_table
            .saturating_add(frame.file_list)
            .saturating_add(index.saturating_mul(64));
        let record: FileRecord = BinaryReader::new_at_u64(trailer, at).read_struct()?;

        // Compressed records are dropped before their name or subtree is looked at.
        let compressed_size = record.compressed_size as i64;
        if compressed_size >= 0 {
            let (parent, kind) = (&frame.path, ErrorKind::UnsupportedFeature);
            warn!(%parent, index, compressed_size, ?kind, "skipping compressed entry");
            out.skipped += 1;
            continue;
        }

        let name = read_name(trailer, record.name)?;
        let joined = path::join(&frame.path, &name);

        let attributes = record.attributes;
        let data_offset = record.data_offset;
        if attributes & ATTRIBUTE_DIRECTORY != 0 {
            let child = open_dir(trailer, dir_table, data_offset, joined, &mut visited)?;
            stack.push(child);
            continue;
        }

        let size = record.size;
        trace!(path = %joined, data_offset, size, "wolf entry");
        out.files.push(TreeFile {
            path: joined,
            data_offset,
            size,
            times: FileTimes {
                created: record.created,
                accessed: record.accessed,
                written: record.written,
            },
        });
    }

    Ok(out)
}

fn open_dir(
    trailer: &[u8],
    dir_table: u64,
    offset: u64,
    path: String,
    visited: &mut HashSet<u64>,
) -> Result<Frame> {
    if !visited.insert(offset) {
        return Err(Error::DirectoryCycle(offset));
    }
    let record: DirRecord =
        BinaryReader::new_at_u64(trailer, dir_table.saturating_add(offset)).read_struct()?;
    let (own_record, parent) = (record.self_offset, record.parent);
    let (file_list, file_count) = (record.file_list, record.file_count);
    trace!(%path, offset, own_record, parent, file_count, "wolf directory");

    Ok(Frame {
        path,
        file_list,
        file_count,
        next: 0,
    })
}

/// Read the display name at `offset` in the name table.
///
/// A name entry is a `u16` length in 4-byte units, a `u16` parity, an
/// upper-cased copy of the name, then the name itself, both null padded.
fn read_name(trailer: &[u8], offset: u64) -> Result<String> {
    let mut reader = BinaryReader::new_at_u64(trailer, offset);
    let len = usize::from(reader.read_u16()?) * 4;
    let _parity = reader.read_u16()?;
    reader.advance(len);
    let raw = reader.read_bytes(len)?;

    let end = raw.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    let (name, had_errors) = SHIFT_JIS.decode_without_bom_handling(&raw[..end]);
    if had_errors {
        warn!(name = %name, "name is not valid Shift-JIS");
    }

    if path::validate_segment(&name).is_err() {
        return Err(Error::BadName(name.into_owned()));
    }
    Ok(name.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name_entry(name: &[u8]) -> Vec<u8> {
        let units = name.len() / 4 + 1;
        let mut padded = name.to_vec();
        padded.resize(units * 4, 0);

        let mut out = Vec::new();
        out.extend_from_slice(&(units as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend(padded.iter().map(u8::to_ascii_uppercase));
        out.extend_from_slice(&padded);
        out
    }

    #[test]
    fn test_read_name_shift_jis() {
        let (encoded, _, _) = SHIFT_JIS.encode("マップ.mps");
        let mut trailer = vec![0xEE; 3];
        trailer.extend(name_entry(&encoded));
        assert_eq!(read_name(&trailer, 3).unwrap(), "マップ.mps");
    }

    #[test]
    fn test_read_name_rejects_segments() {
        for bad in [&b".."[..], &b"a/b"[..], &b""[..], &b"."[..]] {
            let trailer = name_entry(bad);
            assert!(
                matches!(read_name(&trailer, 0), Err(Error::BadName(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_read_name_out_of_bounds() {
        let mut trailer = name_entry(b"long_name.txt");
        trailer.truncate(10);
        let err = read_name(&trailer, 0).unwrap_err();
        assert!(matches!(err, Error::Common(gamearc_common::Error::UnexpectedEof { .. })));
    }
}
