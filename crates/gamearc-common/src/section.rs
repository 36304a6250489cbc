//! Bounded entry streams with optional position-dependent decryption.

use std::io::{self, Read, Seek, SeekFrom};

use crate::ReadAt;

/// A content transform that can be applied at any byte offset of an entry.
///
/// Implementations are pure functions of their key material, the offset of
/// `buf[0]` relative to the start of the entry, and the buffer length. They
/// must produce identical output whether an entry is read in one call or in
/// many calls starting at arbitrary offsets.
pub trait EntryCipher {
    /// Transform `buf` in place, `buf[0]` being at `relative_offset` in the entry.
    fn apply(&self, relative_offset: u64, buf: &mut [u8]);
}

/// The identity transform, for formats that store entries in the clear.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Plain;

impl EntryCipher for Plain {
    #[inline]
    fn apply(&self, _relative_offset: u64, _buf: &mut [u8]) {}
}

/// A bounded, seekable view of `size` bytes at `offset` in a source.
///
/// Every read is passed through the entry's [`EntryCipher`]. The only state
/// is the stream position used by the [`Read`] and [`Seek`] impls; positioned
/// reads through [`ReadAt`] do not touch it.
#[derive(Debug, Clone)]
pub struct SectionReader<'a, R: ?Sized, C = Plain> {
    source: &'a R,
    offset: u64,
    size: u64,
    position: u64,
    cipher: C,
}

impl<'a, R: ReadAt + ?Sized, C: EntryCipher> SectionReader<'a, R, C> {
    /// Create a view of `size` bytes starting at `offset` in `source`.
    pub fn new(source: &'a R, offset: u64, size: u64, cipher: C) -> Self {
        Self {
            source,
            offset,
            size,
            position: 0,
            cipher,
        }
    }

    /// Total size of the section in bytes.
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Absolute offset of the section in the underlying source.
    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Read the whole section into a new buffer.
    pub fn read_all(&self) -> io::Result<Vec<u8>> {
        let len = usize::try_from(self.size).map_err(|_| {
            io::Error::new(io::ErrorKind::OutOfMemory, "entry does not fit in memory")
        })?;
        let mut data = vec![0u8; len];
        self.read_exact_at(0, &mut data)?;
        Ok(data)
    }
}

impl<R: ReadAt + ?Sized, C: EntryCipher> ReadAt for SectionReader<'_, R, C> {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        if offset >= self.size {
            return Ok(0);
        }
        let available = self.size - offset;
        let len = usize::try_from(available).map_or(buf.len(), |a| a.min(buf.len()));
        let buf = &mut buf[..len];

        let n = self.source.read_at(self.offset.saturating_add(offset), buf)?;
        self.cipher.apply(offset, &mut buf[..n]);
        Ok(n)
    }
}

impl<R: ReadAt + ?Sized, C: EntryCipher> Read for SectionReader<'_, R, C> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.read_at(self.position, buf)?;
        self.position += n as u64;
        Ok(n)
    }
}

impl<R: ReadAt + ?Sized, C: EntryCipher> Seek for SectionReader<'_, R, C> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let (base, delta) = match pos {
            SeekFrom::Start(p) => {
                self.position = p;
                return Ok(p);
            }
            SeekFrom::End(d) => (self.size, d),
            SeekFrom::Current(d) => (self.position, d),
        };
        match base.checked_add_signed(delta) {
            Some(p) => {
                self.position = p;
                Ok(p)
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative or overflowing position",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Adds the absolute in-entry offset to every byte.
    #[derive(Clone)]
    struct OffsetAdd;

    impl EntryCipher for OffsetAdd {
        fn apply(&self, relative_offset: u64, buf: &mut [u8]) {
            for (i, b) in buf.iter_mut().enumerate() {
                *b = b.wrapping_add((relative_offset + i as u64) as u8);
            }
        }
    }

    #[test]
    fn test_bounded_read() {
        let data = b"headerPAYLOADtrailer".to_vec();
        let mut section = SectionReader::new(&data, 6, 7, Plain);

        let mut out = String::new();
        section.read_to_string(&mut out).unwrap();
        assert_eq!(out, "PAYLOAD");
        assert_eq!(section.read_all().unwrap(), b"PAYLOAD");
    }

    #[test]
    fn test_seek_then_read() {
        let data = b"0123456789".to_vec();
        let mut section = SectionReader::new(&data, 2, 6, Plain);

        assert_eq!(section.seek(SeekFrom::End(-2)).unwrap(), 4);
        let mut buf = [0u8; 8];
        assert_eq!(section.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"67");
        assert_eq!(section.read(&mut buf).unwrap(), 0);

        assert!(section.seek(SeekFrom::Current(-10)).is_err());
    }

    #[test]
    fn test_cipher_sees_relative_offset() {
        let data = vec![0u8; 16];
        let section = SectionReader::new(&data, 4, 8, OffsetAdd);

        let whole = section.read_all().unwrap();
        assert_eq!(whole, vec![0, 1, 2, 3, 4, 5, 6, 7]);

        let mut tail = [0u8; 3];
        section.read_exact_at(5, &mut tail).unwrap();
        assert_eq!(tail, [5, 6, 7]);
    }
}
