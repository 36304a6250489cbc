//! Archive header.

use gamearc_common::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::crypto::ArchiveKey;
use crate::{Error, Result};

/// Size of the header in bytes.
pub const HEADER_SIZE: usize = 48;

/// The only supported archive version.
pub const VERSION: u16 = 6;

/// Windows codepage identifier for Shift-JIS, the only supported name encoding.
pub const CODEPAGE_SHIFT_JIS: u64 = 932;

/// Decrypted archive header.
///
/// All trailer-relative offsets (`file_table`, `dir_table`) are measured from
/// the start of the decrypted trailer.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
pub struct Header {
    /// `DX`
    pub magic: [u8; 2],
    pub version: u16,
    /// Size of the trailer in bytes
    pub trailer_size: u32,
    /// Absolute offset file data offsets are relative to
    pub data_offset: u64,
    /// Absolute offset of the trailer
    pub trailer_offset: u64,
    /// Offset of the file table within the trailer
    pub file_table: u64,
    /// Offset of the directory table within the trailer
    pub dir_table: u64,
    pub codepage: u64,
}

impl Header {
    /// Extract the key from a raw header, decrypt it and validate it.
    pub fn decrypt(mut raw: [u8; HEADER_SIZE]) -> Result<(Self, ArchiveKey)> {
        let key = ArchiveKey::from_header(&raw);
        key.xor(&mut raw);

        let header = Self::read_from_bytes(&raw).map_err(|_| gamearc_common::Error::UnexpectedEof {
            needed: HEADER_SIZE,
            available: raw.len(),
        })?;

        if header.magic != *b"DX" {
            return Err(Error::BadMagic(header.magic));
        }
        let version = header.version;
        if version != VERSION {
            return Err(Error::UnsupportedVersion(version));
        }
        let codepage = header.codepage;
        if codepage != CODEPAGE_SHIFT_JIS {
            return Err(Error::UnsupportedCodepage(codepage));
        }

        Ok((header, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        assert_eq!(std::mem::size_of::<Header>(), HEADER_SIZE);
    }

    #[test]
    fn test_decrypt_with_zero_key() {
        let mut raw = [0u8; HEADER_SIZE];
        raw[0..2].copy_from_slice(b"DX");
        raw[2..4].copy_from_slice(&6u16.to_le_bytes());
        raw[4..8].copy_from_slice(&64u32.to_le_bytes());
        raw[8..16].copy_from_slice(&48u64.to_le_bytes());
        raw[40..48].copy_from_slice(&932u64.to_le_bytes());

        let (header, key) = Header::decrypt(raw).unwrap();
        assert_eq!(key.as_bytes(), &[0u8; 12]);
        assert_eq!({ header.trailer_size }, 64);
        assert_eq!({ header.data_offset }, 48);
    }

    #[test]
    fn test_rejects_plain_zip() {
        let mut raw = [0u8; HEADER_SIZE];
        raw[0..4].copy_from_slice(b"PK\x03\x04");
        assert!(matches!(Header::decrypt(raw), Err(Error::BadMagic(m)) if m == *b"PK"));
    }
}
