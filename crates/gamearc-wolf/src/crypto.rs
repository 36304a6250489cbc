//! The archive key and the ciphers built on it.

use gamearc_common::EntryCipher;

/// Length of the archive key.
pub const KEY_LEN: usize = 12;

/// The 12-byte key shared by the header, trailer and every file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveKey([u8; KEY_LEN]);

impl ArchiveKey {
    /// Wrap raw key bytes.
    pub const fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Assemble the key from the still-encrypted header.
    ///
    /// The key is the concatenation of header bytes 12..16, 28..32 and 20..24.
    pub fn from_header(header: &[u8; 48]) -> Self {
        let mut key = [0u8; KEY_LEN];
        key[0..4].copy_from_slice(&header[12..16]);
        key[4..8].copy_from_slice(&header[28..32]);
        key[8..12].copy_from_slice(&header[20..24]);
        Self(key)
    }

    /// Raw key bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// XOR `buf` with the key starting at phase `phase`.
    pub fn xor_from(&self, phase: usize, buf: &mut [u8]) {
        let mut k = phase % KEY_LEN;
        for byte in buf {
            *byte ^= self.0[k];
            k += 1;
            if k == KEY_LEN {
                k = 0;
            }
        }
    }

    /// XOR `buf` with the key starting at phase zero, as for the header and trailer.
    #[inline]
    pub fn xor(&self, buf: &mut [u8]) {
        self.xor_from(0, buf);
    }
}

/// Content cipher for one file.
///
/// Byte `i` of a file of `size` bytes is XORed with key byte `(size + i) mod 12`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeAnchoredXor {
    key: ArchiveKey,
    size: u64,
}

impl SizeAnchoredXor {
    pub const fn new(key: ArchiveKey, size: u64) -> Self {
        Self { key, size }
    }

    /// Key phase for the byte at `relative_offset`.
    #[inline]
    pub fn phase(&self, relative_offset: u64) -> usize {
        let len = KEY_LEN as u64;
        ((self.size % len + relative_offset % len) % len) as usize
    }
}

impl EntryCipher for SizeAnchoredXor {
    #[inline]
    fn apply(&self, relative_offset: u64, buf: &mut [u8]) {
        self.key.xor_from(self.phase(relative_offset), buf);
    }
}
