//! Rolling-key content cipher.
//!
//! A file's content is split into 4-byte blocks. Block `n` is XORed with the
//! little-endian bytes of the key obtained by applying `k -> 7k + 3` to the
//! file's initial key `n` times, with wrapping 32-bit arithmetic.

use gamearc_common::EntryCipher;

/// Apply the key recurrence once.
#[inline]
pub const fn step(key: u32) -> u32 {
    key.wrapping_mul(7).wrapping_add(3)
}

/// Apply the key recurrence `n` times.
///
/// The recurrence is the affine map `k -> 7k + 3` over `u32`, so `n`
/// applications compose into a single map `k -> a*k + b`. The composed map is
/// built by repeated squaring, which takes `O(log n)` steps and yields exactly
/// the key that `n` calls to [`step`] would.
pub fn advance(key: u32, n: u64) -> u32 {
    // Accumulated map, starts as the identity.
    let (mut a, mut b) = (1u32, 0u32);
    // The map applied 2^i times.
    let (mut pa, mut pb) = (7u32, 3u32);
    let mut n = n;

    while n > 0 {
        if n & 1 == 1 {
            a = pa.wrapping_mul(a);
            b = pa.wrapping_mul(b).wrapping_add(pb);
        }
        pb = pa.wrapping_mul(pb).wrapping_add(pb);
        pa = pa.wrapping_mul(pa);
        n >>= 1;
    }

    a.wrapping_mul(key).wrapping_add(b)
}

/// The per-file content cipher.
///
/// Holds only the file's initial key; the key for any byte is recomputed
/// from its offset, so reads may start anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollingKey {
    key: u32,
}

impl RollingKey {
    /// Create a cipher from a file's initial key.
    #[inline]
    pub const fn new(key: u32) -> Self {
        Self { key }
    }

    /// The file's initial key.
    #[inline]
    pub const fn key(&self) -> u32 {
        self.key
    }
}

impl EntryCipher for RollingKey {
    fn apply(&self, relative_offset: u64, buf: &mut [u8]) {
        let mut key = advance(self.key, relative_offset / 4);
        let mut lanes = key.to_le_bytes();
        let mut lane = (relative_offset % 4) as usize;

        for byte in buf {
            *byte ^= lanes[lane];
            lane += 1;
            if lane == 4 {
                lane = 0;
                key = step(key);
                lanes = key.to_le_bytes();
            }
        }
    }
}
