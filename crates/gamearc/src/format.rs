//! Container format names and signature detection.

use std::fmt;
use std::io;
use std::str::FromStr;

use gamearc_common::ReadAt;

/// Number of leading bytes [`Format::detect`] looks at.
pub const SNIFF_LEN: usize = 48;

/// A supported container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Asar,
    Blorb,
    Rgssad,
    Rpa,
    Wolf,
}

impl Format {
    /// All formats, in detection order.
    pub const ALL: [Format; 5] = [
        Self::Rgssad,
        Self::Rpa,
        Self::Blorb,
        Self::Wolf,
        Self::Asar,
    ];

    /// Lowercase name, as accepted on the command line.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Asar => "asar",
            Self::Blorb => "blorb",
            Self::Rgssad => "rgssad",
            Self::Rpa => "rpa",
            Self::Wolf => "wolf",
        }
    }

    /// Identify a container from its first bytes.
    ///
    /// `prefix` should hold at least [`SNIFF_LEN`] bytes when the source is
    /// that long. The wolf check decrypts the header, so it needs all 48.
    pub fn detect(prefix: &[u8]) -> Option<Self> {
        Self::ALL.into_iter().find(|format| format.matches(prefix))
    }

    /// Read the first bytes of `source` and identify the container.
    pub fn detect_source<R: ReadAt + ?Sized>(source: &R, size: u64) -> io::Result<Option<Self>> {
        let len = size.min(SNIFF_LEN as u64) as usize;
        let mut prefix = [0u8; SNIFF_LEN];
        source.read_exact_at(0, &mut prefix[..len])?;
        Ok(Self::detect(&prefix[..len]))
    }

    fn matches(self, prefix: &[u8]) -> bool {
        match self {
            Self::Rgssad => prefix.starts_with(b"RGSSAD\0"),
            Self::Rpa => prefix.starts_with(b"RPA-3.0 "),
            Self::Blorb => {
                prefix.len() >= 12 && &prefix[0..4] == b"FORM" && &prefix[8..12] == b"IFRS"
            }
            Self::Wolf => prefix
                .get(..SNIFF_LEN)
                .and_then(|p| <[u8; SNIFF_LEN]>::try_from(p).ok())
                .is_some_and(|raw| gamearc_wolf::Header::decrypt(raw).is_ok()),
            Self::Asar => {
                prefix.len() >= 17 && prefix[0..4] == 4u32.to_le_bytes() && prefix[16] == b'{'
            }
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|format| format.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown format {s:?}"))
    }
}
