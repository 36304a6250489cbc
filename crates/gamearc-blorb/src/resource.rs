//! Resource usages and chunk formats.

use std::borrow::Cow;
use std::fmt;

/// The usage column of a resource index record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// `Pict` - images.
    Picture,
    /// `Snd ` - sounds and music.
    Sound,
    /// `Data` - opaque data files.
    Data,
    /// `Exec` - the story executable.
    Executable,
    /// `GLUL` - Glulx game file.
    Glulx,
}

impl ResourceKind {
    /// All kinds, in bucket order.
    pub const ALL: [ResourceKind; 5] = [
        Self::Picture,
        Self::Sound,
        Self::Data,
        Self::Executable,
        Self::Glulx,
    ];

    /// Map an index usage tag onto a kind.
    pub fn from_tag(tag: &[u8; 4]) -> Option<Self> {
        match tag {
            b"Pict" => Some(Self::Picture),
            b"Snd " => Some(Self::Sound),
            b"Data" => Some(Self::Data),
            b"Exec" => Some(Self::Executable),
            b"GLUL" => Some(Self::Glulx),
            _ => None,
        }
    }

    /// The on-disk usage tag.
    pub const fn tag(self) -> &'static [u8; 4] {
        match self {
            Self::Picture => b"Pict",
            Self::Sound => b"Snd ",
            Self::Data => b"Data",
            Self::Executable => b"Exec",
            Self::Glulx => b"GLUL",
        }
    }

    /// Short lowercase name, used as the extraction directory.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Picture => "pict",
            Self::Sound => "snd",
            Self::Data => "data",
            Self::Executable => "exec",
            Self::Glulx => "glul",
        }
    }

    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Payload format sniffed from a resource chunk header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkFormat {
    /// `PNG `
    Png,
    /// `JPEG`
    Jpeg,
    /// `GLUL`
    Glulx,
    /// Anything else, kept verbatim.
    Other([u8; 4]),
}

impl ChunkFormat {
    /// Sniff the chunk type tag.
    pub fn from_magic(magic: [u8; 4]) -> Self {
        match &magic {
            b"PNG " => Self::Png,
            b"JPEG" => Self::Jpeg,
            b"GLUL" => Self::Glulx,
            _ => Self::Other(magic),
        }
    }

    /// Canonical short name, or the raw chunk tag for unrecognized formats.
    pub fn label(&self) -> Cow<'static, str> {
        match self {
            Self::Png => Cow::Borrowed("png"),
            Self::Jpeg => Cow::Borrowed("jpg"),
            Self::Glulx => Cow::Borrowed("glul"),
            Self::Other(raw) => Cow::Owned(String::from_utf8_lossy(raw).into_owned()),
        }
    }

    /// File extension derived from [`label`](Self::label), safe for use in a path.
    pub fn extension(&self) -> String {
        let label = self.label();
        let trimmed = label.trim_end_matches(|c| c == ' ' || c == '\0');
        trimmed
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect()
    }
}

impl fmt::Display for ChunkFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags() {
        for kind in ResourceKind::ALL {
            assert_eq!(ResourceKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(ResourceKind::from_tag(b"Pic "), None);
    }

    #[test]
    fn test_format_sniffing() {
        assert_eq!(ChunkFormat::from_magic(*b"PNG "), ChunkFormat::Png);
        assert_eq!(ChunkFormat::from_magic(*b"JPEG").label(), "jpg");
        assert_eq!(ChunkFormat::from_magic(*b"GLUL").label(), "glul");

        let aiff = ChunkFormat::from_magic(*b"FORM");
        assert_eq!(aiff, ChunkFormat::Other(*b"FORM"));
        assert_eq!(aiff.label(), "FORM");
    }

    #[test]
    fn test_extension_is_path_safe() {
        assert_eq!(ChunkFormat::from_magic(*b"MOD ").extension(), "MOD");
        assert_eq!(ChunkFormat::from_magic(*b"a/.b").extension(), "a__b");
        assert_eq!(ChunkFormat::Png.extension(), "png");
    }
}
