//! RPG Maker MV encrypted asset files.
//!
//! Each asset is a 16-byte fake header, then 16 bytes XORed with the
//! project key, then the rest of the file in the clear. The key lives in
//! `System.json` as the hex `encryptionKey` field.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{debug, trace};

pub const HEADER_LEN: usize = 16;
pub const KEY_LEN: usize = 16;

pub type Key = [u8; KEY_LEN];

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct System {
    encryption_key: Option<String>,
}

/// Load the asset key from a `System.json`.
pub fn load_key(path: &Path) -> Result<Key> {
    let text = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let system: System = serde_json::from_slice(&text).context("key file is not valid JSON")?;
    let Some(hex_key) = system.encryption_key else {
        bail!("{} has no encryptionKey field", path.display());
    };
    parse_key(&hex_key)
}

pub fn parse_key(hex_key: &str) -> Result<Key> {
    let bytes = hex::decode(hex_key.trim()).context("malformed key")?;
    let len = bytes.len();
    Key::try_from(bytes)
        .map_err(|_| anyhow::anyhow!("malformed key: {len} bytes, expected {KEY_LEN}"))
}

/// Plain extension for an encrypted asset extension, if it is one.
pub fn plain_extension(ext: &str) -> Option<&'static str> {
    match ext {
        "rpgmvp" => Some("png"),
        "rpgmvm" => Some("m4a"),
        "rpgmvo" => Some("ogg"),
        _ => None,
    }
}

/// Strip the header and undo the XOR on the first block, streaming the rest.
pub fn decrypt<R: Read, W: Write>(key: &Key, mut src: R, mut dst: W) -> Result<u64> {
    let mut header = [0u8; HEADER_LEN];
    src.read_exact(&mut header).context("asset is shorter than its header")?;

    let mut head = Vec::with_capacity(KEY_LEN);
    src.by_ref().take(KEY_LEN as u64).read_to_end(&mut head)?;
    for (b, k) in head.iter_mut().zip(key) {
        *b ^= k;
    }
    dst.write_all(&head)?;

    let rest = io::copy(&mut src, &mut dst)?;
    dst.flush()?;
    Ok(head.len() as u64 + rest)
}

/// Decrypt every asset directly inside `src_dir` into `dst_dir`.
///
/// Subdirectories and files with other extensions are skipped. Returns the
/// number of files written.
pub fn convert_dir(key: &Key, src_dir: &Path, dst_dir: &Path) -> Result<usize> {
    fs::create_dir_all(dst_dir).with_context(|| format!("failed to create {}", dst_dir.display()))?;

    let mut jobs: Vec<(PathBuf, PathBuf)> = Vec::new();
    let listing =
        fs::read_dir(src_dir).with_context(|| format!("failed to read {}", src_dir.display()))?;
    for dirent in listing {
        let dirent = dirent?;
        if dirent.file_type()?.is_dir() {
            continue;
        }
        let src = dirent.path();
        let Some(ext) = src.extension().and_then(|e| e.to_str()).and_then(plain_extension) else {
            trace!(path = %src.display(), "not an encrypted asset");
            continue;
        };
        let Some(stem) = src.file_stem() else { continue };
        let mut name = stem.to_os_string();
        name.push(".");
        name.push(ext);
        let dst = dst_dir.join(name);
        jobs.push((src, dst));
    }
    jobs.sort();
    debug!(count = jobs.len(), "decrypting assets");

    for (src, dst) in &jobs {
        let input = File::open(src).with_context(|| format!("failed to open {}", src.display()))?;
        let output =
            File::create(dst).with_context(|| format!("failed to create {}", dst.display()))?;
        decrypt(key, BufReader::new(input), BufWriter::new(output))
            .with_context(|| format!("failed to decrypt {}", src.display()))?;
    }

    Ok(jobs.len())
}
