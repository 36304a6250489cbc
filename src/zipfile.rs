//! Plain ZIP archives, as shipped by many Japanese indie games.
//!
//! Names without the UTF-8 flag are usually Shift-JIS; they are transcoded
//! and then held to the same path rules as the game containers.

use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, Write};
use std::path::Path;

use anyhow::{Context, Result};
use encoding_rs::SHIFT_JIS;
use gamearc::common::path;
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::output::{self, Filter};

/// Decode a raw entry name into a container path.
pub fn decode_name(raw: &[u8]) -> String {
    let name = match std::str::from_utf8(raw) {
        Ok(name) => Cow::Borrowed(name),
        Err(_) => {
            let (name, had_errors) = SHIFT_JIS.decode_without_bom_handling(raw);
            if had_errors {
                warn!(?raw, "entry name is neither UTF-8 nor Shift-JIS");
            }
            name
        }
    };
    name.replace('\\', "/")
}

pub fn open(src: &Path) -> Result<ZipArchive<BufReader<File>>> {
    let file = File::open(src).with_context(|| format!("failed to open {}", src.display()))?;
    ZipArchive::new(BufReader::new(file)).context("failed to read ZIP directory")
}

/// Path and size of every file entry, directories omitted.
pub fn list<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Vec<(String, u64)>> {
    let mut files = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let file = archive.by_index(index)?;
        if file.is_dir() {
            continue;
        }
        files.push((decode_name(file.name_raw()), file.size()));
    }
    Ok(files)
}

/// Extract matching file entries under `output`. Returns `(written, failed)`.
pub fn extract<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    output: &Path,
    filter: Option<&Filter>,
) -> Result<(usize, usize)> {
    let pb = output::progress_bar(archive.len())?;
    let mut written = 0;
    let mut failed = 0;

    for index in 0..archive.len() {
        let mut file = archive.by_index(index)?;
        let name = decode_name(file.name_raw());
        pb.inc(1);
        if file.is_dir() || !output::keep(filter, &name) {
            continue;
        }
        if let Err(e) = path::sanitize(&name) {
            warn!(%name, "skipping entry: {e}");
            failed += 1;
            continue;
        }

        let result = output::create(output, &name).and_then(|mut out| {
            io::copy(&mut file, &mut out)?;
            out.flush()?;
            Ok(())
        });
        match result {
            Ok(()) => written += 1,
            Err(e) => {
                eprintln!("Error extracting {}: {:#}", name, e);
                failed += 1;
            }
        }
    }

    pb.finish_with_message("Done");
    debug!(written, failed, "zip extraction finished");
    Ok((written, failed))
}
