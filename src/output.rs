//! Destination-side helpers shared by the extract commands.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use gamearc::common::path;
use glob::{MatchOptions, Pattern};
use indicatif::{ProgressBar, ProgressStyle};

/// Entry filter given with `--filter`.
///
/// Patterns without wildcards match as a case-insensitive substring;
/// anything else is a case-insensitive glob over the whole entry path.
#[derive(Debug, Clone)]
pub struct Filter {
    pattern: Pattern,
    literal: Option<String>,
}

impl Filter {
    pub fn new(pattern: &str) -> Result<Self> {
        let literal = (!pattern.contains(['*', '?', '['])).then(|| pattern.to_lowercase());
        let pattern = Pattern::new(pattern).with_context(|| format!("invalid filter {pattern:?}"))?;
        Ok(Self { pattern, literal })
    }

    pub fn matches(&self, name: &str) -> bool {
        if let Some(literal) = &self.literal {
            return name.to_lowercase().contains(literal);
        }
        let options = MatchOptions {
            case_sensitive: false,
            require_literal_separator: false,
            require_literal_leading_dot: false,
        };
        self.pattern.matches_with(name, options)
    }
}

/// Apply an optional filter; no filter keeps everything.
pub fn keep(filter: Option<&Filter>, name: &str) -> bool {
    filter.map_or(true, |f| f.matches(name))
}

/// Map a container path onto `root`, re-checking that it stays inside.
///
/// Every segment must be a plain name on the host platform, so a `\` or
/// drive prefix can never turn into a component of its own.
pub fn destination(root: &Path, entry_path: &str) -> Result<PathBuf> {
    let refuse = || format!("refusing to write {entry_path:?}");
    let clean = path::sanitize(entry_path).with_context(refuse)?;
    let mut dst = root.to_path_buf();
    for segment in clean.split('/') {
        path::validate_segment(segment).with_context(refuse)?;
        dst.push(segment);
    }
    Ok(dst)
}

/// Create the file for `entry_path` under `root`, creating parent directories.
pub fn create(root: &Path, entry_path: &str) -> Result<BufWriter<File>> {
    let dst = destination(root, entry_path)?;
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let file = File::create(&dst).with_context(|| format!("failed to create {}", dst.display()))?;
    Ok(BufWriter::new(file))
}

pub fn progress_bar(len: usize) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            )?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_glob() {
        let filter = Filter::new("*.png").unwrap();
        assert!(filter.matches("img/pictures/Title.PNG"));
        assert!(!filter.matches("audio/bgm/Theme.ogg"));

        let filter = Filter::new("data/*.rvdata2").unwrap();
        assert!(filter.matches("Data/Map001.rvdata2"));
        assert!(!filter.matches("Graphics/Data/x.png"));
    }

    #[test]
    fn test_filter_substring() {
        let filter = Filter::new("map0").unwrap();
        assert!(filter.matches("Data/Map001.rvdata2"));
        assert!(!filter.matches("Data/System.rvdata2"));
        assert!(keep(None, "anything"));
    }

    #[test]
    fn test_invalid_filter() {
        assert!(Filter::new("[").is_err());
    }

    #[test]
    fn test_create_nested() {
        let dir = tempfile::tempdir().unwrap();
        {
            use std::io::Write;
            let mut out = create(dir.path(), "a/b/c.txt").unwrap();
            out.write_all(b"hi").unwrap();
        }
        assert_eq!(fs::read(dir.path().join("a").join("b").join("c.txt")).unwrap(), b"hi");
    }

    #[test]
    fn test_destination_rejects_escape() {
        let dir = tempfile::tempdir().unwrap();
        assert!(destination(dir.path(), "../evil").is_err());
        assert!(destination(dir.path(), "/etc/passwd").is_err());
        assert!(destination(dir.path(), "a/../../evil").is_err());
        assert!(destination(dir.path(), "..\\..\\Windows\\evil.dll").is_err());
        assert!(destination(dir.path(), "sub/..\\..\\evil").is_err());
        assert!(destination(dir.path(), "C:evil").is_err());
        assert_eq!(destination(dir.path(), "a/./b").unwrap(), dir.path().join("a").join("b"));
    }
}
