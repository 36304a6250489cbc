//! Lexical path handling for paths read out of container indices.
//!
//! Container paths always use `/` as the separator. Nothing here touches the
//! filesystem; mapping the cleaned relative path onto a destination directory
//! is the extractor's job.

use crate::{Error, Result};

/// Lexically clean a slash-separated path.
///
/// Repeated separators and `.` segments are dropped, `..` consumes the
/// preceding segment, a leading `..` of a relative path is kept, and `..`
/// directly under the root is discarded. An empty result is `"."` (or `"/"`
/// for a rooted path).
pub fn clean_path(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ if rooted => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

/// Check whether a cleaned path is absolute.
///
/// Both the container's `/` root and Windows drive or UNC prefixes count.
pub fn is_absolute(path: &str) -> bool {
    let bytes = path.as_bytes();
    path.starts_with('/')
        || path.starts_with('\\')
        || (bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':')
}

/// Reject a cleaned path that could land outside the extraction root.
///
/// Absolute paths, paths whose first segment is `..`, and the empty (`.`)
/// path are all [`Error::UnsafePath`]. So is any `\` or `:`, which a
/// Windows filesystem would read as a separator or a drive/stream marker.
pub fn validate_relative_path(path: &str) -> Result<()> {
    if is_absolute(path) || path.contains(['\\', ':']) {
        return Err(Error::UnsafePath(path.to_string()));
    }
    match path.split('/').next() {
        Some("..") | Some(".") | Some("") | None => Err(Error::UnsafePath(path.to_string())),
        Some(_) => Ok(()),
    }
}

/// Clean `path` and validate the result, returning the safe relative path.
pub fn sanitize(path: &str) -> Result<String> {
    let cleaned = clean_path(path);
    validate_relative_path(&cleaned)?;
    Ok(cleaned)
}

/// Reject a single name that is not usable as one path segment.
///
/// Separators of either platform and `:` are refused.
pub fn validate_segment(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\', ':']) {
        return Err(Error::UnsafePath(name.to_string()));
    }
    Ok(())
}

/// Join a parent path and one segment with `/`.
pub fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}
