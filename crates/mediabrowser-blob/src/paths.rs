//! Path normalization between request paths, object names and virtual paths.
//!
//! Object names never start with `/`. A request path is percent-decoded
//! exactly once and loses a single leading `/` to become an object name or a
//! listing prefix. Virtual paths handed to the renderer are `"/" + name`,
//! unescaped; [`encode_path`] escapes them segment by segment when a link or
//! a canonical URI is written.

use crate::error::BlobError;

/// Delimiter that groups object names into directories.
pub const DELIMITER: char = '/';

/// Decode a raw request path into an object name.
pub fn object_name(request_path: &str) -> Result<String, BlobError> {
    let decoded = urlencoding::decode(request_path)
        .map_err(|_| BlobError::InvalidPath(request_path.to_string()))?;
    let name = decoded.strip_prefix(DELIMITER).unwrap_or(&decoded);
    Ok(name.to_string())
}

/// Decode a raw request path into a listing prefix.
///
/// The root maps to the empty prefix, every other prefix ends with `/`.
pub fn listing_prefix(request_path: &str) -> Result<String, BlobError> {
    Ok(directory_prefix(&object_name(request_path)?))
}

/// Force a non-empty prefix to end with the delimiter.
pub fn directory_prefix(prefix: &str) -> String {
    if prefix.is_empty() || prefix.ends_with(DELIMITER) {
        prefix.to_string()
    } else {
        format!("{}{}", prefix, DELIMITER)
    }
}

/// Last segment of an object name or prefix; prefixes keep their trailing slash.
pub fn basename(name: &str) -> String {
    let trimmed = name.strip_suffix(DELIMITER).unwrap_or(name);
    let last = trimmed.rsplit(DELIMITER).next().unwrap_or(trimmed);
    if trimmed.len() != name.len() {
        format!("{}{}", last, DELIMITER)
    } else {
        last.to_string()
    }
}

pub fn virtual_path(name: &str) -> String {
    format!("{}{}", DELIMITER, name)
}

/// Virtual path of the directory containing `prefix`.
pub fn parent_path(prefix: &str) -> String {
    let trimmed = prefix.trim_end_matches(DELIMITER);
    match trimmed.rfind(DELIMITER) {
        Some(idx) => virtual_path(&trimmed[..=idx]),
        None => DELIMITER.to_string(),
    }
}

/// Whether the last segment of a path carries a file extension.
pub fn has_extension(path: &str) -> bool {
    path.rsplit(DELIMITER)
        .next()
        .map(|segment| segment.contains('.'))
        .unwrap_or(false)
}

/// Percent-encode every segment of a path, keeping the delimiters.
pub fn encode_path(path: &str) -> String {
    path.split(DELIMITER)
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
