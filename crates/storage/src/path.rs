//! Relative path validation.
//!
//! Locators come out of CSV files that nobody here controls. Before a
//! locator is joined onto a local directory (hub downloads) or used as an
//! object key, it has to be proven to stay underneath that root.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Validates and normalises a relative path.
///
/// > **Note:** This does **not** normalize backslashes, non-UTF8 bytes, or
/// >           platform-specific weirdness. Null bytes are explicitly rejected.
///
/// # Returns
/// Returns the normalized path if valid, or [`InvalidPath`](crate::error::ErrorKind::InvalidPath)
/// if the path would leave its root or is empty.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use sceneset_storage::validate_path;
/// assert!(validate_path("scenes/clipgt-01.usdz").is_ok());
/// assert!(validate_path("/scenes/clipgt-01.usdz").is_ok()); // (leading slash is dropped)
/// assert!(validate_path("../etc/passwd").is_err());
/// assert!(validate_path("scenes/../../b").is_err());
/// assert_eq!(
///     validate_path("scenes/./v2/../clipgt-01.usdz").unwrap(),
///     Path::new("scenes/clipgt-01.usdz")
/// );
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let invalid = || ErrorKind::InvalidPath(path.to_path_buf());
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            // Null bytes pass through Path::components() on Unix but cause
            // truncation in C-based syscalls.
            Component::Normal(s) if s.as_encoded_bytes().contains(&0) => exn::bail!(invalid()),
            Component::Normal(s) => components.push(s),
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(invalid()),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(invalid());
                }
            },
        }
    }
    if components.is_empty() {
        exn::bail!(invalid());
    }
    Ok(components.into_iter().collect())
}

/// Same rules as [`validate`], for `/`-separated object keys.
pub fn validate_key(key: &str) -> Result<String> {
    let validated = validate(key)?;
    match validated.to_str() {
        Some(key) => Ok(key.to_string()),
        None => exn::bail!(ErrorKind::InvalidPath(validated)),
    }
}
