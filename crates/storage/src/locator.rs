//! Object-store locators.

use crate::error::{ErrorKind, Result};
use crate::path::validate_key;
use derive_more::Display;

const SCHEME: &str = "s3://";

/// Bucket and key of an object, parsed from a catalog locator.
///
/// Catalog rows address objects either as `s3://bucket/key` or as a bare
/// `bucket/key`; both forms resolve to the same object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
#[display("{bucket}/{key}")]
pub struct ObjectPath {
    pub bucket: String,
    pub key: String,
}

impl ObjectPath {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Parse a locator string.
    ///
    /// # Examples
    ///
    /// ```
    /// use sceneset_storage::ObjectPath;
    /// let path = ObjectPath::parse("s3://sim-artifacts/scenes/clip.usdz").unwrap();
    /// assert_eq!(path.bucket, "sim-artifacts");
    /// assert_eq!(path.key, "scenes/clip.usdz");
    /// assert_eq!(path, ObjectPath::parse("sim-artifacts/scenes/clip.usdz").unwrap());
    /// ```
    pub fn parse(locator: &str) -> Result<Self> {
        let trimmed = locator.trim();
        let without_scheme = trimmed.strip_prefix(SCHEME).unwrap_or(trimmed).trim_start_matches('/');
        let Some((bucket, key)) = without_scheme.split_once('/') else {
            exn::bail!(ErrorKind::InvalidLocator(locator.to_string()));
        };
        if bucket.is_empty() {
            exn::bail!(ErrorKind::InvalidLocator(locator.to_string()));
        }
        let key = validate_key(key).map_err(|_| ErrorKind::InvalidLocator(locator.to_string()))?;
        Ok(Self::new(bucket, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forms() {
        let expected = ObjectPath::new("bucket", "a/b.usdz");
        assert_eq!(ObjectPath::parse("s3://bucket/a/b.usdz").unwrap(), expected);
        assert_eq!(ObjectPath::parse("bucket/a/b.usdz").unwrap(), expected);
        assert_eq!(ObjectPath::parse(" /bucket/a//b.usdz ").unwrap(), expected);
        assert_eq!(expected.to_string(), "bucket/a/b.usdz");
    }

    #[test]
    fn test_parse_rejects() {
        for locator in ["", "s3://", "bucket", "s3://bucket", "/key-only.usdz", "bucket/../../x"] {
            let err = ObjectPath::parse(locator).unwrap_err();
            assert!(matches!(&*err, ErrorKind::InvalidLocator(_)), "{locator:?} should be rejected");
        }
    }
}
