//! Manager Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Errors from the catalog and from
//! repository clients are kept as children, so the full tree reaches the
//! caller.

use derive_more::{Display, Error};
use sceneset_catalog::QueryError;
use std::path::PathBuf;

/// A manager error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for manager operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// Every one of these is fatal to the job that asked for the sceneset: there
/// is no partial result and no substitute scene.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Catalog source, cache directory or repository clients are missing or
    /// malformed.
    #[display("configuration error: {_0}")]
    Configuration(#[error(not(source))] String),
    /// The requested scenes or suite can't be resolved. Carries the complete
    /// missing set.
    #[display("{_0}")]
    Query(QueryError),
    #[display("catalog error")]
    Catalog,
    /// A repository client failed to fetch the artifact with this uuid.
    #[display("failed to transfer artifact {_0}")]
    Transfer(#[error(not(source))] String),
    /// A local-repository artifact isn't where the catalog says it is.
    #[display("local artifact not found: {} (uuid={uuid})", path.display())]
    LocalArtifactNotFound { uuid: String, path: PathBuf },
    /// Something on disk is not what it claims to be.
    #[display("{_0}")]
    Integrity(IntegrityError),
    #[display("filesystem error at {}", _0.display())]
    Filesystem(#[error(not(source))] PathBuf),
    #[display("unable to lock {}", _0.display())]
    Lock(#[error(not(source))] PathBuf),
    /// A blocking task panicked or was cancelled.
    #[display("background task failed")]
    Task,
}

impl ErrorKind {
    /// Convert a catalog error into a manager error, keeping the catalog's
    /// `Exn` frame as a child. Query and configuration failures keep their
    /// category so callers can match on them without digging into the tree.
    #[track_caller]
    pub fn catalog(err: sceneset_catalog::Error) -> Error {
        let kind = match &*err {
            sceneset_catalog::ErrorKind::Query(query) => Self::Query(query.clone()),
            sceneset_catalog::ErrorKind::Configuration(message) => Self::Configuration(message.clone()),
            _ => Self::Catalog,
        };
        err.raise(kind)
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transfer(_) | Self::Lock(_) | Self::Task)
    }
}

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    /// A downloaded archive's manifest names a different artifact.
    #[display("artifact {locator} claims to be {actual}, expected {expected}")]
    IdentityMismatch { locator: String, expected: String, actual: String },
    /// A downloaded archive has no readable manifest.
    #[display("downloaded artifact {uuid} at {} is not a readable archive", path.display())]
    UnreadableArtifact { uuid: String, path: PathBuf },
    /// A sceneset entry doesn't point where it should. Never repaired
    /// automatically.
    #[display(
        "corrupt sceneset cache? expected {} to point to {}, but it points to {actual:?}",
        link.display(),
        expected.display()
    )]
    CorruptSceneset {
        link: PathBuf,
        expected: PathBuf,
        /// `None` if the entry isn't a symlink at all.
        actual: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(ErrorKind::Transfer("uuid".to_string()).is_retryable());
        assert!(!ErrorKind::Integrity(IntegrityError::IdentityMismatch {
            locator: "a.usdz".to_string(),
            expected: "uuid-1".to_string(),
            actual: "uuid-2".to_string(),
        })
        .is_retryable());
    }

    #[test]
    fn test_catalog_errors_keep_their_category() {
        let missing = QueryError::MissingScenes { missing: vec!["A".to_string()], versions: vec!["25.1".to_string()] };
        let err = ErrorKind::catalog(exn::Exn::from(sceneset_catalog::ErrorKind::Query(missing.clone())));
        assert!(matches!(&*err, ErrorKind::Query(query) if *query == missing));

        let err = ErrorKind::catalog(exn::Exn::from(sceneset_catalog::ErrorKind::Configuration("empty".to_string())));
        assert!(matches!(&*err, ErrorKind::Configuration(message) if message == "empty"));

        let err = ErrorKind::catalog(exn::Exn::from(sceneset_catalog::ErrorKind::NoVersions));
        assert!(matches!(&*err, ErrorKind::Catalog));
    }

    #[test]
    fn test_corrupt_sceneset_display() {
        let err = IntegrityError::CorruptSceneset {
            link: PathBuf::from("/cache/scenesets/abc/uuid.usdz"),
            expected: PathBuf::from("../../artifacts/uuid.usdz"),
            actual: Some(PathBuf::from("/elsewhere/uuid.usdz")),
        };
        assert_eq!(
            err.to_string(),
            r#"corrupt sceneset cache? expected /cache/scenesets/abc/uuid.usdz to point to ../../artifacts/uuid.usdz, but it points to Some("/elsewhere/uuid.usdz")"#
        );
    }
}
