//! Catalog Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A catalog error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("database error")]
    Database,
    #[display("database migration error")]
    Migration,
    /// The catalog source is missing or malformed: fix the input and reload.
    #[display("invalid catalog source: {_0}")]
    Configuration(#[error(not(source))] String),
    /// At least one compatible version must be supplied to any query.
    #[display("at least one compatible version must be provided")]
    NoVersions,
    /// The request cannot be satisfied by this catalog.
    #[display("{_0}")]
    Query(QueryError),
    /// Uuids asked to be located that the catalog has never heard of.
    #[display("unknown artifacts: {_0:?}")]
    UnknownArtifacts(#[error(not(source))] Vec<String>),
    /// Data couldn't be converted between its row and model forms.
    #[display("invalid catalog data: {_0}")]
    InvalidData(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Everything lives in memory; the same request gets the same answer.
        false
    }
}

/// A scene or suite request that can't be resolved.
///
/// The `missing` list is always complete (every unresolvable scene id, not
/// just the first one found) and sorted.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[display("failed to find scenes {missing:?} compatible with versions {versions:?}")]
    MissingScenes { missing: Vec<String>, versions: Vec<String> },
    #[display("failed to find any scenes for suite `{suite_id}`")]
    EmptySuite { suite_id: String },
    #[display(
        "failed to find scenes {missing:?} of suite `{suite_id}` compatible with versions {versions:?}; \
         a sceneset needs a valid artifact for every scene in the suite"
    )]
    IncompleteSuite {
        suite_id: String,
        missing: Vec<String>,
        versions: Vec<String>,
    },
}

impl QueryError {
    /// Scene ids that could not be resolved.
    pub fn missing(&self) -> &[String] {
        match self {
            Self::MissingScenes { missing, .. } | Self::IncompleteSuite { missing, .. } => missing,
            Self::EmptySuite { .. } => &[],
        }
    }
}
