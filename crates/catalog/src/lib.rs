//! Catalog of scene artifacts and the suites that group them.
//!
//! The catalog is a small relational store (SQLite, in memory) answering
//! three questions:
//!
//! - **Resolve**: which artifact (uuid) should be used for each requested
//!   scene id, or for every member of a suite, under a set of compatible
//!   versions? See [`Catalog::query_by_ids`] and [`Catalog::query_by_suite`].
//! - **Locate**: where do those artifacts live? See [`Catalog::locate`].
//! - **Load**: where does the catalog itself come from? Either two CSV tables
//!   ([`Catalog::load_from_csv`]) or a scan of a directory of archives
//!   ([`Catalog::load_from_directory`]).
//!
//! Resolution is all or nothing. A request either resolves every scene it
//! names, or fails with a [`QueryError`] listing everything that couldn't be
//! resolved.

mod catalog;
mod db;
pub mod error;
mod locator;
mod models;
mod resolver;
mod scan;
mod tables;

pub use crate::catalog::{Catalog, Counts};
pub(crate) use crate::db::Database;
pub use crate::error::{Error, ErrorKind, QueryError, Result};
pub use crate::models::{ArtifactRepository, Located, ResolvedPair, SceneRecord, SuiteMembership, UnrecognizedRepository};
pub use crate::scan::{LOCAL_SUITE_ID, scan_local_directory};
pub use crate::tables::{SCENES_FILE_NAME, SUITES_FILE_NAME, Tables, format_timestamp, parse_timestamp};
