//! Scene archive inspection.
//!
//! Every scene artifact is a zip container (a `.usdz` file) that carries a
//! small YAML manifest, `metadata.yaml`, at the root of the archive. The
//! manifest is the artifact's own claim about its identity: which uuid it
//! is, which scene it renders, and which engine version produced it.
//!
//! This crate only reads (and, for fixtures, writes) that manifest. It does
//! not care about the rest of the archive's contents.

pub mod error;
mod manifest;

pub use crate::manifest::{MANIFEST_NAME, Manifest, read_manifest, read_manifest_uuid};

/// File extension of scene archives, without the leading dot.
pub const ARCHIVE_EXTENSION: &str = "usdz";

/// File name used for an artifact in any local store: `<uuid>.usdz`.
pub fn archive_file_name(uuid: impl AsRef<str>) -> String {
    format!("{}.{ARCHIVE_EXTENSION}", uuid.as_ref())
}
