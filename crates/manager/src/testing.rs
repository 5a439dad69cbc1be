//! Fixtures shared by the manager's tests.

use sceneset_archive::Manifest;
use sceneset_catalog::{ArtifactRepository, Catalog, SceneRecord, SuiteMembership, Tables};
use std::io::Cursor;
use time::macros::utc_datetime;

pub(crate) const VERSION: &str = "25.1";

/// A minimal, valid archive for this artifact.
pub(crate) fn archive_bytes(uuid: &str, scene_id: &str) -> Vec<u8> {
    Manifest::new(uuid, scene_id, VERSION).write_archive(Cursor::new(Vec::new())).unwrap().into_inner()
}

pub(crate) fn scene(uuid: &str, scene_id: &str, locator: &str, repository: ArtifactRepository) -> SceneRecord {
    SceneRecord::new(uuid, scene_id, VERSION, locator, utc_datetime!(2025-01-01 00:00:00)).with_repository(repository)
}

/// Catalog holding `scenes`, all of them members of the `all` suite.
pub(crate) async fn catalog_with(scenes: Vec<SceneRecord>) -> Catalog {
    let suites = scenes.iter().map(|record| SuiteMembership::new("all", &record.scene_id)).collect();
    Catalog::load_from_tables(&Tables::new(scenes, suites)).await.unwrap()
}
