//! Synthesize catalog tables from a directory of scene archives.

use crate::error::{ErrorKind, Result};
use crate::models::{ArtifactRepository, SceneRecord, SuiteMembership};
use crate::tables::{SCENES_FILE_NAME, SUITES_FILE_NAME, Tables};
use exn::OptionExt;
use sceneset_archive::{ARCHIVE_EXTENSION, read_manifest};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use time::UtcDateTime;
use tracing::instrument;
use walkdir::WalkDir;

/// Every scanned scene is a member of this suite.
pub const LOCAL_SUITE_ID: &str = "local";

fn is_archive(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == ARCHIVE_EXTENSION)
}

fn find_archives(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::warn!(error = %err, "Skipping unreadable directory entry");
                None
            },
        })
        // Symlinks are skipped: a cache rooted here holds nothing but links
        // back to these archives.
        .filter(|entry| entry.file_type().is_file() && is_archive(entry.path()))
        .map(|entry| entry.into_path())
        .collect()
}

/// Scan `dir` recursively for `*.usdz` archives and build catalog tables
/// from their manifests.
///
/// Each valid archive becomes one scene row (repository `local`, locator the
/// absolute archive path) and one membership of the [`LOCAL_SUITE_ID`]
/// suite. Archives without a readable manifest are skipped with a warning.
/// The resulting tables are written next to the archives as
/// `sim_scenes.csv` and `sim_suites.csv` so they can be reloaded without
/// rescanning.
///
/// Fails with [`ErrorKind::Configuration`] if the directory doesn't exist or
/// no valid archive was found.
#[instrument(skip(dir), fields(dir = %dir.display()))]
pub fn scan_local_directory(dir: &Path) -> Result<Tables> {
    if !dir.is_dir() {
        exn::bail!(ErrorKind::Configuration(format!("local archive directory does not exist: {}", dir.display())));
    }
    let archives = find_archives(dir);
    if archives.is_empty() {
        exn::bail!(ErrorKind::Configuration(format!("no *.{ARCHIVE_EXTENSION} files found in {}", dir.display())));
    }
    tracing::info!(count = archives.len(), "Scanning local archives");

    let now = UtcDateTime::now();
    let mut tables = Tables::default();
    let mut members = HashSet::new();
    for archive in archives {
        let manifest = match read_manifest(&archive) {
            Ok(manifest) => manifest,
            Err(err) => {
                tracing::warn!(path = %archive.display(), error = ?err, "Failed to read archive metadata");
                continue;
            },
        };
        let locator = std::path::absolute(&archive)
            .ok()
            .and_then(|path| path.to_str().map(String::from))
            .ok_or_raise(|| ErrorKind::InvalidData("archive path"))?;
        if members.insert(manifest.scene_id.clone()) {
            tables.suites.push(SuiteMembership::new(LOCAL_SUITE_ID, &manifest.scene_id));
        }
        tables.scenes.push(
            SceneRecord::new(manifest.uuid, manifest.scene_id, manifest.version, locator, now)
                .with_repository(ArtifactRepository::Local),
        );
    }
    if tables.scenes.is_empty() {
        exn::bail!(ErrorKind::Configuration(format!(
            "no valid *.{ARCHIVE_EXTENSION} files with metadata found in {}",
            dir.display()
        )));
    }

    tables.write_csv(dir.join(SCENES_FILE_NAME), dir.join(SUITES_FILE_NAME))?;
    tracing::info!(
        scenes = tables.scenes.len(),
        suite = LOCAL_SUITE_ID,
        "Generated {SCENES_FILE_NAME} and {SUITES_FILE_NAME}"
    );
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sceneset_archive::Manifest;
    use std::fs::File;

    fn write_archive(path: &Path, uuid: &str, scene_id: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        Manifest::new(uuid, scene_id, "25.1").write_archive(File::create(path).unwrap()).unwrap();
    }

    #[test]
    fn test_scan_builds_and_persists_tables() {
        let temp_dir = tempfile::tempdir().unwrap();
        write_archive(&temp_dir.path().join("a.usdz"), "uuid-a", "clipgt-a");
        write_archive(&temp_dir.path().join("nested/deeper/b.usdz"), "uuid-b", "clipgt-b");
        std::fs::write(temp_dir.path().join("broken.usdz"), b"not a zip").unwrap();
        std::fs::write(temp_dir.path().join("notes.txt"), b"ignored").unwrap();

        let tables = scan_local_directory(temp_dir.path()).unwrap();
        assert_eq!(tables.scenes.len(), 2);
        assert_eq!(tables.scenes[0].uuid, "uuid-a");
        assert_eq!(tables.scenes[0].repository(), ArtifactRepository::Local);
        assert!(Path::new(&tables.scenes[1].locator).is_absolute());
        assert!(tables.scenes[1].locator.ends_with("nested/deeper/b.usdz"));
        assert_eq!(
            tables.suites,
            [SuiteMembership::new(LOCAL_SUITE_ID, "clipgt-a"), SuiteMembership::new(LOCAL_SUITE_ID, "clipgt-b")]
        );

        let persisted = Tables::read_csv(
            temp_dir.path().join(SCENES_FILE_NAME),
            temp_dir.path().join(SUITES_FILE_NAME),
        )
        .unwrap();
        assert_eq!(persisted, tables);
    }

    #[test]
    fn test_scan_missing_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let err = scan_local_directory(&temp_dir.path().join("nope")).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Configuration(msg) if msg.contains("does not exist")));
    }

    #[test]
    fn test_scan_without_archives() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::write(temp_dir.path().join("readme.md"), b"").unwrap();
        let err = scan_local_directory(temp_dir.path()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Configuration(msg) if msg.contains("no *.usdz files")));
    }

    #[test]
    fn test_scan_only_invalid_archives() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::write(temp_dir.path().join("broken.usdz"), b"garbage").unwrap();
        let err = scan_local_directory(temp_dir.path()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Configuration(msg) if msg.contains("no valid")));
        assert!(!temp_dir.path().join(SCENES_FILE_NAME).exists());
    }
}
