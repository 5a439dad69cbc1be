use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read, Seek, Write};
use std::path::Path;
use tracing::instrument;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Name of the manifest entry at the root of every scene archive.
pub const MANIFEST_NAME: &str = "metadata.yaml";

/// The identity an archive claims for itself.
///
/// Only the fields needed to catalog an artifact are modelled; anything else
/// in `metadata.yaml` (camera rigs, calibration, ...) is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub uuid: String,
    pub scene_id: String,
    /// Engine version string the artifact is compatible with.
    #[serde(rename = "version_string")]
    pub version: String,
}

/// Just the uuid, for checks that must not depend on the rest of the manifest.
#[derive(Deserialize)]
struct Identity {
    uuid: String,
}

fn parse_manifest<T: DeserializeOwned, R: Read + Seek>(reader: R) -> Result<T> {
    let mut archive = ZipArchive::new(reader).or_raise(|| ErrorKind::InvalidContainer)?;
    let mut entry = match archive.by_name(MANIFEST_NAME) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => exn::bail!(ErrorKind::MissingManifest),
        Err(err) => return Err(err).or_raise(|| ErrorKind::InvalidContainer),
    };
    let mut yaml = String::new();
    entry.read_to_string(&mut yaml).or_raise(|| ErrorKind::InvalidManifest)?;
    serde_yaml::from_str(&yaml).or_raise(|| ErrorKind::InvalidManifest)
}

fn open_and_parse<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path)
        .or_raise(|| ErrorKind::Io)
        .or_raise(|| ErrorKind::Unreadable(path.to_path_buf()))?;
    parse_manifest(BufReader::new(file)).or_raise(|| ErrorKind::Unreadable(path.to_path_buf()))
}

impl Manifest {
    pub fn new(uuid: impl Into<String>, scene_id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            scene_id: scene_id.into(),
            version: version.into(),
        }
    }

    /// Read the manifest out of an archive held by any seekable reader.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        parse_manifest(reader)
    }

    /// Write a minimal archive containing only this manifest.
    ///
    /// Real artifacts carry much more than the manifest, but nothing in this
    /// workspace looks past it. Do NOT apply `#[cfg(test)]` so that other
    /// crates can build fixtures with it.
    pub fn write_archive<W: Write + Seek>(&self, writer: W) -> Result<W> {
        let yaml = serde_yaml::to_string(self).or_raise(|| ErrorKind::InvalidManifest)?;
        let mut zip = ZipWriter::new(writer);
        // USDZ requires stored (uncompressed) entries.
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        zip.start_file(MANIFEST_NAME, options).or_raise(|| ErrorKind::Io)?;
        zip.write_all(yaml.as_bytes()).or_raise(|| ErrorKind::Io)?;
        zip.finish().or_raise(|| ErrorKind::Io)
    }
}

/// Open the archive at `path` and read its manifest.
#[instrument(level = "debug")]
pub fn read_manifest(path: &Path) -> Result<Manifest> {
    open_and_parse(path)
}

/// Open the archive at `path` and read only the uuid its manifest claims.
///
/// Succeeds for manifests that are otherwise incomplete.
#[instrument(level = "debug")]
pub fn read_manifest_uuid(path: &Path) -> Result<String> {
    open_and_parse::<Identity>(path).map(|identity| identity.uuid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn archive_with(entries: &[(&str, &str)]) -> Cursor<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, body) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        let mut cursor = zip.finish().unwrap();
        cursor.set_position(0);
        cursor
    }

    #[test]
    fn test_read_manifest_ignores_extra_fields() {
        let yaml = "uuid: 3f2a\nscene_id: clipgt-01\nversion_string: '25.1'\nrig: front-wide\n";
        let manifest = Manifest::from_reader(archive_with(&[("scene.usda", "#usda 1.0"), (MANIFEST_NAME, yaml)])).unwrap();
        assert_eq!(manifest, Manifest::new("3f2a", "clipgt-01", "25.1"));
    }

    #[test]
    fn test_missing_manifest() {
        let err = Manifest::from_reader(archive_with(&[("scene.usda", "#usda 1.0")])).unwrap_err();
        assert_eq!(*err, ErrorKind::MissingManifest);
    }

    #[test]
    fn test_missing_required_field() {
        let err = Manifest::from_reader(archive_with(&[(MANIFEST_NAME, "uuid: 3f2a\nscene_id: clipgt-01\n")])).unwrap_err();
        assert_eq!(*err, ErrorKind::InvalidManifest);
    }

    #[test]
    fn test_not_a_zip() {
        let err = Manifest::from_reader(Cursor::new(b"definitely not a zip file".to_vec())).unwrap_err();
        assert_eq!(*err, ErrorKind::InvalidContainer);
    }

    #[test]
    fn test_written_archive_is_readable() {
        let manifest = Manifest::new("0b9e", "clipgt-02", "25.2");
        let mut cursor = manifest.write_archive(Cursor::new(Vec::new())).unwrap();
        cursor.set_position(0);
        assert_eq!(Manifest::from_reader(cursor).unwrap(), manifest);
    }

    #[test]
    fn test_read_manifest_from_disk() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("clip.usdz");
        let manifest = Manifest::new("77aa", "clipgt-03", "25.1");
        manifest.write_archive(File::create(&path).unwrap()).unwrap();
        assert_eq!(read_manifest(&path).unwrap(), manifest);
        let err = read_manifest(&temp_dir.path().join("missing.usdz")).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Unreadable(_)));
    }

    #[test]
    fn test_uuid_read_tolerates_incomplete_manifest() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("clip.usdz");
        std::fs::write(&path, archive_with(&[(MANIFEST_NAME, "uuid: 3f2a\nscene_id: clipgt-01\n")]).into_inner()).unwrap();
        assert_eq!(read_manifest_uuid(&path).unwrap(), "3f2a");
        assert!(read_manifest(&path).is_err());

        std::fs::write(&path, archive_with(&[(MANIFEST_NAME, "scene_id: clipgt-01\n")]).into_inner()).unwrap();
        let err = read_manifest_uuid(&path).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Unreadable(_)));
    }
}
