//! CSV form of the catalog.
//!
//! Two tables: scenes (`uuid, scene_id, nre_version_string, path,
//! last_modified, artifact_repository`) and suites (`test_suite_id,
//! scene_id`). Unknown columns are ignored; `artifact_repository` may be
//! missing entirely.

use crate::error::{ErrorKind, Result};
use crate::models::{SceneRecord, SuiteMembership};
use exn::{OptionExt, ResultExt};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::Path;
use time::format_description::BorrowedFormatItem;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, UtcDateTime};

pub const SCENES_FILE_NAME: &str = "sim_scenes.csv";
pub const SUITES_FILE_NAME: &str = "sim_suites.csv";

const SPACE_SEPARATED: &[BorrowedFormatItem<'_>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second][optional [.[subsecond]]]");
const T_SEPARATED: &[BorrowedFormatItem<'_>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]");
const DATE_ONLY: &[BorrowedFormatItem<'_>] = format_description!("[year]-[month]-[day]");
const OUTPUT: &[BorrowedFormatItem<'_>] = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
const OUTPUT_SUBSECOND: &[BorrowedFormatItem<'_>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]");

/// Parse a `last_modified` cell. Naive timestamps are taken to be UTC.
pub fn parse_timestamp(value: &str) -> Option<UtcDateTime> {
    let value = value.trim();
    if let Ok(offset) = OffsetDateTime::parse(value, &Rfc3339) {
        return Some(UtcDateTime::from(offset));
    }
    [SPACE_SEPARATED, T_SEPARATED]
        .into_iter()
        .find_map(|format| PrimitiveDateTime::parse(value, format).ok())
        .or_else(|| Date::parse(value, DATE_ONLY).ok().map(Date::midnight))
        .map(|naive| UtcDateTime::from(naive.assume_utc()))
}

/// Format a timestamp the way the scan output writes it. Fractional seconds
/// are only written when present.
pub fn format_timestamp(value: UtcDateTime) -> Result<String> {
    let format = if value.nanosecond() == 0 { OUTPUT } else { OUTPUT_SUBSECOND };
    value.format(format).or_raise(|| ErrorKind::InvalidData("last modified"))
}

#[derive(Debug, Serialize, Deserialize)]
struct SceneCsvRow {
    uuid: String,
    scene_id: String,
    nre_version_string: String,
    path: String,
    last_modified: String,
    #[serde(default)]
    artifact_repository: Option<String>,
}
impl TryFrom<SceneCsvRow> for SceneRecord {
    type Error = crate::Error;
    fn try_from(row: SceneCsvRow) -> Result<Self> {
        let last_modified = parse_timestamp(&row.last_modified).ok_or_raise(|| {
            ErrorKind::Configuration(format!("invalid last_modified {:?} for artifact {}", row.last_modified, row.uuid))
        })?;
        let tag = row.artifact_repository.filter(|tag| !tag.trim().is_empty());
        Ok(SceneRecord::new(row.uuid, row.scene_id, row.nre_version_string, row.path, last_modified)
            .with_repository_tag(tag))
    }
}
impl TryFrom<&SceneRecord> for SceneCsvRow {
    type Error = crate::Error;
    fn try_from(record: &SceneRecord) -> Result<Self> {
        Ok(Self {
            uuid: record.uuid.clone(),
            scene_id: record.scene_id.clone(),
            nre_version_string: record.version.clone(),
            path: record.locator.clone(),
            last_modified: format_timestamp(record.last_modified)?,
            artifact_repository: record.repository_tag.clone(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SuiteCsvRow {
    test_suite_id: String,
    scene_id: String,
}

/// Scenes and suite memberships, as loaded into (or dumped from) a catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tables {
    pub scenes: Vec<SceneRecord>,
    pub suites: Vec<SuiteMembership>,
}

impl Tables {
    pub fn new(scenes: Vec<SceneRecord>, suites: Vec<SuiteMembership>) -> Self {
        Self { scenes, suites }
    }

    /// Read both tables from CSV files on disk.
    pub fn read_csv(scenes: impl AsRef<Path>, suites: impl AsRef<Path>) -> Result<Self> {
        let (scenes, suites) = (scenes.as_ref(), suites.as_ref());
        let open = |path: &Path| {
            std::fs::File::open(path)
                .or_raise(|| ErrorKind::Configuration(format!("unable to open catalog table {}", path.display())))
        };
        Self::from_readers(open(scenes)?, open(suites)?)
    }

    /// Read both tables from CSV-formatted readers.
    pub fn from_readers(scenes: impl Read, suites: impl Read) -> Result<Self> {
        let scenes = csv::Reader::from_reader(scenes)
            .into_deserialize::<SceneCsvRow>()
            .map(|row| {
                row.or_raise(|| ErrorKind::Configuration("malformed scenes table".to_string()))?
                    .try_into()
            })
            .collect::<Result<Vec<SceneRecord>>>()?;
        let suites = csv::Reader::from_reader(suites)
            .into_deserialize::<SuiteCsvRow>()
            .map(|row| {
                let row = row.or_raise(|| ErrorKind::Configuration("malformed suites table".to_string()))?;
                Ok(SuiteMembership::new(row.test_suite_id, row.scene_id))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { scenes, suites })
    }

    /// Write both tables as CSV files, replacing any existing ones.
    pub fn write_csv(&self, scenes: impl AsRef<Path>, suites: impl AsRef<Path>) -> Result<()> {
        let (scenes, suites) = (scenes.as_ref(), suites.as_ref());
        let create = |path: &Path| {
            std::fs::File::create(path)
                .or_raise(|| ErrorKind::Configuration(format!("unable to write catalog table {}", path.display())))
        };
        self.write_to(create(scenes)?, create(suites)?)
    }

    pub fn write_to(&self, scenes: impl Write, suites: impl Write) -> Result<()> {
        let failed = || ErrorKind::Configuration("unable to serialize catalog tables".to_string());
        let mut writer = csv::Writer::from_writer(scenes);
        for record in &self.scenes {
            writer.serialize(SceneCsvRow::try_from(record)?).or_raise(failed)?;
        }
        writer.flush().or_raise(failed)?;
        let mut writer = csv::Writer::from_writer(suites);
        for membership in &self.suites {
            let row = SuiteCsvRow {
                test_suite_id: membership.suite_id.clone(),
                scene_id: membership.scene_id.clone(),
            };
            writer.serialize(row).or_raise(failed)?;
        }
        writer.flush().or_raise(failed)?;
        Ok(())
    }
}
