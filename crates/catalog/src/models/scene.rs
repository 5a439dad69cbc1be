use crate::error::{Error, ErrorKind};
use crate::models::ArtifactRepository;
use exn::ResultExt;
use time::UtcDateTime;

/// One artifact of one scene at one version.
///
/// Several records may share a `scene_id` (different versions, or re-exports
/// of the same version over time); `uuid` is unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneRecord {
    pub uuid: String,
    pub scene_id: String,
    /// Compatibility string, matched exactly against requested versions.
    pub version: String,
    /// Backend-specific path or key.
    pub locator: String,
    pub last_modified: UtcDateTime,
    /// Raw repository tag, kept as loaded. See [`SceneRecord::repository`].
    pub repository_tag: Option<String>,
}

impl SceneRecord {
    pub fn new(
        uuid: impl Into<String>,
        scene_id: impl Into<String>,
        version: impl Into<String>,
        locator: impl Into<String>,
        last_modified: UtcDateTime,
    ) -> Self {
        Self {
            uuid: uuid.into(),
            scene_id: scene_id.into(),
            version: version.into(),
            locator: locator.into(),
            last_modified,
            repository_tag: None,
        }
    }

    pub fn with_repository(mut self, repository: ArtifactRepository) -> Self {
        self.repository_tag = Some(repository.to_string());
        self
    }

    pub fn with_repository_tag(mut self, tag: Option<impl Into<String>>) -> Self {
        self.repository_tag = tag.map(Into::into);
        self
    }

    /// Repository this artifact lives in, defaulting to the object store.
    pub fn repository(&self) -> ArtifactRepository {
        ArtifactRepository::parse(self.repository_tag.as_deref()).0
    }
}

/// Membership of one scene in one suite.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SuiteMembership {
    pub suite_id: String,
    pub scene_id: String,
}

impl SuiteMembership {
    pub fn new(suite_id: impl Into<String>, scene_id: impl Into<String>) -> Self {
        Self { suite_id: suite_id.into(), scene_id: scene_id.into() }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct SceneRow {
    pub(crate) uuid: String,
    pub(crate) scene_id: String,
    pub(crate) version: String,
    pub(crate) locator: String,
    /// Unix timestamp in nanoseconds.
    pub(crate) last_modified: i64,
    pub(crate) repository: Option<String>,
}
impl TryFrom<&SceneRecord> for SceneRow {
    type Error = Error;
    fn try_from(record: &SceneRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            uuid: record.uuid.clone(),
            scene_id: record.scene_id.clone(),
            version: record.version.clone(),
            locator: record.locator.clone(),
            last_modified: i64::try_from(record.last_modified.unix_timestamp_nanos())
                .or_raise(|| ErrorKind::InvalidData("last modified"))?,
            repository: record.repository_tag.clone(),
        })
    }
}
impl TryFrom<SceneRow> for SceneRecord {
    type Error = Error;
    fn try_from(row: SceneRow) -> Result<Self, Self::Error> {
        Ok(Self {
            uuid: row.uuid,
            scene_id: row.scene_id,
            version: row.version,
            locator: row.locator,
            last_modified: UtcDateTime::from_unix_timestamp_nanos(i128::from(row.last_modified))
                .or_raise(|| ErrorKind::InvalidData("last modified"))?,
            repository_tag: row.repository,
        })
    }
}
