use crate::models::{ArtifactRepository, UnrecognizedRepository};

/// A requested scene and the artifact chosen to satisfy it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResolvedPair {
    pub scene_id: String,
    pub uuid: String,
}

impl ResolvedPair {
    pub fn new(scene_id: impl Into<String>, uuid: impl Into<String>) -> Self {
        Self { scene_id: scene_id.into(), uuid: uuid.into() }
    }
}

/// Where an artifact's bytes live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    pub uuid: String,
    pub locator: String,
    pub repository: ArtifactRepository,
}

/// A candidate artifact for a scene; `uuid` is `None` for suite members with
/// no compatible artifact.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct MatchRow {
    pub(crate) scene_id: String,
    pub(crate) uuid: Option<String>,
    pub(crate) last_modified: Option<i64>,
}

#[derive(sqlx::FromRow)]
pub(crate) struct LocateRow {
    pub(crate) uuid: String,
    pub(crate) locator: String,
    pub(crate) repository: Option<String>,
}
impl LocateRow {
    /// Resolve the raw tag, handing back the unrecognized tag (if any).
    pub(crate) fn into_located(self) -> (Located, Option<UnrecognizedRepository>) {
        let (repository, unrecognized) = ArtifactRepository::parse(self.repository.as_deref());
        (Located { uuid: self.uuid, locator: self.locator, repository }, unrecognized)
    }
}
