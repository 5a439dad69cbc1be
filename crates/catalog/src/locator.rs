use crate::Catalog;
use crate::catalog::json_list;
use crate::error::{ErrorKind, Result};
use crate::models::{Located, LocateRow};
use exn::ResultExt;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::instrument;

impl Catalog {
    /// Find where each artifact lives, keyed by uuid.
    ///
    /// Rows with a missing or unrecognized repository tag are located in the
    /// object store, with a warning. Asking for a uuid that isn't in the
    /// catalog at all fails with [`ErrorKind::UnknownArtifacts`].
    #[instrument(skip_all, fields(artifacts = uuids.len()))]
    pub async fn locate<S>(&self, uuids: &[S]) -> Result<BTreeMap<String, Located>>
    where
        S: AsRef<str> + Serialize,
    {
        if uuids.is_empty() {
            return Ok(BTreeMap::new());
        }
        let rows: Vec<LocateRow> = sqlx::query_as(include_str!("../queries/locate.sql"))
            .bind(json_list(uuids)?)
            .fetch_all(self.pool())
            .await
            .or_raise(|| ErrorKind::Database)?;

        let mut located = BTreeMap::new();
        for row in rows {
            let (artifact, unrecognized) = row.into_located();
            if let Some(unrecognized) = unrecognized {
                tracing::warn!(
                    uuid = %artifact.uuid,
                    tag = ?unrecognized.tag,
                    default = %artifact.repository,
                    "Unknown artifact repository, assuming the default"
                );
            }
            located.insert(artifact.uuid.clone(), artifact);
        }

        let unknown: BTreeSet<&str> =
            uuids.iter().map(AsRef::as_ref).filter(|uuid| !located.contains_key(*uuid)).collect();
        if !unknown.is_empty() {
            exn::bail!(ErrorKind::UnknownArtifacts(unknown.into_iter().map(String::from).collect()));
        }
        Ok(located)
    }
}
