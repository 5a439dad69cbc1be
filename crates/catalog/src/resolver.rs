//! Which artifacts satisfy a scene or suite request.

use crate::Catalog;
use crate::catalog::json_list;
use crate::error::{ErrorKind, QueryError, Result};
use crate::models::{MatchRow, ResolvedPair};
use exn::ResultExt;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::instrument;

fn to_strings<S: AsRef<str>>(items: &[S]) -> Vec<String> {
    items.iter().map(|item| item.as_ref().to_string()).collect()
}

/// Keep one artifact per scene: the most recently modified one, with ties
/// going to the smallest uuid. Rows without an artifact are ignored.
///
/// The result is ordered by scene id, and doesn't depend on row order.
pub(crate) fn deduplicate(rows: impl IntoIterator<Item = MatchRow>) -> Vec<ResolvedPair> {
    let mut best: BTreeMap<String, (i64, String)> = BTreeMap::new();
    for row in rows {
        let (Some(uuid), Some(last_modified)) = (row.uuid, row.last_modified) else {
            continue;
        };
        best.entry(row.scene_id)
            .and_modify(|current| {
                let (current_modified, current_uuid) = &*current;
                if last_modified > *current_modified
                    || (last_modified == *current_modified && uuid < *current_uuid)
                {
                    *current = (last_modified, uuid.clone());
                }
            })
            .or_insert_with(|| (last_modified, uuid.clone()));
    }
    best.into_iter().map(|(scene_id, (_, uuid))| ResolvedPair { scene_id, uuid }).collect()
}

impl Catalog {
    /// Resolve each requested scene id to one compatible artifact.
    ///
    /// An empty request resolves to nothing. Otherwise every id must have at
    /// least one artifact whose version is in `versions`; if any don't, the
    /// whole request fails with [`QueryError::MissingScenes`] listing all of
    /// them.
    #[instrument(skip_all, fields(scenes = scene_ids.len(), versions = ?to_strings(versions)))]
    pub async fn query_by_ids<S, V>(&self, scene_ids: &[S], versions: &[V]) -> Result<Vec<ResolvedPair>>
    where
        S: AsRef<str> + Serialize,
        V: AsRef<str> + Serialize,
    {
        if scene_ids.is_empty() {
            return Ok(Vec::new());
        }
        if versions.is_empty() {
            exn::bail!(ErrorKind::NoVersions);
        }
        let rows: Vec<MatchRow> = sqlx::query_as(include_str!("../queries/match_scene_ids.sql"))
            .bind(json_list(scene_ids)?)
            .bind(json_list(versions)?)
            .fetch_all(self.pool())
            .await
            .or_raise(|| ErrorKind::Database)?;

        let found: BTreeSet<&str> = rows.iter().map(|row| row.scene_id.as_str()).collect();
        let missing: BTreeSet<&str> =
            scene_ids.iter().map(AsRef::as_ref).filter(|id| !found.contains(id)).collect();
        if !missing.is_empty() {
            exn::bail!(ErrorKind::Query(QueryError::MissingScenes {
                missing: missing.into_iter().map(String::from).collect(),
                versions: to_strings(versions),
            }));
        }

        let resolved = deduplicate(rows);
        for pair in &resolved {
            tracing::debug!(scene_id = %pair.scene_id, uuid = %pair.uuid, "Resolved scene");
        }
        tracing::info!(count = resolved.len(), "Resolved scenes by id");
        Ok(resolved)
    }

    /// Resolve every member of a suite to one compatible artifact.
    ///
    /// All or nothing: an unknown (or empty) suite fails with
    /// [`QueryError::EmptySuite`], and a suite with any member lacking a
    /// compatible artifact fails with [`QueryError::IncompleteSuite`]
    /// listing every such member.
    #[instrument(skip_all, fields(suite = suite_id.as_ref(), versions = ?to_strings(versions)))]
    pub async fn query_by_suite<V>(&self, suite_id: impl AsRef<str>, versions: &[V]) -> Result<Vec<ResolvedPair>>
    where
        V: AsRef<str> + Serialize,
    {
        let suite_id = suite_id.as_ref();
        if versions.is_empty() {
            exn::bail!(ErrorKind::NoVersions);
        }
        let rows: Vec<MatchRow> = sqlx::query_as(include_str!("../queries/match_suite.sql"))
            .bind(suite_id)
            .bind(json_list(versions)?)
            .fetch_all(self.pool())
            .await
            .or_raise(|| ErrorKind::Database)?;

        if rows.is_empty() {
            exn::bail!(ErrorKind::Query(QueryError::EmptySuite { suite_id: suite_id.to_string() }));
        }
        let missing: BTreeSet<&str> =
            rows.iter().filter(|row| row.uuid.is_none()).map(|row| row.scene_id.as_str()).collect();
        if !missing.is_empty() {
            exn::bail!(ErrorKind::Query(QueryError::IncompleteSuite {
                suite_id: suite_id.to_string(),
                missing: missing.into_iter().map(String::from).collect(),
                versions: to_strings(versions),
            }));
        }

        let resolved = deduplicate(rows);
        tracing::info!(count = resolved.len(), "Resolved suite");
        Ok(resolved)
    }
}
