//! Loading the catalog.
//!
//! A [`Catalog`] is built once per manager, either from the two CSV tables or
//! by scanning a directory of archives, and is read-only afterwards. Cloning
//! is cheap: clones share the same in-memory database.

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::{SceneRow, SuiteMembership};
use crate::scan::scan_local_directory;
use crate::tables::Tables;
use exn::ResultExt;
use serde::Serialize;
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Number of rows held by a catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct Counts {
    pub scenes: i64,
    /// Distinct suites, not memberships.
    pub suites: i64,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    db: Database,
}

impl Catalog {
    /// An empty catalog. Mostly useful to [`insert`](Self::insert) into.
    pub async fn empty() -> Result<Self> {
        Ok(Self { db: Database::connect_in_memory().await? })
    }

    /// Ingest both tables as-is.
    #[instrument(skip(tables), fields(scenes = tables.scenes.len(), suites = tables.suites.len()))]
    pub async fn load_from_tables(tables: &Tables) -> Result<Self> {
        let catalog = Self::empty().await?;
        catalog.insert(tables).await?;
        Ok(catalog)
    }

    /// Read the scenes and suites tables from CSV files.
    #[instrument(skip_all, fields(scenes = %scenes.as_ref().display(), suites = %suites.as_ref().display()))]
    pub async fn load_from_csv(scenes: impl AsRef<Path>, suites: impl AsRef<Path>) -> Result<Self> {
        let (scenes, suites) = (scenes.as_ref().to_path_buf(), suites.as_ref().to_path_buf());
        let tables = tokio::task::spawn_blocking(move || Tables::read_csv(scenes, suites))
            .await
            .or_raise(|| ErrorKind::Configuration("catalog loading task failed".to_string()))??;
        Self::load_from_tables(&tables).await
    }

    /// Scan a directory of archives (see [`scan_local_directory`]), which
    /// also persists the synthesized tables into that directory.
    pub async fn load_from_directory(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let tables = tokio::task::spawn_blocking(move || scan_local_directory(&dir))
            .await
            .or_raise(|| ErrorKind::Configuration("directory scan task failed".to_string()))??;
        Self::load_from_tables(&tables).await
    }

    /// Add rows to the catalog in a single transaction.
    ///
    /// A uuid that is already present is replaced: the last load wins.
    pub async fn insert(&self, tables: &Tables) -> Result<()> {
        let mut tx = self.pool().begin().await.or_raise(|| ErrorKind::Database)?;
        for record in &tables.scenes {
            let row = SceneRow::try_from(record)?;
            sqlx::query(include_str!("../queries/insert_scene.sql"))
                .bind(row.uuid)
                .bind(row.scene_id)
                .bind(row.version)
                .bind(row.locator)
                .bind(row.last_modified)
                .bind(row.repository)
                .execute(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        for membership in &tables.suites {
            sqlx::query(include_str!("../queries/insert_suite.sql"))
                .bind(&membership.suite_id)
                .bind(&membership.scene_id)
                .execute(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    pub async fn counts(&self) -> Result<Counts> {
        sqlx::query_as(include_str!("../queries/count.sql"))
            .fetch_one(self.pool())
            .await
            .or_raise(|| ErrorKind::Database)
    }

    /// Dump every row back out, e.g. to persist a merged catalog.
    pub async fn tables(&self) -> Result<Tables> {
        let scenes: Vec<SceneRow> = sqlx::query_as("SELECT * FROM scenes ORDER BY uuid")
            .fetch_all(self.pool())
            .await
            .or_raise(|| ErrorKind::Database)?;
        let suites: Vec<(String, String)> =
            sqlx::query_as("SELECT suite_id, scene_id FROM suites ORDER BY suite_id, scene_id")
                .fetch_all(self.pool())
                .await
                .or_raise(|| ErrorKind::Database)?;
        Ok(Tables::new(
            scenes.into_iter().map(TryInto::try_into).collect::<Result<_>>()?,
            suites.into_iter().map(|(suite_id, scene_id)| SuiteMembership::new(suite_id, scene_id)).collect(),
        ))
    }

    /// Discard the catalog. Every clone becomes unusable.
    pub async fn close(&self) {
        self.db.close().await;
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        self.db.pool()
    }
}

/// Bind a list of strings as a single JSON array parameter, for use with
/// `json_each(?)`. SQLite has no array binding.
pub(crate) fn json_list<S: AsRef<str> + Serialize>(items: &[S]) -> Result<String> {
    serde_json::to_string(items).or_raise(|| ErrorKind::InvalidData("query parameter list"))
}
