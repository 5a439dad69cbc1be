//! The in-memory SQLite database behind a [`Catalog`](crate::Catalog).

use exn::ResultExt;
use sqlx::SqliteConnection;
use sqlx::pool::PoolConnectionMetadata;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::instrument;

use crate::error::{ErrorKind, Result};

/// Embedded migrations that are run automatically on connect.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Catalogs are small and never touch disk; keep sorting and lookups there too.
const CATALOG_PRAGMAS: &str = "PRAGMA temp_store = MEMORY; PRAGMA cache_size = -8192;";

/// The catalog is loaded once per manager and never written back, so there
/// is no database file: the tables are rebuilt from CSV (or a directory
/// scan) every time.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn connect_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .after_connect(|conn, meta| Box::pin(async move { Self::on_connect(conn, meta).await }))
            // Every connection to ":memory:" is its own empty database. Exactly
            // one connection, kept alive for as long as the pool.
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(SqliteConnectOptions::new().filename(":memory:"))
            .await
            .or_raise(|| ErrorKind::Database)?;
        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    async fn on_connect(conn: &mut SqliteConnection, _meta: PoolConnectionMetadata) -> sqlx::Result<()> {
        sqlx::query(CATALOG_PRAGMAS).execute(conn).await?;
        Ok(())
    }

    #[instrument("creating catalog tables", skip(self))]
    async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await.or_raise(|| ErrorKind::Migration)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the pool. With its only connection gone, the catalog is gone.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
