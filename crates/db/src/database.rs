//! Connection pool management.
//!
//! File databases run in WAL mode with foreign keys enabled and a generous
//! busy timeout. In-memory databases are pinned to a single connection that
//! never expires, otherwise each pooled connection would see its own empty
//! database.

use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::ConnectOptions;

use crate::migrations::{self, Migration};
use crate::DatabaseSettings;

/// Handle to the relational store. Cheap to clone; all clones share one pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open a pool for the configured URL, creating the database file if needed.
    pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(&settings.url)
            .with_context(|| format!("invalid database url '{}'", settings.url))?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(30))
            .disable_statement_logging();

        let connected = if settings.is_in_memory() {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await
        } else {
            let options = options
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal);

            SqlitePoolOptions::new()
                .max_connections(settings.max_connections.max(1))
                .acquire_timeout(Duration::from_secs(30))
                .connect_with(options)
                .await
        };
        let pool = connected
            .with_context(|| format!("failed to connect to database '{}'", settings.url))?;

        tracing::info!(url = %settings.url, "database pool ready");

        Ok(Self { pool })
    }

    /// Open a private in-memory database.
    pub async fn in_memory() -> anyhow::Result<Self> {
        Self::connect(&DatabaseSettings::in_memory()).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Apply every migration that has not been recorded yet.
    ///
    /// Returns the number of migrations applied by this call.
    pub async fn apply_migrations(
        &self,
        migrations: &[(String, Migration)],
    ) -> anyhow::Result<usize> {
        migrations::run(&self.pool, migrations).await
    }

    /// Close the pool, waiting for checked-out connections to be returned.
    pub async fn close(self) {
        self.pool.close().await;
        tracing::info!("database pool closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_database_answers_queries() {
        let db = Database::in_memory().await.unwrap();

        let one: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(db.pool())
            .await
            .unwrap();

        assert_eq!(one, 1);
    }

    #[tokio::test]
    async fn in_memory_database_keeps_state_between_queries() {
        let db = Database::in_memory().await.unwrap();

        sqlx::query("CREATE TABLE probe (value INTEGER)")
            .execute(db.pool())
            .await
            .unwrap();
        sqlx::query("INSERT INTO probe (value) VALUES (7)")
            .execute(db.pool())
            .await
            .unwrap();

        let value: i64 = sqlx::query_scalar("SELECT value FROM probe")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn file_database_is_created_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("books.db");
        let settings = DatabaseSettings {
            url: format!("sqlite://{}", path.display()),
            max_connections: 2,
        };

        let db = Database::connect(&settings).await.unwrap();
        assert!(path.exists());
        db.close().await;
    }
}
