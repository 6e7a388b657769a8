//! Runtime schema migrations.
//!
//! Modules contribute plain SQL migrations. Applied migrations are recorded in
//! `_migrations`, keyed by owning module and migration id, so running the same
//! set twice is a no-op.

use anyhow::Context;
use sqlx::SqlitePool;

/// Migration definition contributed by a module
#[derive(Debug, Clone)]
pub struct Migration {
    pub id: &'static str,
    pub up: &'static str,
}

pub(crate) async fn run(
    pool: &SqlitePool,
    migrations: &[(String, Migration)],
) -> anyhow::Result<usize> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS _migrations (
            module TEXT NOT NULL,
            id TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (module, id)
        )
        "#,
    )
    .execute(pool)
    .await
    .context("failed to create migration tracking table")?;

    let mut applied = 0;

    for (module, migration) in migrations {
        let recorded: Option<String> =
            sqlx::query_scalar("SELECT id FROM _migrations WHERE module = ? AND id = ?")
                .bind(module)
                .bind(migration.id)
                .fetch_optional(pool)
                .await
                .with_context(|| format!("failed to read migration state for '{module}'"))?;

        if recorded.is_some() {
            tracing::debug!(module = %module, migration = migration.id, "migration already applied");
            continue;
        }

        let mut tx = pool.begin().await?;

        sqlx::raw_sql(migration.up)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("migration '{}/{}' failed", module, migration.id))?;

        sqlx::query("INSERT INTO _migrations (module, id) VALUES (?, ?)")
            .bind(module)
            .bind(migration.id)
            .execute(&mut *tx)
            .await?;

        tx.commit()
            .await
            .with_context(|| format!("failed to commit migration '{}/{}'", module, migration.id))?;

        tracing::info!(module = %module, migration = migration.id, "migration applied");
        applied += 1;
    }

    Ok(applied)
}
