//! PostgreSQL pool factory and migration runner for bookshelf.

use anyhow::Context;
use bookshelf_kernel::{settings::DatabaseSettings, Migration};
use sqlx::postgres::{PgPool, PgPoolOptions};

/// Open a connection pool using the configured URL and pool size.
pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<PgPool> {
    tracing::info!(
        target: "bookshelf-db",
        max_connections = settings.max_connections,
        "connecting to postgres"
    );

    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .connect(&settings.url)
        .await
        .with_context(|| "failed to connect to postgres")
}

/// Apply every migration not yet recorded in `schema_migrations`.
///
/// Each migration runs in its own transaction together with its bookkeeping
/// row, so a failure leaves earlier migrations applied and the failing one
/// absent. Returns the number of migrations applied.
pub async fn apply_migrations(
    pool: &PgPool,
    migrations: &[(String, Migration)],
) -> anyhow::Result<usize> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            module     TEXT NOT NULL,
            id         TEXT NOT NULL,
            applied_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            PRIMARY KEY (module, id)
        )
        "#,
    )
    .execute(pool)
    .await
    .with_context(|| "failed to create schema_migrations table")?;

    let mut applied = 0;
    for (module, migration) in migrations {
        let already: Option<i32> =
            sqlx::query_scalar("SELECT 1 FROM schema_migrations WHERE module = $1 AND id = $2")
                .bind(module)
                .bind(migration.id)
                .fetch_optional(pool)
                .await
                .with_context(|| format!("failed to check migration {}/{}", module, migration.id))?;

        if already.is_some() {
            tracing::debug!(target: "bookshelf-db", %module, id = migration.id, "migration already applied");
            continue;
        }

        let mut tx = pool.begin().await?;
        sqlx::raw_sql(migration.up)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("migration {}/{} failed", module, migration.id))?;
        sqlx::query("INSERT INTO schema_migrations (module, id) VALUES ($1, $2)")
            .bind(module)
            .bind(migration.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(target: "bookshelf-db", %module, id = migration.id, "migration applied");
        applied += 1;
    }

    Ok(applied)
}

#[cfg(test)]
mod tests {
    use bookshelf_kernel::settings::DatabaseSettings;

    use super::*;

    const MODULE: &str = "bookshelf-db-tests";

    async fn test_pool() -> anyhow::Result<PgPool> {
        let mut settings = DatabaseSettings::default();
        if let Ok(url) = std::env::var("DATABASE_URL") {
            settings.url = url;
        }
        connect(&settings).await
    }

    #[test_with::env(POSTGRES_TEST)]
    #[tokio::test]
    async fn second_run_applies_nothing() -> anyhow::Result<()> {
        let pool = test_pool().await?;
        apply_migrations(&pool, &[]).await?;
        sqlx::query("DELETE FROM schema_migrations WHERE module = $1")
            .bind(MODULE)
            .execute(&pool)
            .await?;

        let migrations = vec![(
            MODULE.to_string(),
            Migration {
                id: "001_marker",
                up: "CREATE TABLE IF NOT EXISTS bookshelf_db_tests_marker (id INT)",
            },
        )];

        assert_eq!(apply_migrations(&pool, &migrations).await?, 1);
        assert_eq!(apply_migrations(&pool, &migrations).await?, 0);

        let recorded: i64 =
            sqlx::query_scalar("SELECT count(*) FROM schema_migrations WHERE module = $1")
                .bind(MODULE)
                .fetch_one(&pool)
                .await?;
        assert_eq!(recorded, 1);
        Ok(())
    }
}
