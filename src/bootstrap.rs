//! Process wiring: storage selection, module lifecycle and server startup.

use std::sync::Arc;

use anyhow::Context;
use bookshelf_kernel::{
    settings::{Settings, StorageBackend},
    InitCtx, ModuleRegistry,
};
use sqlx::PgPool;

use crate::modules::{
    self,
    books::repository::{InMemoryBookRepository, PostgresBookRepository, SharedBookRepository},
};

/// Build a registry with every application module mounted on `books`.
pub fn build_registry(books: SharedBookRepository) -> anyhow::Result<ModuleRegistry> {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, books)?;
    Ok(registry)
}

/// Pick the repository for the configured backend. The pool is returned so
/// the caller can run migrations and close it on shutdown.
async fn open_repository(
    settings: &Settings,
) -> anyhow::Result<(SharedBookRepository, Option<PgPool>)> {
    match settings.database.backend {
        StorageBackend::Postgres => {
            let pool = bookshelf_db::connect(&settings.database).await?;
            let repository = Arc::new(PostgresBookRepository::new(pool.clone()));
            Ok((repository, Some(pool)))
        }
        StorageBackend::Memory => {
            tracing::warn!("using in-memory book storage; data is lost on exit");
            Ok((Arc::new(InMemoryBookRepository::new()), None))
        }
    }
}

/// Run the full lifecycle: init modules, migrate, start, serve, stop.
pub async fn serve(settings: Settings) -> anyhow::Result<()> {
    let (books, pool) = open_repository(&settings).await?;
    let registry = build_registry(books)?;
    let ctx = InitCtx {
        settings: &settings,
    };

    registry.init_all(&ctx).await?;

    if let Some(pool) = &pool {
        if settings.database.run_migrations {
            let applied =
                bookshelf_db::apply_migrations(pool, &registry.collect_migrations()).await?;
            tracing::info!(applied, "migrations complete");
        }
    }

    registry.start_all(&ctx).await?;

    let served = bookshelf_http::start_server(&registry, &settings).await;

    let stopped = registry.stop_all().await;
    if let Some(pool) = pool {
        pool.close().await;
    }

    served?;
    stopped?;
    tracing::info!("bookshelf shut down cleanly");
    Ok(())
}

/// Apply pending migrations against the configured PostgreSQL database.
pub async fn migrate(settings: &Settings) -> anyhow::Result<usize> {
    if settings.database.backend != StorageBackend::Postgres {
        anyhow::bail!("migrations require the postgres backend");
    }

    let pool = bookshelf_db::connect(&settings.database).await?;
    let registry = build_registry(Arc::new(PostgresBookRepository::new(pool.clone())))?;

    let applied = bookshelf_db::apply_migrations(&pool, &registry.collect_migrations())
        .await
        .with_context(|| "failed to apply migrations")?;
    pool.close().await;

    Ok(applied)
}

/// The merged OpenAPI document, built without touching any database.
pub fn openapi_document() -> anyhow::Result<serde_json::Value> {
    let registry = build_registry(Arc::new(InMemoryBookRepository::new()))?;
    Ok(bookshelf_http::openapi::merged_spec(&registry))
}
