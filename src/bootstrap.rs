//! Application assembly: database, modules and the HTTP surface.

use std::future::Future;

use anyhow::Context;
use axum::Router;
use shelf_kernel::{settings::Settings, Database, InitCtx, ModuleRegistry};

use crate::modules;

/// A fully initialized application: modules registered and initialized,
/// migrations applied, ready to serve.
pub struct Application {
    settings: Settings,
    db: Database,
    registry: ModuleRegistry,
}

impl Application {
    /// Connect to the configured database and bring every module up.
    pub async fn build(settings: Settings) -> anyhow::Result<Self> {
        let db = Database::connect(&settings.database).await?;
        Self::with_database(settings, db).await
    }

    /// Bring every module up against an already opened database.
    pub async fn with_database(settings: Settings, db: Database) -> anyhow::Result<Self> {
        let mut registry = ModuleRegistry::new();
        modules::register_all(&mut registry)?;

        {
            let ctx = InitCtx {
                settings: &settings,
                db: &db,
            };
            registry.init_modules(&ctx).await?;
        }

        let applied = db
            .apply_migrations(&registry.collect_migrations())
            .await
            .context("failed to apply migrations")?;

        tracing::info!(
            modules = registry.len(),
            migrations_applied = applied,
            "application initialized"
        );

        Ok(Self {
            settings,
            db,
            registry,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// The complete HTTP router with every module mounted.
    pub fn router(&self) -> Router {
        shelf_http::build_router(&self.registry, &self.settings)
    }

    /// Serve until Ctrl-C or SIGTERM.
    pub async fn run(self) -> anyhow::Result<()> {
        self.run_until(shelf_http::shutdown_signal()).await
    }

    /// Start modules, serve until `shutdown` resolves, then stop modules in
    /// reverse order and close the database.
    pub async fn run_until<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let served = {
            let ctx = InitCtx {
                settings: &self.settings,
                db: &self.db,
            };
            self.registry.start_modules(&ctx).await?;
            shelf_http::start_server(self.router(), &self.settings, shutdown).await
        };

        let stopped = self.registry.stop_modules().await;
        self.db.close().await;

        served?;
        stopped
    }
}

/// Apply pending migrations without starting the server.
pub async fn migrate(settings: &Settings) -> anyhow::Result<usize> {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry)?;

    let db = Database::connect(&settings.database).await?;
    let applied = db.apply_migrations(&registry.collect_migrations()).await;
    db.close().await;

    let applied = applied.context("failed to apply migrations")?;
    tracing::info!(migrations_applied = applied, "migrations complete");
    Ok(applied)
}
