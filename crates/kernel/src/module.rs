use async_trait::async_trait;
use axum::Router;
use shelf_db::{Database, Migration};

/// Shared handles a module receives while it is brought up.
pub struct InitCtx<'a> {
    pub settings: &'a crate::settings::Settings,
    pub db: &'a Database,
}

/// A feature slice of the service: its routes, schema and lifecycle hooks.
///
/// Lifecycle order driven by [`crate::ModuleRegistry`]:
/// `init` → migrations → `start` → serving → `stop`.
#[async_trait]
pub trait Module: Sync + Send {
    /// Unique module name; the HTTP router nests the module under `/{name}`.
    fn name(&self) -> &'static str;

    /// Build long-lived collaborators (repositories, services) from the context.
    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Routes relative to the module mount point.
    fn routes(&self) -> Router {
        Router::new()
    }

    /// OpenAPI fragment (`paths` and `components.schemas`) with paths relative
    /// to the mount point.
    fn openapi(&self) -> Option<serde_json::Value> {
        None
    }

    /// Schema migrations owned by this module, in application order.
    fn migrations(&self) -> Vec<Migration> {
        vec![]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
