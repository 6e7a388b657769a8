use anyhow::Context;
use shelf_app::Application;
use shelf_kernel::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load SHELF settings")?;
    shelf_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        db = %settings.database.url,
        "shelf-app bootstrap starting"
    );

    let app = Application::build(settings).await?;
    tracing::info!(
        address = %app.settings().server.bind_address(),
        "shelf-app ready"
    );
    app.run().await
}
