use anyhow::Context;
use clap::{Parser, Subcommand};
use shelf_app::Application;
use shelf_kernel::settings::Settings;

#[derive(Debug, Parser)]
#[command(name = "shelf", version, about = "Books CRUD service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server.
    Serve {
        /// Override `server.port`.
        #[arg(long)]
        port: Option<u16>,
    },
    /// Apply pending schema migrations and exit.
    Migrate,
    /// Print the resolved configuration as JSON.
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut settings = Settings::load().context("failed to load SHELF settings")?;

    match cli.command {
        Command::Config => {
            let rendered = serde_json::to_string_pretty(&settings)
                .context("failed to render settings")?;
            println!("{rendered}");
        }
        Command::Migrate => {
            shelf_telemetry::init(&settings.telemetry)?;
            let applied = shelf_app::migrate(&settings).await?;
            println!("applied {applied} migration(s)");
        }
        Command::Serve { port } => {
            shelf_telemetry::init(&settings.telemetry)?;
            if let Some(port) = port {
                settings.server.port = port;
            }
            tracing::info!(env = ?settings.environment, "starting shelf server");
            Application::build(settings).await?.run().await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_accepts_port_override() {
        let cli = Cli::try_parse_from(["shelf", "serve", "--port", "9090"]).unwrap();
        assert!(matches!(cli.command, Command::Serve { port: Some(9090) }));
    }

    #[test]
    fn unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["shelf", "destroy"]).is_err());
    }
}
