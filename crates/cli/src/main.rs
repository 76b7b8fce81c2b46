use anyhow::Context;
use bookshelf_kernel::settings::Settings;
use clap::{Parser, Subcommand};

/// Operator entrypoint for the bookshelf service
#[derive(Debug, Parser)]
#[command(name = "bookshelf", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve,
    /// Apply pending database migrations and exit
    Migrate,
    /// Print the OpenAPI document as JSON
    Openapi,
}

fn load_settings() -> anyhow::Result<Settings> {
    let settings = Settings::load().with_context(|| "failed to load bookshelf settings")?;
    bookshelf_telemetry::init(&settings.telemetry)?;
    Ok(settings)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve => {
            let settings = load_settings()?;
            tracing::info!(env = ?settings.environment, "bookshelf serve");
            bookshelf_app::serve(settings).await
        }
        Command::Migrate => {
            let settings = load_settings()?;
            let applied = bookshelf_app::migrate(&settings).await?;
            tracing::info!(applied, "bookshelf migrate finished");
            Ok(())
        }
        Command::Openapi => {
            let spec = bookshelf_app::openapi_document()?;
            println!("{}", serde_json::to_string_pretty(&spec)?);
            Ok(())
        }
    }
}
