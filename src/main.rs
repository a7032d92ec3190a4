use clap::Parser;

use clubwatch::cli::{self, Cli, Commands};
use clubwatch::db::run_pending_migrations;
use clubwatch::logger;
use clubwatch::server::Server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let settings = cli::load_settings(&args)
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    logger::init(&settings.logger)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    match args.command.unwrap_or(Commands::Serve { dry_run: false }) {
        Commands::Serve { dry_run: true } => {
            // Settings are fully validated during loading.
            println!("Configuration is valid");
            println!("Server would bind to: {}", settings.server.address());
            println!(
                "Job scheduling: {}",
                if settings.jobs.enabled { "enabled" } else { "disabled" }
            );
            Ok(())
        }
        Commands::Serve { dry_run: false } => Server::new(settings).run().await,
        Commands::Migrate => {
            let applied = run_pending_migrations(&settings.database).await?;
            println!("Applied {} pending migration(s)", applied);
            Ok(())
        }
    }
}
