//! Command-line interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::error::ConfigError;
use crate::config::{ConfigLoader, Settings};

/// Event monitoring and keyword notification backend
#[derive(Parser, Debug)]
#[command(name = "clubwatch")]
#[command(about = "Event monitoring and keyword notification backend")]
#[command(version = crate::clap_long_version())]
pub struct Cli {
    /// Path to a single TOML configuration file.
    ///
    /// When set, layered loading (default.toml / {env}.toml / local.toml)
    /// is skipped and only this file plus environment variables apply.
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server and job scheduler (the default)
    Serve {
        /// Validate configuration and exit without starting the server
        #[arg(long)]
        dry_run: bool,
    },
    /// Run pending database migrations and exit
    Migrate,
}

/// Loads settings honoring the `--config` override.
pub fn load_settings(cli: &Cli) -> Result<Settings, ConfigError> {
    match &cli.config {
        Some(path) => ConfigLoader::with_file(path.clone()).load(),
        None => ConfigLoader::new()?.load(),
    }
}
