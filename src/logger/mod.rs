//! Logging initialization built on tracing-subscriber.
//!
//! Builds a console layer and an optional file layer from `LoggerSettings`.
//! The `RUST_LOG` environment variable, when set, overrides the configured
//! level filter.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::config::error::ConfigError;
use crate::config::settings::LoggerSettings;

/// Initializes the global tracing subscriber from logger settings.
///
/// # Errors
///
/// - Invalid level or file format string
/// - Log file cannot be opened
/// - A global subscriber was already installed
pub fn init(settings: &LoggerSettings) -> Result<(), ConfigError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .map_err(|e| ConfigError::ValidationError {
            field: "logger.level".to_string(),
            message: format!("Invalid log level '{}': {}", settings.level, e),
        })?;

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    if settings.console.enabled {
        layers.push(
            fmt::layer()
                .with_ansi(settings.console.colored)
                .boxed(),
        );
    }

    if settings.file.enabled {
        layers.push(file_layer(settings)?);
    }

    if layers.is_empty() {
        return Err(ConfigError::validation(
            "logger",
            "At least one of console or file output must be enabled",
        ));
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| ConfigError::ValidationError {
            field: "logger".to_string(),
            message: format!("Failed to install subscriber: {}", e),
        })
}

fn file_layer(settings: &LoggerSettings) -> Result<Box<dyn Layer<Registry> + Send + Sync>, ConfigError> {
    let path = Path::new(&settings.file.path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::ValidationError {
            field: "logger.file.path".to_string(),
            message: format!("Cannot create log directory: {}", e),
        })?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| ConfigError::ValidationError {
            field: "logger.file.path".to_string(),
            message: format!("Cannot open log file '{}': {}", settings.file.path, e),
        })?;
    let writer = Arc::new(file);

    let layer = match settings.file.format.to_lowercase().as_str() {
        "json" => fmt::layer()
            .json()
            .with_writer(writer)
            .with_ansi(false)
            .boxed(),
        "compact" => fmt::layer()
            .compact()
            .with_writer(writer)
            .with_ansi(false)
            .boxed(),
        "full" => fmt::layer().with_writer(writer).with_ansi(false).boxed(),
        other => {
            return Err(ConfigError::ValidationError {
                field: "logger.file.format".to_string(),
                message: format!(
                    "Invalid log format '{}'. Valid formats are: full, compact, json",
                    other
                ),
            });
        }
    };

    Ok(layer)
}
