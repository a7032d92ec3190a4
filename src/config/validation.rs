//! Cross-field validation for loaded settings.

use crate::config::error::ConfigError;
use crate::config::settings::Settings;

impl Settings {
    /// Validates the loaded settings as a whole.
    ///
    /// Field-level defaults are handled by serde; this checks the
    /// cross-field requirements that only make sense on the final merged
    /// configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.is_empty() {
            return Err(ConfigError::validation(
                "database.url",
                "Database URL cannot be empty",
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::validation(
                "database.min_connections",
                "min_connections cannot exceed max_connections",
            ));
        }

        if self.jobs.enabled {
            if self.collector.source_url.is_empty() {
                return Err(ConfigError::validation(
                    "collector.source_url",
                    "Event feed URL is required when jobs are enabled",
                ));
            }
            if self.jobs.collector_interval_hours == 0 || self.jobs.dispatch_interval_hours == 0 {
                return Err(ConfigError::validation(
                    "jobs",
                    "Job intervals must be at least one hour",
                ));
            }
            if self.jobs.failure_threshold == 0 {
                return Err(ConfigError::validation(
                    "jobs.failure_threshold",
                    "Failure threshold must be at least 1",
                ));
            }
            if self.jobs.unprocessed_page_size <= 0 {
                return Err(ConfigError::validation(
                    "jobs.unprocessed_page_size",
                    "Page size must be positive",
                ));
            }
        }

        if self.notifications.ops.enabled {
            if self.notifications.ops.destination_address.is_empty() {
                return Err(ConfigError::validation(
                    "notifications.ops.destination_address",
                    "Ops alert destination is required when ops alerts are enabled",
                ));
            }
            match self.notifications.ops.channel.as_str() {
                "email" | "webhook" => {}
                other => {
                    return Err(ConfigError::ValidationError {
                        field: "notifications.ops.channel".to_string(),
                        message: format!(
                            "Unknown alert channel '{}'. Valid channels are: email, webhook",
                            other
                        ),
                    });
                }
            }
        }

        Ok(())
    }
}
