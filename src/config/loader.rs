//! Configuration loader for clubwatch
//!
//! Loads configuration from layered TOML files plus environment variable
//! overrides, in the priority order documented in the module root.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};

use crate::config::environment::Environment as AppEnvironment;
use crate::config::error::ConfigError;
use crate::config::settings::Settings;

/// Environment variable for configuration directory
const CONFIG_DIR_ENV: &str = "CLUBWATCH_CONFIG_DIR";

/// Environment variable for specific configuration file
const CONFIG_FILE_ENV: &str = "CLUBWATCH_CONFIG_FILE";

/// Default configuration directory
const DEFAULT_CONFIG_DIR: &str = "config";

/// Environment variable prefix for configuration overrides
const ENV_PREFIX: &str = "CLUBWATCH";

/// Separator for nested configuration keys in environment variables
const ENV_SEPARATOR: &str = "__";

/// Configuration loader that handles layered configuration loading
///
/// Sources in order of priority:
/// 1. `default.toml` - base defaults (required)
/// 2. `{environment}.toml` - environment-specific overrides (optional)
/// 3. `local.toml` - local development overrides (optional)
/// 4. `CLUBWATCH_*` environment variables (highest priority)
#[derive(Debug)]
pub struct ConfigLoader {
    /// Configuration directory path
    config_dir: PathBuf,
    /// Specific configuration file path (if set, skips layered loading)
    config_file: Option<PathBuf>,
    /// Current application environment
    environment: AppEnvironment,
}

impl ConfigLoader {
    /// Create a new configuration loader from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if both `CLUBWATCH_CONFIG_DIR` and
    /// `CLUBWATCH_CONFIG_FILE` are set, as they are mutually exclusive.
    pub fn new() -> Result<Self, ConfigError> {
        let config_dir = std::env::var(CONFIG_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_DIR));

        let config_file = std::env::var(CONFIG_FILE_ENV).ok().map(PathBuf::from);

        if config_file.is_some() && std::env::var(CONFIG_DIR_ENV).is_ok() {
            return Err(ConfigError::mutual_exclusivity(
                "CLUBWATCH_CONFIG_DIR and CLUBWATCH_CONFIG_FILE cannot both be set. \
                 Use CLUBWATCH_CONFIG_DIR for layered configuration or \
                 CLUBWATCH_CONFIG_FILE for a single configuration file.",
            ));
        }

        let environment = AppEnvironment::from_env();

        Ok(Self {
            config_dir,
            config_file,
            environment,
        })
    }

    /// Create a loader pinned to a single configuration file, bypassing
    /// layered loading. Used by the CLI `--config` flag.
    pub fn with_file(path: PathBuf) -> Self {
        Self {
            config_dir: PathBuf::from(DEFAULT_CONFIG_DIR),
            config_file: Some(path),
            environment: AppEnvironment::from_env(),
        }
    }

    /// Load configuration from all sources and validate the result.
    ///
    /// # Errors
    ///
    /// Returns an error if `default.toml` is missing (layered mode), parsing
    /// fails, or cross-field validation fails.
    pub fn load(&self) -> Result<Settings, ConfigError> {
        let config = self.build_config()?;
        let settings: Settings = config.try_deserialize().map_err(|e| {
            ConfigError::ParseError(format!("Failed to deserialize configuration: {}", e))
        })?;

        settings.validate()?;

        Ok(settings)
    }

    fn build_config(&self) -> Result<Config, ConfigError> {
        let builder = Config::builder();

        let builder = if let Some(ref config_file) = self.config_file {
            self.add_file_source(builder, config_file, true)?
        } else {
            self.build_layered_config(builder)?
        };

        // Environment variables are always highest priority:
        // CLUBWATCH_SERVER__PORT -> server.port
        let builder = Self::add_env_source(builder);

        builder.build().map_err(ConfigError::from)
    }

    fn build_layered_config(
        &self,
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        let default_path = self.config_dir.join("default.toml");
        let builder = self.add_file_source(builder, &default_path, true)?;

        let env_path = self
            .config_dir
            .join(format!("{}.toml", self.environment.as_str()));
        let builder = self.add_file_source(builder, &env_path, false)?;

        let local_path = self.config_dir.join("local.toml");
        let builder = self.add_file_source(builder, &local_path, false)?;

        Ok(builder)
    }

    fn add_file_source(
        &self,
        builder: config::ConfigBuilder<config::builder::DefaultState>,
        path: &Path,
        required: bool,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        if required && !path.exists() {
            return Err(ConfigError::file_not_found(format!(
                "Required configuration file not found: {}",
                path.display()
            )));
        }

        Ok(builder.add_source(
            File::new(path.to_str().unwrap_or_default(), FileFormat::Toml).required(required),
        ))
    }

    fn add_env_source(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> config::ConfigBuilder<config::builder::DefaultState> {
        builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator(ENV_SEPARATOR)
                .ignore_empty(true)
                .try_parsing(true),
        )
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new().unwrap_or_else(|_| Self {
            config_dir: PathBuf::from(DEFAULT_CONFIG_DIR),
            config_file: None,
            environment: AppEnvironment::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Env-var manipulation is process-global; serialize these tests.
    static TEST_MUTEX: Mutex<()> = Mutex::new(());

    const BASE_CONFIG: &str = r#"
[database]
url = "postgres://localhost/clubwatch"

[jobs]
enabled = true
collector_interval_hours = 1
dispatch_interval_hours = 1

[collector]
source_url = "https://example.com/events.json"
"#;

    fn setup_config_dir(files: &[(&str, &str)]) -> TempDir {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        for (name, content) in files {
            let path = temp_dir.path().join(name);
            fs::write(&path, content).expect("Failed to write config file");
        }
        temp_dir
    }

    struct EnvGuard {
        vars_to_restore: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn new() -> Self {
            Self {
                vars_to_restore: Vec::new(),
            }
        }

        fn set(&mut self, key: &str, value: &str) {
            let original = std::env::var(key).ok();
            self.vars_to_restore.push((key.to_string(), original));
            unsafe {
                std::env::set_var(key, value);
            }
        }

        fn remove(&mut self, key: &str) {
            let original = std::env::var(key).ok();
            self.vars_to_restore.push((key.to_string(), original));
            unsafe {
                std::env::remove_var(key);
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, original_value) in &self.vars_to_restore {
                unsafe {
                    match original_value {
                        Some(value) => std::env::set_var(key, value),
                        None => std::env::remove_var(key),
                    }
                }
            }
        }
    }

    #[test]
    fn test_config_loader_defaults() {
        let _guard = TEST_MUTEX.lock().unwrap();
        let mut env = EnvGuard::new();
        env.remove("CLUBWATCH_CONFIG_DIR");
        env.remove("CLUBWATCH_CONFIG_FILE");
        env.remove("CLUBWATCH_APP_ENV");

        let loader = ConfigLoader::new().expect("Should create loader");
        assert_eq!(loader.config_dir, PathBuf::from("config"));
        assert!(loader.config_file.is_none());
        assert_eq!(loader.environment, AppEnvironment::Development);
    }

    #[test]
    fn test_config_loader_mutual_exclusivity_error() {
        let _guard = TEST_MUTEX.lock().unwrap();
        let mut env = EnvGuard::new();
        env.set("CLUBWATCH_CONFIG_DIR", "/custom/config");
        env.set("CLUBWATCH_CONFIG_FILE", "/path/to/config.toml");

        let result = ConfigLoader::new();
        assert!(matches!(
            result,
            Err(ConfigError::MutualExclusivityError(_))
        ));
    }

    #[test]
    fn test_load_missing_default_toml() {
        let _guard = TEST_MUTEX.lock().unwrap();
        let mut env = EnvGuard::new();
        let temp_dir = setup_config_dir(&[]);

        env.set("CLUBWATCH_CONFIG_DIR", temp_dir.path().to_str().unwrap());
        env.remove("CLUBWATCH_CONFIG_FILE");
        env.remove("CLUBWATCH_APP_ENV");

        let loader = ConfigLoader::new().expect("Should create loader");
        let result = loader.load();

        assert!(result.is_err());
        if let Err(ConfigError::FileNotFound(msg)) = result {
            assert!(msg.contains("default.toml"));
        } else {
            panic!("Expected FileNotFound error");
        }
    }

    #[test]
    fn test_load_default_toml_only() {
        let _guard = TEST_MUTEX.lock().unwrap();
        let mut env = EnvGuard::new();
        let temp_dir = setup_config_dir(&[("default.toml", BASE_CONFIG)]);

        env.set("CLUBWATCH_CONFIG_DIR", temp_dir.path().to_str().unwrap());
        env.remove("CLUBWATCH_CONFIG_FILE");
        env.remove("CLUBWATCH_APP_ENV");

        let loader = ConfigLoader::new().expect("Should create loader");
        let settings = loader.load().expect("Should load settings");

        assert_eq!(settings.database.url, "postgres://localhost/clubwatch");
        assert!(settings.jobs.enabled);
        assert_eq!(settings.collector.source_url, "https://example.com/events.json");
        // Untouched sections fall back to serde defaults
        assert_eq!(settings.server.port, 3000);
        assert_eq!(settings.jobs.failure_threshold, 3);
    }

    #[test]
    fn test_load_with_environment_override() {
        let _guard = TEST_MUTEX.lock().unwrap();
        let mut env = EnvGuard::new();

        let production_config = r#"
[server]
host = "0.0.0.0"
port = 8080

[jobs]
failure_threshold = 5
"#;

        let temp_dir = setup_config_dir(&[
            ("default.toml", BASE_CONFIG),
            ("production.toml", production_config),
        ]);

        env.set("CLUBWATCH_CONFIG_DIR", temp_dir.path().to_str().unwrap());
        env.remove("CLUBWATCH_CONFIG_FILE");
        env.set("CLUBWATCH_APP_ENV", "production");

        let loader = ConfigLoader::new().expect("Should create loader");
        let settings = loader.load().expect("Should load settings");

        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.jobs.failure_threshold, 5);
        // Values not in production.toml come from default.toml
        assert_eq!(settings.database.url, "postgres://localhost/clubwatch");
    }

    #[test]
    fn test_load_with_env_var_override() {
        let _guard = TEST_MUTEX.lock().unwrap();
        let mut env = EnvGuard::new();
        let temp_dir = setup_config_dir(&[("default.toml", BASE_CONFIG)]);

        env.set("CLUBWATCH_CONFIG_DIR", temp_dir.path().to_str().unwrap());
        env.remove("CLUBWATCH_CONFIG_FILE");
        env.remove("CLUBWATCH_APP_ENV");
        env.set("CLUBWATCH_SERVER__PORT", "4000");
        env.set("CLUBWATCH_DATABASE__URL", "postgres://env-override/db");

        let loader = ConfigLoader::new().expect("Should create loader");
        let settings = loader.load().expect("Should load settings");

        assert_eq!(settings.server.port, 4000);
        assert_eq!(settings.database.url, "postgres://env-override/db");
    }

    #[test]
    fn test_load_single_file_mode() {
        let _guard = TEST_MUTEX.lock().unwrap();
        let mut env = EnvGuard::new();
        let temp_dir = setup_config_dir(&[("single.toml", BASE_CONFIG)]);
        let config_file_path = temp_dir.path().join("single.toml");

        env.remove("CLUBWATCH_CONFIG_DIR");
        env.set("CLUBWATCH_CONFIG_FILE", config_file_path.to_str().unwrap());
        env.remove("CLUBWATCH_APP_ENV");

        let loader = ConfigLoader::new().expect("Should create loader");
        let settings = loader.load().expect("Should load settings");

        assert_eq!(settings.database.url, "postgres://localhost/clubwatch");
    }
}
