//! Application environment detection.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::error::ConfigError;

/// Which deployment environment the process runs in. Selects the optional
/// `{environment}.toml` configuration layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Test,
    Staging,
    Production,
}

impl Environment {
    /// Environment variable that selects the current environment.
    pub const ENV_VAR: &'static str = "CLUBWATCH_APP_ENV";

    /// Reads the environment from `CLUBWATCH_APP_ENV`, defaulting to
    /// `Development` when unset or unparseable.
    pub fn from_env() -> Self {
        std::env::var(Self::ENV_VAR)
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Test => "test",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "test" => Ok(Environment::Test),
            "staging" | "stage" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(ConfigError::EnvVarError(format!(
                "Invalid environment '{}'. Valid values are: development, test, staging, production",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_full_names_and_aliases() {
        assert_eq!("development".parse::<Environment>().unwrap(), Environment::Development);
        assert_eq!("dev".parse::<Environment>().unwrap(), Environment::Development);
        assert_eq!("stage".parse::<Environment>().unwrap(), Environment::Staging);
        assert_eq!("prod".parse::<Environment>().unwrap(), Environment::Production);
    }

    #[test]
    fn test_parse_is_case_and_whitespace_insensitive() {
        assert_eq!("PRODUCTION".parse::<Environment>().unwrap(), Environment::Production);
        assert_eq!(" test ".parse::<Environment>().unwrap(), Environment::Test);
    }

    #[test]
    fn test_parse_rejects_unknown_values() {
        assert!("qa".parse::<Environment>().is_err());
    }

    #[test]
    fn test_default_is_development() {
        assert_eq!(Environment::default(), Environment::Development);
        assert_eq!(Environment::default().as_str(), "development");
    }
}
