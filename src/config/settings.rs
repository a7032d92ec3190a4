//! Configuration settings structures for clubwatch
//!
//! This module defines all configuration structures that can be loaded from
//! TOML files and environment variables.

use serde::{Deserialize, Serialize};

// ============================================================================
// Default value functions
// ============================================================================

fn default_app_name() -> String {
    "clubwatch".to_string()
}

fn default_app_version() -> String {
    crate::pkg_version().to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_request_timeout() -> u64 {
    30
}

fn default_keep_alive_timeout() -> u64 {
    75
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connection_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_log_path() -> String {
    "logs/app.log".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_interval_hours() -> u64 {
    1
}

fn default_collector_startup_delay() -> u64 {
    5
}

fn default_dispatch_startup_delay() -> u64 {
    15
}

fn default_max_retries() -> u32 {
    3
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_pause_cooldown_hours() -> u64 {
    6
}

fn default_history_retention_days() -> i64 {
    90
}

fn default_unprocessed_page_size() -> i64 {
    100
}

fn default_collector_timeout() -> u64 {
    30
}

fn default_digest_subject() -> String {
    "Your watched keywords matched new events".to_string()
}

fn default_ops_channel() -> String {
    "webhook".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

// ============================================================================
// Application Configuration
// ============================================================================

/// Application basic information configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Application version
    #[serde(default = "default_app_version")]
    pub version: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            version: default_app_version(),
        }
    }
}

// ============================================================================
// Server Configuration
// ============================================================================

/// Axum HTTP server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Keep-alive timeout in seconds
    #[serde(default = "default_keep_alive_timeout")]
    pub keep_alive_timeout: u64,
}

impl ServerConfig {
    /// Get the full server address as "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout: default_request_timeout(),
            keep_alive_timeout: default_keep_alive_timeout(),
        }
    }
}

// ============================================================================
// Database Configuration
// ============================================================================

/// Diesel database connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL
    #[serde(default)]
    pub url: String,

    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout: u64,

    /// Whether to automatically run pending migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connection_timeout: default_connection_timeout(),
            auto_migrate: false,
        }
    }
}

// ============================================================================
// Logger Settings
// ============================================================================

/// Console output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleSettings {
    /// Whether console output is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Whether to use colored output
    #[serde(default = "default_true")]
    pub colored: bool,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            colored: default_true(),
        }
    }
}

/// File output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSettings {
    /// Whether file output is enabled
    #[serde(default)]
    pub enabled: bool,

    /// Path to the log file
    #[serde(default = "default_log_path")]
    pub path: String,

    /// Log format: "full", "compact", or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_log_path(),
            format: default_log_format(),
        }
    }
}

/// Logger configuration settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerSettings {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Console output settings
    #[serde(default)]
    pub console: ConsoleSettings,

    /// File output settings
    #[serde(default)]
    pub file: FileSettings,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            console: ConsoleSettings::default(),
            file: FileSettings::default(),
        }
    }
}

// ============================================================================
// Jobs Configuration
// ============================================================================

/// Background job scheduling configuration.
///
/// Covers the two recurring jobs (event collection and notification
/// dispatch), the retry ladder, the pause-on-failure circuit breaker, and
/// execution history retention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobsConfig {
    /// Whether job scheduling is enabled
    #[serde(default)]
    pub enabled: bool,

    /// Event collector run interval in hours
    #[serde(default = "default_interval_hours")]
    pub collector_interval_hours: u64,

    /// Notification dispatcher run interval in hours
    #[serde(default = "default_interval_hours")]
    pub dispatch_interval_hours: u64,

    /// Delay before the collector's first run after startup, in seconds
    #[serde(default = "default_collector_startup_delay")]
    pub collector_startup_delay_seconds: u64,

    /// Delay before the dispatcher's first run after startup, in seconds
    #[serde(default = "default_dispatch_startup_delay")]
    pub dispatch_startup_delay_seconds: u64,

    /// Maximum number of retries after the first failed attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Consecutive failed runs before a job is paused
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Hours a paused job waits before automatically resuming
    #[serde(default = "default_pause_cooldown_hours")]
    pub pause_cooldown_hours: u64,

    /// Execution history retention in days
    #[serde(default = "default_history_retention_days")]
    pub history_retention_days: i64,

    /// Maximum unprocessed work items fetched per dispatcher pass
    #[serde(default = "default_unprocessed_page_size")]
    pub unprocessed_page_size: i64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            collector_interval_hours: default_interval_hours(),
            dispatch_interval_hours: default_interval_hours(),
            collector_startup_delay_seconds: default_collector_startup_delay(),
            dispatch_startup_delay_seconds: default_dispatch_startup_delay(),
            max_retries: default_max_retries(),
            failure_threshold: default_failure_threshold(),
            pause_cooldown_hours: default_pause_cooldown_hours(),
            history_retention_days: default_history_retention_days(),
            unprocessed_page_size: default_unprocessed_page_size(),
        }
    }
}

// ============================================================================
// Collector Configuration
// ============================================================================

/// Event feed collector configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// URL of the JSON event feed to collect from
    #[serde(default)]
    pub source_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_collector_timeout")]
    pub timeout_seconds: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            source_url: String::new(),
            timeout_seconds: default_collector_timeout(),
        }
    }
}

// ============================================================================
// Notifications Configuration
// ============================================================================

/// SMTP settings for the email notification provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmtpConfig {
    /// SMTP relay host
    #[serde(default)]
    pub host: String,

    /// SMTP relay port
    #[serde(default = "default_smtp_port")]
    pub port: u16,

    /// SMTP username
    #[serde(default)]
    pub username: String,

    /// SMTP password
    #[serde(default)]
    pub password: String,

    /// From address for outgoing mail
    #[serde(default)]
    pub from_address: String,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_smtp_port(),
            username: String::new(),
            password: String::new(),
            from_address: String::new(),
        }
    }
}

/// Destination for operational job-failure alerts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpsAlertConfig {
    /// Whether operational alerts are sent at all
    #[serde(default)]
    pub enabled: bool,

    /// Channel used for alerts: "email" or "webhook"
    #[serde(default = "default_ops_channel")]
    pub channel: String,

    /// Destination address (email address or webhook URL)
    #[serde(default)]
    pub destination_address: String,
}

impl Default for OpsAlertConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            channel: default_ops_channel(),
            destination_address: String::new(),
        }
    }
}

/// Notification delivery configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Subject line for keyword digest notifications
    #[serde(default = "default_digest_subject")]
    pub digest_subject: String,

    /// SMTP settings for email delivery
    #[serde(default)]
    pub smtp: SmtpConfig,

    /// Operational alert destination
    #[serde(default)]
    pub ops: OpsAlertConfig,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            digest_subject: default_digest_subject(),
            smtp: SmtpConfig::default(),
            ops: OpsAlertConfig::default(),
        }
    }
}

// ============================================================================
// Main Settings Structure
// ============================================================================

/// Complete application settings
///
/// This structure represents the entire configuration that can be loaded
/// from TOML files and environment variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Application information
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logger configuration
    #[serde(default)]
    pub logger: LoggerSettings,

    /// Job scheduling configuration
    #[serde(default)]
    pub jobs: JobsConfig,

    /// Event collector configuration
    #[serde(default)]
    pub collector: CollectorConfig,

    /// Notification delivery configuration
    #[serde(default)]
    pub notifications: NotificationsConfig,
}
