//! Configuration schema types
//!
//! Every section is optional in the TOML file; missing values fall back to the
//! defaults below.

use super::secret::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ToolkitConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// HTTP client settings shared by all providers
    #[serde(default)]
    pub http: HttpConfig,

    /// Schoology-specific settings
    #[serde(default)]
    pub schoology: SchoologyConfig,

    /// Destination database for `load` and `migrate`
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ToolkitConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid value
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.http.validate()?;
        self.schoology.validate()?;
        self.database.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (DEBUG, INFO, WARNING, ERROR, CRITICAL)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"];
        if !valid_levels.contains(&self.log_level.to_uppercase().as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Backoff multiplier
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    fn validate(&self) -> Result<(), String> {
        if self.max_retries > 10 {
            return Err(format!(
                "http.retry.max_retries must be <= 10, got {}",
                self.max_retries
            ));
        }
        if self.initial_delay_ms > self.max_delay_ms {
            return Err("http.retry.initial_delay_ms must not exceed max_delay_ms".to_string());
        }
        if self.backoff_multiplier < 1.0 {
            return Err(format!(
                "http.retry.backoff_multiplier must be >= 1.0, got {}",
                self.backoff_multiplier
            ));
        }
        Ok(())
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Timeout for a single request
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,

    /// Deadline covering every page of one resource
    #[serde(default = "default_resource_deadline_seconds")]
    pub resource_deadline_seconds: u64,

    /// Records requested per page where the provider supports it
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Retry configuration
    #[serde(default)]
    pub retry: RetryConfig,
}

impl HttpConfig {
    fn validate(&self) -> Result<(), String> {
        if self.request_timeout_seconds == 0 {
            return Err("http.request_timeout_seconds must be > 0".to_string());
        }
        if self.resource_deadline_seconds < self.request_timeout_seconds {
            return Err(format!(
                "http.resource_deadline_seconds ({}) must be >= request_timeout_seconds ({})",
                self.resource_deadline_seconds, self.request_timeout_seconds
            ));
        }
        if !(1..=1000).contains(&self.page_size) {
            return Err(format!(
                "http.page_size must be between 1 and 1000, got {}",
                self.page_size
            ));
        }
        self.retry.validate()
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_seconds: default_request_timeout_seconds(),
            resource_deadline_seconds: default_resource_deadline_seconds(),
            page_size: default_page_size(),
            retry: RetryConfig::default(),
        }
    }
}

/// Schoology request budget
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchoologyConfig {
    /// Requests allowed per period
    #[serde(default = "default_rate_limit_requests")]
    pub rate_limit_requests: u32,

    /// Length of the rate-limit period
    #[serde(default = "default_rate_limit_period_seconds")]
    pub rate_limit_period_seconds: u64,
}

impl SchoologyConfig {
    fn validate(&self) -> Result<(), String> {
        if self.rate_limit_requests == 0 {
            return Err("schoology.rate_limit_requests must be > 0".to_string());
        }
        if self.rate_limit_period_seconds == 0 {
            return Err("schoology.rate_limit_period_seconds must be > 0".to_string());
        }
        Ok(())
    }
}

impl Default for SchoologyConfig {
    fn default() -> Self {
        Self {
            rate_limit_requests: default_rate_limit_requests(),
            rate_limit_period_seconds: default_rate_limit_period_seconds(),
        }
    }
}

/// Destination engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseEngine {
    Mssql,
    #[default]
    Postgresql,
}

impl DatabaseEngine {
    pub fn default_port(self) -> u16 {
        match self {
            DatabaseEngine::Mssql => 1433,
            DatabaseEngine::Postgresql => 5432,
        }
    }

    /// Directory name of this engine's migration scripts
    pub fn as_str(self) -> &'static str {
        match self {
            DatabaseEngine::Mssql => "mssql",
            DatabaseEngine::Postgresql => "postgresql",
        }
    }
}

impl fmt::Display for DatabaseEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatabaseEngine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mssql" => Ok(DatabaseEngine::Mssql),
            "postgresql" | "postgres" => Ok(DatabaseEngine::Postgresql),
            other => Err(format!(
                "Invalid database engine '{other}'. Must be one of: mssql, postgresql"
            )),
        }
    }
}

/// Destination database connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub engine: DatabaseEngine,

    #[serde(default = "default_server")]
    pub server: String,

    /// Port; the engine's default when absent
    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default = "default_database_name")]
    pub database_name: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default, skip_serializing)]
    pub password: Option<SecretString>,

    /// Windows integrated authentication (MSSQL only)
    #[serde(default)]
    pub integrated_security: bool,

    #[serde(default)]
    pub encrypt: bool,

    #[serde(default)]
    pub trust_certificate: bool,

    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    #[serde(default = "default_connection_timeout_seconds")]
    pub connection_timeout_seconds: u64,
}

impl DatabaseConfig {
    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.engine.default_port())
    }

    fn validate(&self) -> Result<(), String> {
        if self.server.trim().is_empty() {
            return Err("database.server cannot be empty".to_string());
        }
        if self.database_name.trim().is_empty() {
            return Err("database.database_name cannot be empty".to_string());
        }
        if self.integrated_security && self.engine == DatabaseEngine::Postgresql {
            return Err("database.integrated_security is only supported for mssql".to_string());
        }
        if self.max_connections == 0 {
            return Err("database.max_connections must be > 0".to_string());
        }
        Ok(())
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            engine: DatabaseEngine::default(),
            server: default_server(),
            port: None,
            database_name: default_database_name(),
            username: None,
            password: None,
            integrated_security: false,
            encrypt: false,
            trust_certificate: false,
            max_connections: default_max_connections(),
            connection_timeout_seconds: default_connection_timeout_seconds(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable JSON file logging next to the console output
    #[serde(default)]
    pub local_enabled: bool,

    /// Directory for log files
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy (daily or hourly)
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }

        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("logging.local_path cannot be empty when local_enabled = true".to_string());
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

fn default_log_level() -> String {
    "INFO".to_string()
}

fn default_max_retries() -> usize {
    4
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    30000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_request_timeout_seconds() -> u64 {
    30
}

fn default_resource_deadline_seconds() -> u64 {
    600
}

fn default_page_size() -> usize {
    100
}

fn default_rate_limit_requests() -> u32 {
    50
}

fn default_rate_limit_period_seconds() -> u64 {
    5
}

fn default_server() -> String {
    "localhost".to_string()
}

fn default_database_name() -> String {
    "lms".to_string()
}

fn default_max_connections() -> usize {
    4
}

fn default_connection_timeout_seconds() -> u64 {
    30
}

fn default_local_path() -> String {
    "logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}
