//! Configuration management for the toolkit.
//!
//! Settings come from, lowest precedence first: built-in defaults, an optional
//! TOML file, `LMS_*` environment overrides, and finally CLI flags. The value is
//! built once in `main` and handed down explicitly.
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "INFO"
//!
//! [http]
//! request_timeout_seconds = 30
//! resource_deadline_seconds = 600
//! page_size = 100
//!
//! [http.retry]
//! max_retries = 4
//! initial_delay_ms = 1000
//! max_delay_ms = 30000
//! backoff_multiplier = 2.0
//!
//! [schoology]
//! rate_limit_requests = 50
//! rate_limit_period_seconds = 5
//!
//! [database]
//! engine = "postgresql"
//! server = "localhost"
//! database_name = "lms"
//!
//! [logging]
//! local_enabled = true
//! local_path = "${LMS_LOG_DIR}"
//! local_rotation = "daily"
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

pub use loader::{load_config, load_config_or_default};
pub use schema::{
    ApplicationConfig, DatabaseConfig, DatabaseEngine, HttpConfig, LoggingConfig, RetryConfig, SchoologyConfig, ToolkitConfig,
};
pub use secret::{secret_string, secret_string_opt, SecretString, SecretValue};
