//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::ToolkitConfig;
use crate::domain::errors::LmsError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into ToolkitConfig
/// 4. Applies environment variable overrides (LMS_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns a `Configuration` error if the file is missing or unreadable, a
/// referenced variable is unset, the TOML is malformed, or validation fails.
///
/// # Examples
///
/// ```no_run
/// use lms_toolkit::config::loader::load_config;
///
/// let config = load_config("lms-toolkit.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<ToolkitConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(LmsError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        LmsError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let mut config: ToolkitConfig = toml::from_str(&contents)
        .map_err(|e| LmsError::Configuration(format!("Failed to parse TOML: {e}")))?;

    finish(&mut config)?;
    Ok(config)
}

/// Loads configuration from an optional file
///
/// Without a file, the built-in defaults are used; environment overrides and
/// validation still apply.
pub fn load_config_or_default(path: Option<&Path>) -> Result<ToolkitConfig> {
    match path {
        Some(path) => load_config(path),
        None => {
            let mut config = ToolkitConfig::default();
            finish(&mut config)?;
            Ok(config)
        }
    }
}

fn finish(config: &mut ToolkitConfig) -> Result<()> {
    apply_env_overrides(config)?;

    config.validate().map_err(|e| {
        LmsError::Configuration(format!("Configuration validation failed: {e}"))
    })
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are passed through untouched.
///
/// # Errors
///
/// Returns an error if a referenced environment variable is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| LmsError::Configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut result = String::new();
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    processed_line = processed_line.replace(&format!("${{{var_name}}}"), &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(LmsError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(val) => val.trim().parse().map(Some).map_err(|_| {
            LmsError::Configuration(format!("Invalid value '{val}' for {name}"))
        }),
        Err(_) => Ok(None),
    }
}

/// Applies environment variable overrides using the LMS_* prefix
///
/// Environment variables follow the pattern LMS_<SECTION>_<KEY>, for example
/// `LMS_HTTP_PAGE_SIZE` or `LMS_LOGGING_LOCAL_PATH`.
fn apply_env_overrides(config: &mut ToolkitConfig) -> Result<()> {
    if let Ok(val) = std::env::var("LMS_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    // HTTP overrides
    if let Some(v) = parse_env("LMS_HTTP_REQUEST_TIMEOUT_SECONDS")? {
        config.http.request_timeout_seconds = v;
    }
    if let Some(v) = parse_env("LMS_HTTP_RESOURCE_DEADLINE_SECONDS")? {
        config.http.resource_deadline_seconds = v;
    }
    if let Some(v) = parse_env("LMS_HTTP_PAGE_SIZE")? {
        config.http.page_size = v;
    }
    if let Some(v) = parse_env("LMS_HTTP_RETRY_MAX_RETRIES")? {
        config.http.retry.max_retries = v;
    }
    if let Some(v) = parse_env("LMS_HTTP_RETRY_INITIAL_DELAY_MS")? {
        config.http.retry.initial_delay_ms = v;
    }
    if let Some(v) = parse_env("LMS_HTTP_RETRY_MAX_DELAY_MS")? {
        config.http.retry.max_delay_ms = v;
    }
    if let Some(v) = parse_env("LMS_HTTP_RETRY_BACKOFF_MULTIPLIER")? {
        config.http.retry.backoff_multiplier = v;
    }

    // Schoology overrides
    if let Some(v) = parse_env("LMS_SCHOOLOGY_RATE_LIMIT_REQUESTS")? {
        config.schoology.rate_limit_requests = v;
    }
    if let Some(v) = parse_env("LMS_SCHOOLOGY_RATE_LIMIT_PERIOD_SECONDS")? {
        config.schoology.rate_limit_period_seconds = v;
    }

    // Database overrides
    if let Ok(val) = std::env::var("LMS_DATABASE_ENGINE") {
        config.database.engine = val.parse().map_err(LmsError::Configuration)?;
    }
    if let Ok(val) = std::env::var("LMS_DATABASE_SERVER") {
        config.database.server = val;
    }
    if let Some(v) = parse_env("LMS_DATABASE_PORT")? {
        config.database.port = Some(v);
    }
    if let Ok(val) = std::env::var("LMS_DATABASE_NAME") {
        config.database.database_name = val;
    }

    // Logging overrides
    if let Some(v) = parse_env("LMS_LOGGING_LOCAL_ENABLED")? {
        config.logging.local_enabled = v;
    }
    if let Ok(val) = std::env::var("LMS_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
    if let Ok(val) = std::env::var("LMS_LOGGING_LOCAL_ROTATION") {
        config.logging.local_rotation = val;
    }

    Ok(())
}
