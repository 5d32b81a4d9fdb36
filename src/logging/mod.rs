//! Logging and observability
//!
//! Structured logging through `tracing`, with a console layer and an optional
//! JSON rolling file.
//!
//! # Example
//!
//! ```no_run
//! use lms_toolkit::logging::init_logging;
//! use lms_toolkit::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("INFO", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Extraction started");
//! ```

pub mod structured;

pub use structured::{init_logging, parse_log_level, LoggingGuard};

/// Log the start of a resource extraction or table load
///
/// # Example
///
/// ```no_run
/// use lms_toolkit::log_resource_start;
///
/// log_resource_start!("Canvas", "sections");
/// ```
#[macro_export]
macro_rules! log_resource_start {
    ($provider:expr, $resource:expr) => {
        tracing::info!(
            provider = %$provider,
            resource = %$resource,
            "Starting resource"
        );
    };
}

/// Log the completion of a resource with its row count
///
/// # Example
///
/// ```no_run
/// use lms_toolkit::log_resource_complete;
/// use std::time::Duration;
///
/// log_resource_complete!("Canvas", "sections", 42, Duration::from_secs(3));
/// ```
#[macro_export]
macro_rules! log_resource_complete {
    ($provider:expr, $resource:expr, $rows:expr, $duration:expr) => {
        tracing::info!(
            provider = %$provider,
            resource = %$resource,
            rows = $rows,
            duration_ms = $duration.as_millis() as u64,
            "Resource completed"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use lms_toolkit::log_error_with_context;
/// use lms_toolkit::domain::LmsError;
///
/// let error = LmsError::Protocol("404".to_string());
/// log_error_with_context!(&error, "Canvas", "assignments", "section 7");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $provider:expr, $resource:expr, $identifier:expr) => {
        tracing::error!(
            error = %$error,
            provider = %$provider,
            resource = %$resource,
            identifier = %$identifier,
            "Error occurred"
        );
    };
}

/// Log a retry attempt
///
/// # Example
///
/// ```no_run
/// use lms_toolkit::log_retry_attempt;
///
/// log_retry_attempt!(2, 4, 2000u64, "503 Service Unavailable");
/// ```
#[macro_export]
macro_rules! log_retry_attempt {
    ($attempt:expr, $max_attempts:expr, $delay_ms:expr, $reason:expr) => {
        tracing::warn!(
            attempt = $attempt,
            max_attempts = $max_attempts,
            delay_ms = $delay_ms,
            reason = %$reason,
            "Retrying request"
        );
    };
}
