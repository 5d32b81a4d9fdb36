//! Domain error types
//!
//! This module defines the error hierarchy for the toolkit. The six pipeline
//! categories (auth, protocol, transient, mapping, I/O, migration) decide how far
//! a failure propagates; the remaining variants support configuration and
//! serialization plumbing.
//! All errors are domain-specific and don't expose third-party types.

use thiserror::Error;

/// Main toolkit error type
///
/// This is the primary error type used throughout the application.
#[derive(Debug, Error)]
pub enum LmsError {
    /// Credentials rejected by the provider
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Non-retryable 4xx or malformed response
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Retry budget or deadline exhausted
    #[error("Transient error: {0}")]
    Transient(String),

    /// Required column missing or unparseable
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// Filesystem unavailable or unwritable
    #[error("I/O error: {0}")]
    Io(String),

    /// SQL failure while applying a migration script
    #[error("Migration error in {script}: {message}")]
    Migration { script: String, message: String },

    /// Destination or sync database failure
    #[error("Database error: {0}")]
    Database(String),

    /// Provider request errors
    #[error("Request error: {0}")]
    Request(#[from] RequestError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Coarse classification of an [`LmsError`], used for summaries and exit handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Auth,
    Protocol,
    Transient,
    Mapping,
    Io,
    Migration,
    Configuration,
}

impl LmsError {
    /// Classify this error into one of the pipeline categories
    pub fn kind(&self) -> ErrorKind {
        match self {
            LmsError::Auth(_) => ErrorKind::Auth,
            LmsError::Protocol(_) => ErrorKind::Protocol,
            LmsError::Transient(_) => ErrorKind::Transient,
            LmsError::Mapping(_) | LmsError::Validation(_) | LmsError::Serialization(_) => {
                ErrorKind::Mapping
            }
            LmsError::Io(_) | LmsError::Database(_) => ErrorKind::Io,
            LmsError::Migration { .. } => ErrorKind::Migration,
            LmsError::Configuration(_) => ErrorKind::Configuration,
            LmsError::Request(e) => e.kind(),
        }
    }

    /// Whether this error terminates the whole run
    ///
    /// Only authentication, I/O, migration and configuration failures stop the
    /// process; everything else skips the current resource or entity.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Auth | ErrorKind::Io | ErrorKind::Migration | ErrorKind::Configuration
        )
    }

    /// Build a migration error for a script
    pub fn migration(script: impl Into<String>, message: impl ToString) -> Self {
        LmsError::Migration {
            script: script.into(),
            message: message.to_string(),
        }
    }
}

/// Provider HTTP errors
///
/// Errors that occur when talking to an LMS API.
/// These errors don't expose third-party HTTP client types.
#[derive(Debug, Error)]
pub enum RequestError {
    /// Failed to connect to the provider
    #[error("Failed to connect: {0}")]
    ConnectionFailed(String),

    /// Credentials rejected (401/403) or token exchange failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Invalid response from server
    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded (429)
    #[error("Rate limit exceeded, retry after: {0}")]
    RateLimited(String),

    /// Server error (5xx)
    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    /// Client error (4xx)
    #[error("Client error: {status} - {message}")]
    ClientError { status: u16, message: String },

    /// Single request timed out
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// The per-resource deadline elapsed
    #[error("Resource deadline exceeded: {0}")]
    DeadlineExceeded(String),

    /// Retry budget exhausted; carries the last error
    #[error("Retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: usize, last: String },
}

impl RequestError {
    /// Whether the request may succeed if attempted again
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RequestError::ConnectionFailed(_)
                | RequestError::RateLimited(_)
                | RequestError::ServerError { .. }
                | RequestError::Timeout(_)
        )
    }

    fn kind(&self) -> ErrorKind {
        match self {
            RequestError::AuthenticationFailed(_) => ErrorKind::Auth,
            RequestError::ClientError { .. } | RequestError::InvalidResponse(_) => {
                ErrorKind::Protocol
            }
            RequestError::ConnectionFailed(_)
            | RequestError::RateLimited(_)
            | RequestError::ServerError { .. }
            | RequestError::Timeout(_)
            | RequestError::DeadlineExceeded(_)
            | RequestError::RetriesExhausted { .. } => ErrorKind::Transient,
        }
    }
}

/// Extraction error details
///
/// Provides provider, resource and identifier context for a failure so that it
/// can be logged and summarised without carrying the original error around.
#[derive(Debug, Clone)]
pub struct ResourceErrorDetail {
    /// Provider tag (Canvas, Schoology, Google)
    pub provider: Option<String>,

    /// Resource name, e.g. `sections` or `submissions`
    pub resource: Option<String>,

    /// Identifier of the parent record (section, assignment) if any
    pub identifier: Option<String>,

    /// Error message
    pub message: String,

    /// Error classification
    pub kind: ErrorKind,
}

impl ResourceErrorDetail {
    /// Creates a new error detail from an error
    pub fn new(error: &LmsError) -> Self {
        Self {
            provider: None,
            resource: None,
            identifier: None,
            message: error.to_string(),
            kind: error.kind(),
        }
    }

    /// Sets the provider
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the resource name
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Sets the identifier
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for LmsError {
    fn from(err: std::io::Error) -> Self {
        LmsError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for LmsError {
    fn from(err: serde_json::Error) -> Self {
        LmsError::Serialization(err.to_string())
    }
}

// Conversion from csv::Error
impl From<csv::Error> for LmsError {
    fn from(err: csv::Error) -> Self {
        if err.is_io_error() {
            LmsError::Io(err.to_string())
        } else {
            LmsError::Mapping(format!("CSV error: {err}"))
        }
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for LmsError {
    fn from(err: toml::de::Error) -> Self {
        LmsError::Configuration(format!("TOML parse error: {err}"))
    }
}

// Sync store errors
impl From<tokio_rusqlite::Error> for LmsError {
    fn from(err: tokio_rusqlite::Error) -> Self {
        LmsError::Database(format!("Sync store: {err}"))
    }
}

impl From<rusqlite::Error> for LmsError {
    fn from(err: rusqlite::Error) -> Self {
        LmsError::Database(format!("Sync store: {err}"))
    }
}

impl From<tokio_postgres::Error> for LmsError {
    fn from(err: tokio_postgres::Error) -> Self {
        LmsError::Database(err.to_string())
    }
}

impl From<tiberius::error::Error> for LmsError {
    fn from(err: tiberius::error::Error) -> Self {
        LmsError::Database(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_lms_error_display() {
        let err = LmsError::Configuration("Invalid config".to_string());
        assert_eq!(err.to_string(), "Configuration error: Invalid config");
    }

    #[test]
    fn test_request_error_conversion() {
        let request_err = RequestError::ConnectionFailed("Network error".to_string());
        let err: LmsError = request_err.into();
        assert!(matches!(err, LmsError::Request(_)));
        assert_eq!(err.kind(), ErrorKind::Transient);
    }

    #[test_case(LmsError::Auth("x".into()), true ; "auth is fatal")]
    #[test_case(LmsError::Io("x".into()), true ; "io is fatal")]
    #[test_case(LmsError::Database("x".into()), true ; "database is fatal")]
    #[test_case(LmsError::migration("0002_x", "boom"), true ; "migration is fatal")]
    #[test_case(LmsError::Protocol("x".into()), false ; "protocol skips resource")]
    #[test_case(LmsError::Transient("x".into()), false ; "transient skips resource")]
    #[test_case(LmsError::Mapping("x".into()), false ; "mapping skips entity")]
    fn test_fatality(err: LmsError, fatal: bool) {
        assert_eq!(err.is_fatal(), fatal);
    }

    #[test]
    fn test_nested_auth_request_is_fatal() {
        let err: LmsError = RequestError::AuthenticationFailed("401".into()).into();
        assert!(err.is_fatal());
        assert_eq!(err.kind(), ErrorKind::Auth);
    }

    #[test]
    fn test_client_error_is_protocol() {
        let err: LmsError = RequestError::ClientError {
            status: 404,
            message: "not found".into(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_retryable_classification() {
        assert!(RequestError::ServerError {
            status: 503,
            message: String::new()
        }
        .is_retryable());
        assert!(RequestError::RateLimited("1s".into()).is_retryable());
        assert!(!RequestError::ClientError {
            status: 400,
            message: String::new()
        }
        .is_retryable());
        assert!(!RequestError::AuthenticationFailed(String::new()).is_retryable());
    }

    #[test]
    fn test_error_detail_builder() {
        let err = LmsError::Protocol("bad".into());
        let detail = ResourceErrorDetail::new(&err)
            .with_provider("Canvas")
            .with_resource("submissions")
            .with_identifier("103");

        assert_eq!(detail.provider.as_deref(), Some("Canvas"));
        assert_eq!(detail.resource.as_deref(), Some("submissions"));
        assert_eq!(detail.identifier.as_deref(), Some("103"));
        assert_eq!(detail.kind, ErrorKind::Protocol);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: LmsError = io_err.into();
        assert!(matches!(err, LmsError::Io(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let err: LmsError = toml_err.into();
        assert!(matches!(err, LmsError::Configuration(_)));
        assert!(err.to_string().contains("TOML parse error"));
    }

    #[test]
    fn test_migration_error_names_script() {
        let err = LmsError::migration("0003_add_grades", "syntax error");
        assert_eq!(
            err.to_string(),
            "Migration error in 0003_add_grades: syntax error"
        );
    }
}
