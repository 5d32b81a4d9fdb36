//! Provider authentication strategies
//!
//! Each [`AuthStrategy`] produces the `Authorization` header value for one
//! request. Schoology's header changes on every call (nonce and timestamp) and
//! Google's token is exchanged and cached, so the header is computed per request
//! rather than installed once on the HTTP client.

use crate::config::{secret_string, SecretString};
use crate::domain::{LmsError, RequestError, Result};
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use rand::Rng;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Default Google OAuth2 token endpoint
pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Read-only scopes requested for Google Classroom and the Reports API
pub const GOOGLE_SCOPES: [&str; 6] = [
    "https://www.googleapis.com/auth/classroom.courses.readonly",
    "https://www.googleapis.com/auth/classroom.rosters.readonly",
    "https://www.googleapis.com/auth/classroom.profile.emails",
    "https://www.googleapis.com/auth/classroom.coursework.students.readonly",
    "https://www.googleapis.com/auth/classroom.student-submissions.students.readonly",
    "https://www.googleapis.com/auth/admin.reports.audit.readonly",
];

const TOKEN_LIFETIME_SECS: i64 = 3600;
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// How requests to a provider are authorized
#[derive(Debug)]
pub enum AuthStrategy {
    /// `Authorization: Bearer <token>` (Canvas)
    Bearer(SecretString),

    /// OAuth 1.0a with a PLAINTEXT signature (Schoology)
    OAuth1Plaintext {
        consumer_key: String,
        consumer_secret: SecretString,
    },

    /// Google service account, exchanged for an access token and cached
    GoogleServiceAccount(Box<ServiceAccountAuth>),

    /// A pre-issued access token, sent as a bearer token
    Static(SecretString),
}

impl AuthStrategy {
    pub fn bearer(token: SecretString) -> Self {
        AuthStrategy::Bearer(token)
    }

    pub fn oauth1(consumer_key: impl Into<String>, consumer_secret: SecretString) -> Self {
        AuthStrategy::OAuth1Plaintext {
            consumer_key: consumer_key.into(),
            consumer_secret,
        }
    }

    pub fn google(auth: ServiceAccountAuth) -> Self {
        AuthStrategy::GoogleServiceAccount(Box::new(auth))
    }

    /// Header value for the next request
    pub async fn header_value(&self, http: &reqwest::Client) -> Result<String> {
        match self {
            AuthStrategy::Bearer(token) | AuthStrategy::Static(token) => {
                Ok(format!("Bearer {}", token.expose_secret().as_str()))
            }
            AuthStrategy::OAuth1Plaintext {
                consumer_key,
                consumer_secret,
            } => Ok(oauth1_plaintext_header(
                consumer_key,
                consumer_secret.expose_secret().as_str(),
                &random_nonce(),
                Utc::now().timestamp(),
            )),
            AuthStrategy::GoogleServiceAccount(auth) => {
                let token = auth.access_token(http).await?;
                Ok(format!("Bearer {token}"))
            }
        }
    }
}

/// 8-digit numeric nonce
fn random_nonce() -> String {
    let mut rng = rand::thread_rng();
    (0..8).map(|_| char::from(b'0' + rng.gen_range(0..10u8))).collect()
}

/// Build the Schoology OAuth 1.0a PLAINTEXT header
///
/// The signature is the consumer secret followed by an encoded `&` and the
/// empty token secret.
pub fn oauth1_plaintext_header(
    consumer_key: &str,
    consumer_secret: &str,
    nonce: &str,
    timestamp: i64,
) -> String {
    format!(
        "OAuth realm=\"Schoology API\",\
         oauth_consumer_key=\"{consumer_key}\",\
         oauth_token=\"\",\
         oauth_nonce=\"{nonce}\",\
         oauth_timestamp=\"{timestamp}\",\
         oauth_signature_method=\"PLAINTEXT\",\
         oauth_version=\"1.0\",\
         oauth_signature=\"{consumer_secret}%26\""
    )
}

/// The fields of a Google service-account key file that are used here
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    /// Parse a key file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            LmsError::Configuration(format!(
                "Failed to read service account key {}: {}",
                path.display(),
                e
            ))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            LmsError::Configuration(format!(
                "Invalid service account key {}: {}",
                path.display(),
                e
            ))
        })
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: String,
    aud: &'a str,
    iat: i64,
    exp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    sub: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

struct CachedToken {
    token: SecretString,
    expires_at: Instant,
}

/// Service-account JWT bearer flow with a cached access token
pub struct ServiceAccountAuth {
    key: ServiceAccountKey,
    subject: Option<String>,
    scopes: Vec<String>,
    cached: Mutex<Option<CachedToken>>,
}

impl std::fmt::Debug for ServiceAccountAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountAuth")
            .field("client_email", &self.key.client_email)
            .field("token_uri", &self.key.token_uri)
            .field("subject", &self.subject)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountAuth {
    /// `subject` is the domain user to impersonate, when delegation is used
    pub fn new(key: ServiceAccountKey, subject: Option<String>) -> Self {
        Self {
            key,
            subject,
            scopes: GOOGLE_SCOPES.iter().map(|s| s.to_string()).collect(),
            cached: Mutex::new(None),
        }
    }

    fn signed_assertion(&self) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            iss: &self.key.client_email,
            scope: self.scopes.join(" "),
            aud: &self.key.token_uri,
            iat: now,
            exp: now + TOKEN_LIFETIME_SECS,
            sub: self.subject.as_deref(),
        };

        let key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes()).map_err(|e| {
            LmsError::Configuration(format!("Invalid service account private key: {e}"))
        })?;

        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| LmsError::Auth(format!("Failed to sign service account JWT: {e}")))
    }

    /// Current access token, exchanging a fresh assertion when needed
    pub async fn access_token(&self, http: &reqwest::Client) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() + TOKEN_REFRESH_MARGIN < token.expires_at {
                return Ok(token.token.expose_secret().as_str().to_string());
            }
        }

        let assertion = self.signed_assertion()?;
        let response = http
            .post(&self.key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(|e| RequestError::ConnectionFailed(format!("Token exchange failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RequestError::AuthenticationFailed(format!(
                "Token exchange returned {status}: {body}"
            ))
            .into());
        }

        let body: TokenResponse = response.json().await.map_err(|e| {
            RequestError::InvalidResponse(format!("Token exchange response: {e}"))
        })?;

        let lifetime = Duration::from_secs(body.expires_in.unwrap_or(TOKEN_LIFETIME_SECS as u64));
        tracing::debug!(
            client_email = %self.key.client_email,
            expires_in_secs = lifetime.as_secs(),
            "Obtained Google access token"
        );

        let token = body.access_token;
        *cached = Some(CachedToken {
            token: secret_string(token.clone()),
            expires_at: Instant::now() + lifetime,
        });
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oauth1_header_layout() {
        let header = oauth1_plaintext_header("key", "secret", "12345678", 1_600_000_000);

        assert!(header.starts_with("OAuth realm=\"Schoology API\","));
        assert!(header.contains("oauth_consumer_key=\"key\","));
        assert!(header.contains("oauth_token=\"\","));
        assert!(header.contains("oauth_nonce=\"12345678\","));
        assert!(header.contains("oauth_timestamp=\"1600000000\","));
        assert!(header.contains("oauth_signature_method=\"PLAINTEXT\","));
        assert!(header.contains("oauth_version=\"1.0\","));
        assert!(header.ends_with("oauth_signature=\"secret%26\""));
    }

    #[test]
    fn test_nonce_is_eight_digits() {
        let nonce = random_nonce();
        assert_eq!(nonce.len(), 8);
        assert!(nonce.chars().all(|c| c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn test_bearer_header() {
        let auth = AuthStrategy::bearer(secret_string("abc".to_string()));
        let http = reqwest::Client::new();
        assert_eq!(auth.header_value(&http).await.unwrap(), "Bearer abc");
    }

    #[tokio::test]
    async fn test_oauth1_header_changes_nonce() {
        let auth = AuthStrategy::oauth1("key", secret_string("secret".to_string()));
        let http = reqwest::Client::new();
        let header = auth.header_value(&http).await.unwrap();
        assert!(header.contains("oauth_signature=\"secret%26\""));
    }

    #[test]
    fn test_debug_redacts_credentials() {
        let auth = AuthStrategy::oauth1("key", secret_string("hunter2".to_string()));
        assert!(!format!("{auth:?}").contains("hunter2"));
    }

    #[test]
    fn test_service_account_key_defaults_token_uri() {
        let key: ServiceAccountKey = serde_json::from_str(
            r#"{"client_email": "svc@example.iam.gserviceaccount.com", "private_key": "x"}"#,
        )
        .unwrap();
        assert_eq!(key.token_uri, GOOGLE_TOKEN_URI);
    }

    #[tokio::test]
    async fn test_invalid_private_key_is_configuration_error() {
        let key = ServiceAccountKey {
            client_email: "svc@example.iam.gserviceaccount.com".into(),
            private_key: "not a pem".into(),
            token_uri: "http://127.0.0.1:1/token".into(),
        };
        let auth = ServiceAccountAuth::new(key, None);
        let http = reqwest::Client::new();

        let result = auth.access_token(&http).await;
        assert!(matches!(result, Err(LmsError::Configuration(_))));
    }
}
