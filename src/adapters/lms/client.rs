//! The provider request client
//!
//! [`RequestClient`] issues authenticated calls against one LMS provider and
//! exposes a resource as lazy [`Pages`]. Every call goes through the same retry
//! loop: 5xx, connection failures and timeouts back off exponentially, 429
//! honours `Retry-After`, 401/403 end the provider's run and any other 4xx
//! fails the resource with the provider's error body attached.

use super::auth::AuthStrategy;
use super::pagination::{page_records, NextPage, PageStyle};
use super::rate_limit::RequestBudget;
use crate::config::{HttpConfig, RetryConfig};
use crate::domain::{LmsError, RequestError, Result};
use crate::log_retry_attempt;
use chrono::{DateTime, Utc};
use rand::Rng;
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, RETRY_AFTER};
use reqwest::{Client, ClientBuilder, StatusCode};
use serde_json::{json, Value};
use std::time::{Duration, Instant};

/// Timeouts, paging and retry settings for a client
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub request_timeout: Duration,
    pub resource_deadline: Duration,
    pub page_size: usize,
    pub retry: RetryConfig,
}

impl ClientSettings {
    pub fn from_config(config: &HttpConfig) -> Self {
        Self {
            request_timeout: Duration::from_secs(config.request_timeout_seconds),
            resource_deadline: Duration::from_secs(config.resource_deadline_seconds),
            page_size: config.page_size,
            retry: config.retry.clone(),
        }
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self::from_config(&HttpConfig::default())
    }
}

/// A provider resource: where it lives, how it pages and where its records sit
#[derive(Debug, Clone)]
pub struct Resource {
    name: String,
    path: String,
    query: Vec<(String, String)>,
    records: String,
    style: PageStyle,
    graphql: Option<String>,
}

impl Resource {
    /// A GET resource; `path` is relative to the client's base URL or absolute
    pub fn get(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            query: Vec::new(),
            records: String::new(),
            style: PageStyle::Single,
            graphql: None,
        }
    }

    /// A GraphQL connection queried with an `$after` cursor variable
    pub fn graphql(
        name: impl Into<String>,
        path: impl Into<String>,
        query: impl Into<String>,
        connection: &str,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            query: Vec::new(),
            records: format!("{connection}/nodes"),
            style: PageStyle::GraphQl {
                page_info: format!("{connection}/pageInfo"),
            },
            graphql: Some(query.into()),
        }
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// JSON pointer of the record array inside each page
    pub fn records_at(mut self, pointer: impl Into<String>) -> Self {
        self.records = pointer.into();
        self
    }

    pub fn paged(mut self, style: PageStyle) -> Self {
        self.style = style;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone)]
enum PageRequest {
    Get {
        url: String,
        query: Vec<(String, String)>,
    },
    Post {
        url: String,
        body: Value,
    },
}

impl PageRequest {
    fn url(&self) -> &str {
        match self {
            PageRequest::Get { url, .. } | PageRequest::Post { url, .. } => url,
        }
    }
}

enum Failure {
    Retry {
        error: RequestError,
        retry_after: Option<Duration>,
    },
    Stop(LmsError),
}

/// HTTP client for one LMS provider
pub struct RequestClient {
    provider: String,
    base_url: String,
    http: Client,
    auth: AuthStrategy,
    settings: ClientSettings,
    budget: Option<RequestBudget>,
}

impl RequestClient {
    /// Create a client for `provider` rooted at `base_url`
    ///
    /// # Example
    ///
    /// ```no_run
    /// use lms_toolkit::adapters::lms::{AuthStrategy, ClientSettings, RequestClient, Resource};
    /// use lms_toolkit::adapters::lms::pagination::PageStyle;
    /// use lms_toolkit::config::secret_string;
    ///
    /// # async fn example() -> lms_toolkit::domain::Result<()> {
    /// let client = RequestClient::new(
    ///     "Canvas",
    ///     "https://canvas.example.edu",
    ///     AuthStrategy::bearer(secret_string("token".to_string())),
    ///     ClientSettings::default(),
    /// )?;
    ///
    /// let mut pages = client.get(Resource::get("accounts", "api/v1/accounts").paged(PageStyle::LinkHeader));
    /// while let Some(page) = pages.next_page().await? {
    ///     println!("{} accounts", page.len());
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(
        provider: impl Into<String>,
        base_url: impl Into<String>,
        auth: AuthStrategy,
        settings: ClientSettings,
    ) -> Result<Self> {
        let http = ClientBuilder::new()
            .timeout(settings.request_timeout)
            .connect_timeout(settings.request_timeout)
            .build()
            .map_err(|e| LmsError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            provider: provider.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
            auth,
            settings,
            budget: None,
        })
    }

    /// Pass every request, retries included, through a request budget
    pub fn with_budget(mut self, budget: RequestBudget) -> Self {
        self.budget = Some(budget);
        self
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn page_size(&self) -> usize {
        self.settings.page_size
    }

    /// Resolve a path against the base URL; absolute URLs pass through
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }

    /// Lazily page through a resource
    pub fn get(&self, resource: Resource) -> Pages<'_> {
        Pages {
            client: self,
            resource,
            cursor: Some(Cursor::First),
            started: None,
            pages: 0,
        }
    }

    /// Fetch every record of a resource
    pub async fn get_all(&self, resource: Resource) -> Result<Vec<Value>> {
        self.get(resource).collect_all().await
    }

    fn page_request(&self, resource: &Resource, cursor: &Cursor) -> PageRequest {
        let graphql = |after: Option<&str>| PageRequest::Post {
            url: self.url_for(&resource.path),
            body: json!({
                "query": resource.graphql.clone().unwrap_or_default(),
                "variables": { "after": after },
            }),
        };

        match (cursor, resource.graphql.is_some()) {
            (Cursor::First, true) => graphql(None),
            (Cursor::First, false) => PageRequest::Get {
                url: self.url_for(&resource.path),
                query: resource.query.clone(),
            },
            (Cursor::Next(NextPage::Cursor(after)), _) => graphql(Some(after.as_str())),
            (Cursor::Next(NextPage::Url(url)), _) => PageRequest::Get {
                url: url.clone(),
                query: Vec::new(),
            },
            (Cursor::Next(NextPage::Token(token)), _) => {
                let mut query = resource.query.clone();
                query.push(("pageToken".to_string(), token.clone()));
                PageRequest::Get {
                    url: self.url_for(&resource.path),
                    query,
                }
            }
        }
    }

    /// Send one page request through the retry loop
    async fn send(&self, resource: &str, request: &PageRequest) -> Result<(HeaderMap, Value)> {
        let retry = &self.settings.retry;
        let max_attempts = retry.max_retries + 1;
        let mut attempt = 0;

        loop {
            attempt += 1;
            if let Some(budget) = &self.budget {
                budget.wait().await;
            }

            match self.send_once(request).await {
                Ok(page) => return Ok(page),
                Err(Failure::Stop(error)) => return Err(error),
                Err(Failure::Retry { error, retry_after }) => {
                    if attempt >= max_attempts {
                        tracing::error!(
                            provider = %self.provider,
                            resource = %resource,
                            url = %request.url(),
                            attempts = attempt,
                            error = %error,
                            "Retry budget exhausted"
                        );
                        return Err(RequestError::RetriesExhausted {
                            attempts: attempt,
                            last: error.to_string(),
                        }
                        .into());
                    }

                    let delay = retry_after.unwrap_or_else(|| backoff_delay(retry, attempt));
                    log_retry_attempt!(attempt, max_attempts, delay.as_millis() as u64, error);
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn send_once(&self, request: &PageRequest) -> std::result::Result<(HeaderMap, Value), Failure> {
        let authorization = self
            .auth
            .header_value(&self.http)
            .await
            .map_err(Failure::Stop)?;

        let builder = match request {
            PageRequest::Get { url, query } => {
                let mut builder = self.http.get(url);
                if !query.is_empty() {
                    builder = builder.query(query);
                }
                builder
            }
            PageRequest::Post { url, body } => self.http.post(url).json(body),
        };

        tracing::debug!(provider = %self.provider, url = %request.url(), "Sending request");

        let response = builder
            .header(AUTHORIZATION, authorization)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| Failure::Retry {
                error: if e.is_timeout() {
                    RequestError::Timeout(e.to_string())
                } else {
                    RequestError::ConnectionFailed(e.to_string())
                },
                retry_after: None,
            })?;

        let status = response.status();
        let headers = response.headers().clone();

        if status.is_success() {
            let text = response.text().await.map_err(|e| Failure::Retry {
                error: RequestError::ConnectionFailed(format!("Failed to read body: {e}")),
                retry_after: None,
            })?;
            let body = if text.trim().is_empty() {
                Value::Null
            } else {
                serde_json::from_str(&text).map_err(|e| {
                    Failure::Stop(
                        RequestError::InvalidResponse(format!(
                            "{} returned malformed JSON: {e}",
                            request.url()
                        ))
                        .into(),
                    )
                })?
            };

            if matches!(request, PageRequest::Post { .. }) {
                if let Some(errors) = body.get("errors").filter(|e| !e.is_null()) {
                    return Err(Failure::Stop(
                        RequestError::InvalidResponse(format!("GraphQL errors: {errors}")).into(),
                    ));
                }
            }
            return Ok((headers, body));
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_status(status, &headers, body, Utc::now()))
    }
}

fn classify_status(
    status: StatusCode,
    headers: &HeaderMap,
    body: String,
    now: DateTime<Utc>,
) -> Failure {
    match status {
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = headers
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| parse_retry_after(v, now));
            Failure::Retry {
                error: RequestError::RateLimited(
                    retry_after
                        .map(|d| format!("{}s", d.as_secs()))
                        .unwrap_or_else(|| "backoff".to_string()),
                ),
                retry_after,
            }
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Failure::Stop(
            RequestError::AuthenticationFailed(format!("{status}: {body}")).into(),
        ),
        s if s.is_server_error() => Failure::Retry {
            error: RequestError::ServerError {
                status: s.as_u16(),
                message: body,
            },
            retry_after: None,
        },
        s => Failure::Stop(
            RequestError::ClientError {
                status: s.as_u16(),
                message: body,
            }
            .into(),
        ),
    }
}

/// Delay before retry `attempt` (1-based), without jitter
///
/// `initial_delay_ms × multiplier^(attempt−1)`, capped at `max_delay_ms`.
pub fn backoff_base(retry: &RetryConfig, attempt: usize) -> Duration {
    let exponent = attempt.saturating_sub(1).min(i32::MAX as usize) as i32;
    let delay_ms = retry.initial_delay_ms as f64 * retry.backoff_multiplier.powi(exponent);
    let delay_ms = delay_ms.min(retry.max_delay_ms as f64).max(0.0);
    Duration::from_millis(delay_ms as u64)
}

/// Delay before retry `attempt`: the base delay ±25%, never above `max_delay_ms`
pub fn backoff_delay(retry: &RetryConfig, attempt: usize) -> Duration {
    let base = backoff_base(retry, attempt).as_millis() as u64;
    let spread = base / 4;
    let high = (base + spread).min(retry.max_delay_ms.max(base));
    Duration::from_millis(rand::thread_rng().gen_range(base - spread..=high))
}

/// Parse `Retry-After` as delta-seconds or an HTTP date
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    (at - now).to_std().ok()
}

#[derive(Debug, Clone)]
enum Cursor {
    First,
    Next(NextPage),
}

/// Lazy sequence of pages for one resource
///
/// The per-resource deadline starts with the first page request and covers
/// every page after it. Dropping the value abandons the iteration.
pub struct Pages<'a> {
    client: &'a RequestClient,
    resource: Resource,
    cursor: Option<Cursor>,
    started: Option<Instant>,
    pages: usize,
}

impl Pages<'_> {
    /// Fetch the next page, `None` once the resource is exhausted
    pub async fn next_page(&mut self) -> Result<Option<Vec<Value>>> {
        let Some(cursor) = self.cursor.take() else {
            return Ok(None);
        };

        let started = *self.started.get_or_insert_with(Instant::now);
        let deadline = self.client.settings.resource_deadline;
        let remaining = deadline
            .checked_sub(started.elapsed())
            .filter(|d| !d.is_zero())
            .ok_or_else(|| self.deadline_exceeded())?;

        let request = self.client.page_request(&self.resource, &cursor);
        let (headers, body) = tokio::time::timeout(
            remaining,
            self.client.send(&self.resource.name, &request),
        )
        .await
        .map_err(|_| self.deadline_exceeded())??;

        self.pages += 1;
        let records = page_records(&body, &self.resource.records);
        self.cursor = self
            .resource
            .style
            .next_page(&headers, &body)
            .map(Cursor::Next);

        tracing::debug!(
            provider = %self.client.provider,
            resource = %self.resource.name,
            page = self.pages,
            records = records.len(),
            more = self.cursor.is_some(),
            "Fetched page"
        );

        Ok(Some(records))
    }

    /// Drain every remaining page
    pub async fn collect_all(mut self) -> Result<Vec<Value>> {
        let mut all = Vec::new();
        while let Some(page) = self.next_page().await? {
            all.extend(page);
        }
        Ok(all)
    }

    /// Pages fetched so far
    pub fn pages_fetched(&self) -> usize {
        self.pages
    }

    fn deadline_exceeded(&self) -> LmsError {
        RequestError::DeadlineExceeded(format!(
            "{} {} exceeded {}s",
            self.client.provider,
            self.resource.name,
            self.client.settings.resource_deadline.as_secs()
        ))
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::secret_string;
    use crate::domain::ErrorKind;
    use chrono::TimeZone;
    use mockito::Matcher;

    fn fast_settings(max_retries: usize) -> ClientSettings {
        ClientSettings {
            request_timeout: Duration::from_secs(5),
            resource_deadline: Duration::from_secs(30),
            page_size: 2,
            retry: RetryConfig {
                max_retries,
                initial_delay_ms: 1,
                max_delay_ms: 5,
                backoff_multiplier: 2.0,
            },
        }
    }

    fn client(url: &str, max_retries: usize) -> RequestClient {
        RequestClient::new(
            "Canvas",
            url,
            AuthStrategy::bearer(secret_string("token".to_string())),
            fast_settings(max_retries),
        )
        .unwrap()
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let retry = RetryConfig {
            max_retries: 4,
            initial_delay_ms: 1000,
            max_delay_ms: 30000,
            backoff_multiplier: 2.0,
        };
        assert_eq!(backoff_base(&retry, 1), Duration::from_millis(1000));
        assert_eq!(backoff_base(&retry, 2), Duration::from_millis(2000));
        assert_eq!(backoff_base(&retry, 3), Duration::from_millis(4000));
        assert_eq!(backoff_base(&retry, 10), Duration::from_millis(30000));
    }

    #[test]
    fn test_backoff_jitter_stays_in_bounds() {
        let retry = RetryConfig {
            max_retries: 4,
            initial_delay_ms: 1000,
            max_delay_ms: 30000,
            backoff_multiplier: 2.0,
        };
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            let delay = backoff_delay(&retry, 2);
            assert!(delay >= Duration::from_millis(1500));
            assert!(delay <= Duration::from_millis(2500));
            seen.insert(delay);

            let capped = backoff_delay(&retry, 10);
            assert!(capped >= Duration::from_millis(22500));
            assert!(capped <= Duration::from_millis(30000));
        }
        assert!(seen.len() > 1);

        let zero = RetryConfig {
            initial_delay_ms: 0,
            ..retry
        };
        assert_eq!(backoff_delay(&zero, 3), Duration::ZERO);
    }

    #[test]
    fn test_retry_after_seconds_and_date() {
        let now = Utc.with_ymd_and_hms(2015, 10, 21, 7, 28, 0).unwrap();
        assert_eq!(parse_retry_after("3", now), Some(Duration::from_secs(3)));
        assert_eq!(
            parse_retry_after("Wed, 21 Oct 2015 07:28:05 GMT", now),
            Some(Duration::from_secs(5))
        );
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:27:00 GMT", now), None);
        assert_eq!(parse_retry_after("soon", now), None);
    }

    #[test]
    fn test_url_for() {
        let client = client("https://canvas.test/", 0);
        assert_eq!(client.url_for("api/v1/accounts"), "https://canvas.test/api/v1/accounts");
        assert_eq!(client.url_for("/api/v1/accounts"), "https://canvas.test/api/v1/accounts");
        assert_eq!(client.url_for("https://other.test/x"), "https://other.test/x");
    }

    #[tokio::test]
    async fn test_link_header_pagination() {
        let mut server = mockito::Server::new_async().await;
        let base = server.url();

        let first = server
            .mock("GET", "/api/v1/accounts")
            .match_query(Matcher::UrlEncoded("per_page".into(), "2".into()))
            .match_header("authorization", "Bearer token")
            .with_header("link", &format!("<{base}/api/v1/accounts?page=2>; rel=\"next\""))
            .with_body(r#"[{"id": 1}, {"id": 2}]"#)
            .create_async()
            .await;
        let second = server
            .mock("GET", "/api/v1/accounts")
            .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
            .with_body(r#"[{"id": 3}]"#)
            .create_async()
            .await;

        let client = client(&base, 0);
        let mut pages = client.get(
            Resource::get("accounts", "api/v1/accounts")
                .query("per_page", "2")
                .paged(PageStyle::LinkHeader),
        );

        assert_eq!(pages.next_page().await.unwrap().unwrap().len(), 2);
        assert_eq!(pages.next_page().await.unwrap().unwrap().len(), 1);
        assert!(pages.next_page().await.unwrap().is_none());
        assert_eq!(pages.pages_fetched(), 2);

        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn test_exhausted_retries_are_transient() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/accounts")
            .with_status(500)
            .with_body("boom")
            .expect(3)
            .create_async()
            .await;

        let client = client(&server.url(), 2);
        let err = client
            .get_all(Resource::get("accounts", "api/v1/accounts"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Transient);
        assert!(!err.is_fatal());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rate_limited_honours_retry_after() {
        let mut server = mockito::Server::new_async().await;
        let limited = server
            .mock("GET", "/users")
            .with_status(429)
            .with_header("retry-after", "0")
            .expect(2)
            .create_async()
            .await;

        let client = client(&server.url(), 1);
        let err = client
            .get_all(Resource::get("users", "users"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LmsError::Request(RequestError::RetriesExhausted { attempts: 2, .. })
        ));
        limited.assert_async().await;
    }

    #[tokio::test]
    async fn test_client_error_fails_fast_with_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/courses/9/sections")
            .with_status(404)
            .with_body(r#"{"errors":[{"message":"The specified resource does not exist."}]}"#)
            .expect(1)
            .create_async()
            .await;

        let client = client(&server.url(), 4);
        let err = client
            .get_all(Resource::get("sections", "api/v1/courses/9/sections"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert!(err.to_string().contains("does not exist"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unauthorized_is_fatal_auth_error() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/accounts")
            .with_status(401)
            .expect(1)
            .create_async()
            .await;

        let client = client(&server.url(), 4);
        let err = client
            .get_all(Resource::get("accounts", "api/v1/accounts"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Auth);
        assert!(err.is_fatal());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_page_token_pagination() {
        let mut server = mockito::Server::new_async().await;
        let _first = server
            .mock("GET", "/v1/courses")
            .match_query(Matcher::Missing)
            .with_body(r#"{"courses": [{"id": "c1"}], "nextPageToken": "t2"}"#)
            .create_async()
            .await;
        let _second = server
            .mock("GET", "/v1/courses")
            .match_query(Matcher::UrlEncoded("pageToken".into(), "t2".into()))
            .with_body(r#"{"courses": [{"id": "c2"}]}"#)
            .create_async()
            .await;

        let client = client(&server.url(), 0);
        let records = client
            .get_all(
                Resource::get("courses", "v1/courses")
                    .records_at("/courses")
                    .paged(PageStyle::PageToken),
            )
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["id"], "c2");
    }

    #[tokio::test]
    async fn test_graphql_errors_are_protocol_errors() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/graphql")
            .with_body(r#"{"errors": [{"message": "bad field"}]}"#)
            .create_async()
            .await;

        let client = client(&server.url(), 0);
        let err = client
            .get_all(Resource::graphql(
                "courses",
                "api/graphql",
                "query { x }",
                "/data/account/coursesConnection",
            ))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[tokio::test]
    async fn test_deadline_exceeded_is_transient() {
        let mut settings = fast_settings(0);
        settings.resource_deadline = Duration::ZERO;
        let client = RequestClient::new(
            "Canvas",
            "http://127.0.0.1:9",
            AuthStrategy::bearer(secret_string("token".to_string())),
            settings,
        )
        .unwrap();

        let err = client
            .get_all(Resource::get("accounts", "api/v1/accounts"))
            .await
            .unwrap_err();

        assert!(matches!(err, LmsError::Request(RequestError::DeadlineExceeded(_))));
        assert_eq!(err.kind(), ErrorKind::Transient);
    }
}
