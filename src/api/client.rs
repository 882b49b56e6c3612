//! YouTrack connection and authenticated request core.
//!
//! Every API operation funnels through [`Connection::request`], which attaches
//! the session headers, redacts system user names from the body, and retries
//! on expired sessions (re-login) and gateway timeouts (backoff). The typed
//! operations live in sibling modules as further `impl Connection` blocks.

use std::sync::OnceLock;
use std::time::Duration;

use regex::bytes::Regex;
use reqwest::header::{ACCEPT, CONTENT_TYPE, SET_COOKIE};
use reqwest::{redirect, Client, Method, StatusCode};
use tracing::{debug, info, instrument, warn};

use super::auth::{self, Credentials, Session};
use super::error::{ApiError, Result};
use super::response::{Parsed, RawResponse};
use super::xml::{self, Element};
use crate::config::{Profile, Settings};

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default sleep after a 504 before retrying.
const DEFAULT_GATEWAY_BACKOFF_SECS: u64 = 30;

/// Default delay between polls while the server is still counting issues.
const DEFAULT_COUNT_POLL_SECS: u64 = 5;

/// Number of guarded attempts before the final unguarded one.
pub const MAX_ATTEMPTS: u32 = 10;

/// Content type used for request bodies when the caller names none.
const DEFAULT_BODY_CONTENT_TYPE: &str = "application/xml; charset=UTF-8";

/// Replacement for system-generated user names in response bodies.
const REDACTED_USER: &[u8] = b"guest";

fn system_user_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"system_user[%@][a-zA-Z0-9]+").expect("system user pattern is valid")
    })
}

/// Rewrite system user names in a response body to `guest`.
pub fn redact_system_users(body: &[u8]) -> Vec<u8> {
    system_user_pattern()
        .replace_all(body, REDACTED_USER)
        .into_owned()
}

/// Tuning knobs for a connection.
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    /// Timeout for a single HTTP request.
    pub request_timeout: Duration,
    /// Sleep after a 504 before retrying.
    pub gateway_backoff: Duration,
    /// Delay between polls of the issue counter.
    pub count_poll_interval: Duration,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            gateway_backoff: Duration::from_secs(DEFAULT_GATEWAY_BACKOFF_SECS),
            count_poll_interval: Duration::from_secs(DEFAULT_COUNT_POLL_SECS),
        }
    }
}

impl From<&Settings> for ConnectionOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            request_timeout: Duration::from_secs(settings.request_timeout_secs),
            gateway_backoff: Duration::from_secs(settings.gateway_timeout_backoff_secs),
            count_poll_interval: Duration::from_secs(settings.count_poll_interval_secs),
        }
    }
}

/// One request handed to the request core.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Absolute URL, or a path relative to `<url>/api`.
    pub path: String,
    pub body: Option<Vec<u8>>,
    /// A non-2xx status that should count as success for this call.
    pub ignore_status: Option<StatusCode>,
    /// Body content type for PUT/POST, `Accept` for GET.
    pub content_type: Option<String>,
    /// Explicit `Accept` header for any method.
    pub accept: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            ignore_status: None,
            content_type: None,
            accept: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn ignore_status(mut self, status: StatusCode) -> Self {
        self.ignore_status = Some(status);
        self
    }

    pub fn content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_string());
        self
    }

    pub fn accept(mut self, accept: &str) -> Self {
        self.accept = Some(accept.to_string());
        self
    }

    fn accepts(&self, status: StatusCode) -> bool {
        status == StatusCode::OK || status == StatusCode::CREATED || self.ignore_status == Some(status)
    }
}

/// A connection to one YouTrack server.
///
/// All operations take `&mut self`: the session headers change in place on
/// re-login, so one connection serves one caller at a time. Open a separate
/// connection per concurrent task.
#[derive(Debug)]
pub struct Connection {
    /// The HTTP client.
    pub(super) client: Client,
    /// Server URL without trailing slash.
    pub(super) url: String,
    /// `<url>/api`.
    pub(super) base_url: String,
    /// Authentication state.
    pub(super) session: Session,
    pub(super) options: ConnectionOptions,
}

impl Connection {
    /// Create a connection from a configured profile.
    ///
    /// The profile's secret is read from the OS keyring. A profile with a
    /// login is treated as login/password and logs in immediately; otherwise
    /// the secret is a permanent token.
    #[instrument(skip(profile, settings), fields(profile_name = %profile.name))]
    pub async fn from_profile(profile: &Profile, settings: &Settings) -> Result<Self> {
        info!("Creating YouTrack connection for profile");

        let secret = auth::get_secret(&profile.name)?;
        let options = ConnectionOptions::from(settings);

        match &profile.login {
            Some(login) => Self::with_login(&profile.url, login, &secret, options).await,
            None => Self::with_token(&profile.url, &secret, options),
        }
    }

    /// Create an unauthenticated connection.
    pub fn anonymous(url: &str, options: ConnectionOptions) -> Result<Self> {
        let client = Self::build_http_client(&options)?;
        let url = normalize_base_url(url);
        let base_url = format!("{}/api", url);

        Ok(Self {
            client,
            url,
            base_url,
            session: Session::default(),
            options,
        })
    }

    /// Create a connection that authenticates with a permanent token.
    pub fn with_token(url: &str, token: &str, options: ConnectionOptions) -> Result<Self> {
        let mut conn = Self::anonymous(url, options)?;
        conn.set_auth_token(token);
        Ok(conn)
    }

    /// Create a connection and log in with a login and password.
    pub async fn with_login(
        url: &str,
        login: &str,
        password: &str,
        options: ConnectionOptions,
    ) -> Result<Self> {
        let mut conn = Self::anonymous(url, options)?;
        conn.login(&Credentials::new(login, password)).await?;
        Ok(conn)
    }

    /// Build the HTTP client with appropriate settings.
    fn build_http_client(options: &ConnectionOptions) -> Result<Client> {
        Client::builder()
            .timeout(options.request_timeout)
            .redirect(redirect::Policy::none())
            .build()
            .map_err(ApiError::Network)
    }

    /// Switch to bearer-token authentication.
    pub fn set_auth_token(&mut self, token: &str) {
        self.session.set_token(token);
    }

    /// The server URL (without `/api`).
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The API base URL (`<url>/api`).
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn options(&self) -> &ConnectionOptions {
        &self.options
    }

    /// Log in and replace the session header with the server's cookie.
    #[instrument(skip(self, credentials), fields(login = %credentials.login()))]
    pub async fn login(&mut self, credentials: &Credentials) -> Result<()> {
        debug!("Logging in");

        let response = self
            .client
            .post(format!("{}/user/login", self.base_url))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(credentials.form_body())
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        if status != StatusCode::OK {
            let body = redact_system_users(&response.bytes().await?);
            return Err(ApiError::status_error("/user/login", status, headers, &body));
        }

        let cookie = auth::cookie_header(
            headers
                .get_all(SET_COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok()),
        )
        .ok_or(ApiError::MissingSessionCookie)?;

        self.session.set_cookie(cookie, credentials.clone());
        info!("Logged in");
        Ok(())
    }

    /// Execute a request, re-authenticating and backing off as needed.
    ///
    /// 504 sleeps for the gateway backoff; 401/403/500 re-run the login when
    /// credentials are known and otherwise stop retrying. After the guarded
    /// attempts one final attempt is made and its outcome returned as-is.
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    pub async fn request(&mut self, request: &ApiRequest) -> Result<RawResponse> {
        for attempt in 1..=MAX_ATTEMPTS {
            let err = match self.execute(request).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_session_or_overload() => e,
                Err(e) => return Err(e),
            };

            if err.status() == Some(StatusCode::GATEWAY_TIMEOUT) {
                warn!(
                    "Gateway timeout (attempt {}/{}), retrying in {:?}",
                    attempt, MAX_ATTEMPTS, self.options.gateway_backoff
                );
                tokio::time::sleep(self.options.gateway_backoff).await;
            } else if let Some(credentials) = self.session.credentials().cloned() {
                warn!(
                    "Request rejected (attempt {}/{}): {}; logging in again",
                    attempt, MAX_ATTEMPTS, err
                );
                self.login(&credentials).await?;
            } else {
                debug!("Request rejected and no credentials to log in with: {}", err);
                break;
            }
        }

        self.execute(request).await
    }

    /// Execute a single request with the current session.
    async fn execute(&self, request: &ApiRequest) -> Result<RawResponse> {
        let url = self.resolve(&request.path);
        let mut builder = self.session.apply(self.client.request(request.method.clone(), &url));

        match request.method {
            Method::PUT | Method::POST => {
                if let Some(body) = &request.body {
                    if !body.is_empty() {
                        let content_type = request
                            .content_type
                            .as_deref()
                            .unwrap_or(DEFAULT_BODY_CONTENT_TYPE);
                        builder = builder.header(CONTENT_TYPE, content_type);
                    }
                    builder = builder.body(body.clone());
                }
            }
            Method::GET => {
                if let Some(content_type) = &request.content_type {
                    builder = builder.header(ACCEPT, content_type.as_str());
                }
            }
            _ => {
                if let Some(body) = &request.body {
                    builder = builder.body(body.clone());
                }
            }
        }
        if let Some(accept) = &request.accept {
            builder = builder.header(ACCEPT, accept.as_str());
        }

        debug!("{} {}", request.method, url);
        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = redact_system_users(&response.bytes().await?);

        if !request.accepts(status) {
            debug!("Error response body: {}", String::from_utf8_lossy(&body));
            return Err(ApiError::status_error(&request.path, status, headers, &body));
        }

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }

    fn resolve(&self, path: &str) -> String {
        if path.starts_with("http") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    /// Lenient call-and-parse: malformed XML/JSON becomes [`Parsed::Unparsed`].
    pub async fn request_parsed(&mut self, request: ApiRequest) -> Result<Parsed> {
        let request = request.content_type("application/xml");
        let response = self.request(&request).await?;
        Ok(parse_lenient(&request, response))
    }

    /// Lenient GET.
    pub async fn get(&mut self, path: &str) -> Result<Parsed> {
        self.request_parsed(ApiRequest::get(path)).await
    }

    /// Lenient GET that must produce an XML document.
    pub(super) async fn get_element(&mut self, path: &str) -> Result<Element> {
        self.get(path).await?.into_element(path)
    }

    /// Lenient PUT with the placeholder body the API expects on creates.
    pub async fn put(&mut self, path: &str) -> Result<Parsed> {
        self.request_parsed(ApiRequest::put(path).body("<empty/>\n\n")).await
    }

    /// Strict GET: empty or malformed content is an error.
    pub async fn get_xml(&mut self, path: &str) -> Result<Element> {
        let response = self.request(&ApiRequest::get(path)).await?;
        if response.body.is_empty() {
            return Err(ApiError::EmptyContent {
                path: path.to_string(),
            });
        }
        xml::parse(&response.body).map_err(|e| ApiError::xml(path, e, &response.body))
    }

    /// The server build number from `/api/config`, or 0 when unknown.
    #[instrument(skip(self))]
    pub async fn get_build_number(&mut self) -> Result<u64> {
        let request = ApiRequest::get(format!("{}/api/config?fields=build", self.url))
            .ignore_status(StatusCode::NOT_FOUND)
            .content_type("application/json");
        let response = self.request(&request).await?;

        if response.status != StatusCode::OK || response.body.is_empty() {
            return Ok(0);
        }
        Ok(parse_build_number(&response.body))
    }

    /// Whether the server accepts `markdown` as an import field.
    pub async fn is_markdown_supported(&mut self) -> Result<bool> {
        Ok(self.get_build_number().await? > MARKDOWN_MIN_BUILD)
    }
}

/// Builds above this number support markdown issue fields.
const MARKDOWN_MIN_BUILD: u64 = 39406;

fn parse_build_number(body: &[u8]) -> u64 {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) else {
        return 0;
    };
    match value.get("build") {
        Some(serde_json::Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(serde_json::Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn parse_lenient(request: &ApiRequest, response: RawResponse) -> Parsed {
    if let Some(content_type) = response.content_type() {
        if content_type.contains("/xml") && !response.body.is_empty() {
            return match xml::parse(&response.body) {
                Ok(root) => Parsed::Xml(root),
                Err(e) => {
                    warn!("Could not parse XML from {}: {}", request.path, e);
                    Parsed::Unparsed
                }
            };
        }
        if content_type.contains("/json") && !response.body.is_empty() {
            return match serde_json::from_slice(&response.body) {
                Ok(value) => Parsed::Json(value),
                Err(e) => {
                    warn!("Could not parse JSON from {}: {}", request.path, e);
                    Parsed::Unparsed
                }
            };
        }
    }

    if request.method == Method::PUT {
        if let Some(location) = response.location() {
            return Parsed::Created(location.to_string());
        }
    }
    Parsed::Raw(response.body)
}

/// Percent-encode one path segment.
pub(super) fn quote(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

/// Encode query/form pairs as `k=v&k=v`.
pub(super) fn query(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Normalize the base URL by removing trailing slashes.
fn normalize_base_url(url: &str) -> String {
    let url = url.trim_end_matches('/');

    if !url.starts_with("https://") && !url.contains("localhost") && !url.contains("127.0.0.1") {
        warn!("URL does not use HTTPS: {}. This is insecure for production use.", url);
    }

    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url_removes_trailing_slash() {
        assert_eq!(
            normalize_base_url("https://company.myjetbrains.com/youtrack/"),
            "https://company.myjetbrains.com/youtrack"
        );
    }

    #[test]
    fn test_normalize_base_url_handles_multiple_slashes() {
        assert_eq!(
            normalize_base_url("https://yt.example.com///"),
            "https://yt.example.com"
        );
    }

    #[test]
    fn test_redact_system_users() {
        let body = b"<user login=\"system_user@a1B2\"/><user login=\"system_user%ff\"/>";
        assert_eq!(
            redact_system_users(body),
            b"<user login=\"guest\"/><user login=\"guest\"/>".to_vec()
        );
    }

    #[test]
    fn test_redact_leaves_other_users() {
        let body = b"system_user and system_user_x@1 and root";
        assert_eq!(redact_system_users(body), body.to_vec());
    }

    #[test]
    fn test_request_accepts_ok_created_and_override() {
        let request = ApiRequest::put("/import/users").ignore_status(StatusCode::BAD_REQUEST);
        assert!(request.accepts(StatusCode::OK));
        assert!(request.accepts(StatusCode::CREATED));
        assert!(request.accepts(StatusCode::BAD_REQUEST));
        assert!(!request.accepts(StatusCode::NOT_FOUND));
        assert!(!ApiRequest::get("/x").accepts(StatusCode::NO_CONTENT));
    }

    #[test]
    fn test_parse_build_number_variants() {
        assert_eq!(parse_build_number(br#"{"build": 40123}"#), 40123);
        assert_eq!(parse_build_number(br#"{"build": "39406"}"#), 39406);
        assert_eq!(parse_build_number(br#"{"version": "x"}"#), 0);
        assert_eq!(parse_build_number(b"not json"), 0);
    }

    #[test]
    fn test_query_encodes_values() {
        assert_eq!(
            query(&[("filter", "#Unresolved for: me"), ("max", "10")]),
            "filter=%23Unresolved%20for%3A%20me&max=10"
        );
    }

    #[test]
    fn test_quote_encodes_slashes() {
        assert_eq!(quote("1.0/beta"), "1.0%2Fbeta");
    }

    #[test]
    fn test_with_token_sets_bearer_session() {
        let conn = Connection::with_token(
            "https://yt.example.com/",
            "perm:abc",
            ConnectionOptions::default(),
        )
        .unwrap();
        assert_eq!(conn.base_url(), "https://yt.example.com/api");
        assert!(conn.session().credentials().is_none());
    }
}
