//! Session state and secret storage for YouTrack connections.
//!
//! A connection authenticates either with a permanent token (sent as a bearer
//! header) or by logging in with a login and password, after which the server's
//! session cookie is replayed. Secrets for configured profiles live in the OS
//! keyring.

use std::fmt;

use reqwest::header::{AUTHORIZATION, CACHE_CONTROL, COOKIE};
use reqwest::RequestBuilder;

use super::error::{ApiError, Result};

/// The keyring service name for stored secrets.
const KEYRING_SERVICE: &str = "youtrack-client";

/// Login credentials kept for transparent re-login.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    login: String,
    password: String,
}

impl Credentials {
    pub fn new(login: &str, password: &str) -> Self {
        Self {
            login: login.to_string(),
            password: password.to_string(),
        }
    }

    pub fn login(&self) -> &str {
        &self.login
    }

    /// Form body for `POST /user/login`.
    pub(crate) fn form_body(&self) -> String {
        format!(
            "login={}&password={}",
            urlencoding::encode(&self.login),
            urlencoding::encode(&self.password)
        )
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// The header a session currently authenticates with.
#[derive(Clone, Default, PartialEq, Eq)]
pub enum AuthHeader {
    #[default]
    Anonymous,
    Bearer(String),
    Cookie(String),
}

impl fmt::Debug for AuthHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthHeader::Anonymous => f.write_str("Anonymous"),
            AuthHeader::Bearer(_) => f.write_str("Bearer(<redacted>)"),
            AuthHeader::Cookie(_) => f.write_str("Cookie(<redacted>)"),
        }
    }
}

/// Mutable authentication state of one connection.
///
/// Only the login flow and explicit token replacement change it. A session is
/// never shared between connections.
#[derive(Debug, Clone, Default)]
pub struct Session {
    header: AuthHeader,
    credentials: Option<Credentials>,
}

impl Session {
    /// A session authenticated by a permanent token.
    pub fn with_token(token: &str) -> Self {
        let mut session = Self::default();
        session.set_token(token);
        session
    }

    /// Switch to bearer-token authentication.
    ///
    /// Stored login credentials are dropped so that a later 401 never
    /// triggers a login POST on a token session. An empty token is ignored.
    pub fn set_token(&mut self, token: &str) {
        if token.is_empty() {
            return;
        }
        self.header = AuthHeader::Bearer(token.to_string());
        self.credentials = None;
    }

    /// Record a successful login.
    pub fn set_cookie(&mut self, cookie: String, credentials: Credentials) {
        self.header = AuthHeader::Cookie(cookie);
        self.credentials = Some(credentials);
    }

    pub fn header(&self) -> &AuthHeader {
        &self.header
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Attach the session headers to a request.
    pub fn apply(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.header {
            AuthHeader::Anonymous => builder,
            AuthHeader::Bearer(token) => builder.header(AUTHORIZATION, format!("Bearer {}", token)),
            AuthHeader::Cookie(cookie) => builder
                .header(COOKIE, cookie.as_str())
                .header(CACHE_CONTROL, "no-cache"),
        }
    }
}

/// Turn the `Set-Cookie` values of a login response into a `Cookie` header.
///
/// Only the `name=value` pair of each cookie is replayed.
pub fn cookie_header<'a>(set_cookies: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let pairs: Vec<&str> = set_cookies
        .into_iter()
        .filter_map(|c| c.split(';').next())
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .collect();

    if pairs.is_empty() {
        None
    } else {
        Some(pairs.join("; "))
    }
}

/// Store a secret (token or password) for a profile in the OS keyring.
pub fn store_secret(profile_name: &str, secret: &str) -> Result<()> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, profile_name)
        .map_err(|e| ApiError::Keyring(format!("failed to create keyring entry: {}", e)))?;

    entry
        .set_password(secret)
        .map_err(|e| ApiError::Keyring(format!("failed to store secret: {}", e)))?;

    Ok(())
}

/// Retrieve the secret stored for a profile.
pub fn get_secret(profile_name: &str) -> Result<String> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, profile_name)
        .map_err(|e| ApiError::Keyring(format!("failed to access keyring: {}", e)))?;

    entry
        .get_password()
        .map_err(|e| ApiError::Keyring(format!("failed to retrieve secret: {}", e)))
}

/// Delete the secret stored for a profile.
pub fn delete_secret(profile_name: &str) -> Result<()> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, profile_name)
        .map_err(|e| ApiError::Keyring(format!("failed to access keyring: {}", e)))?;

    entry
        .delete_password()
        .map_err(|e| ApiError::Keyring(format!("failed to delete secret: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_body_is_url_encoded() {
        let creds = Credentials::new("jane doe", "p&ss=word");
        assert_eq!(creds.form_body(), "login=jane%20doe&password=p%26ss%3Dword");
    }

    #[test]
    fn test_credentials_do_not_expose_password() {
        let creds = Credentials::new("root", "secret_password");
        let debug_output = format!("{:?}", creds);
        assert!(debug_output.contains("root"));
        assert!(!debug_output.contains("secret_password"));
    }

    #[test]
    fn test_auth_header_debug_is_redacted() {
        let session = Session::with_token("perm:abc");
        assert!(!format!("{:?}", session).contains("perm:abc"));
    }

    #[test]
    fn test_token_replaces_cookie_and_credentials() {
        let mut session = Session::default();
        session.set_cookie("JSESSIONID=1".into(), Credentials::new("root", "root"));
        assert!(session.credentials().is_some());

        session.set_token("perm:abc");
        assert_eq!(session.header(), &AuthHeader::Bearer("perm:abc".into()));
        assert!(session.credentials().is_none());
    }

    #[test]
    fn test_empty_token_is_ignored() {
        let mut session = Session::default();
        session.set_token("");
        assert_eq!(session.header(), &AuthHeader::Anonymous);
    }

    #[test]
    fn test_cookie_header_keeps_name_value_pairs() {
        let header = cookie_header([
            "JSESSIONID=abc; Path=/; HttpOnly",
            "jetbrains.charisma.main.security.PRINCIPAL=xyz; Path=/; Expires=Thu",
        ]);
        assert_eq!(
            header.as_deref(),
            Some("JSESSIONID=abc; jetbrains.charisma.main.security.PRINCIPAL=xyz")
        );
    }

    #[test]
    fn test_cookie_header_none_without_cookies() {
        assert_eq!(cookie_header(Vec::<&str>::new()), None);
    }
}
