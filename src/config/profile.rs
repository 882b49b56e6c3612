//! YouTrack server profile configuration.

use serde::{Deserialize, Serialize};

use super::{ConfigError, Result};

/// A YouTrack profile configuration.
///
/// Profiles store connection details for a YouTrack server.
/// Tokens and passwords are stored separately in the OS keychain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    /// The name of this profile.
    ///
    /// Must be non-empty and unique across all profiles.
    pub name: String,

    /// The server URL, without the `/api` suffix.
    pub url: String,

    /// Login for cookie authentication.
    ///
    /// When set, the keychain secret is this user's password and the client
    /// logs in. When absent, the secret is a permanent token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login: Option<String>,
}

impl Profile {
    /// Create a profile that authenticates with a permanent token.
    pub fn new(name: String, url: String) -> Self {
        Self {
            name,
            url,
            login: None,
        }
    }

    /// Create a profile that logs in with a login and password.
    pub fn with_login(name: String, url: String, login: String) -> Self {
        Self {
            name,
            url,
            login: Some(login),
        }
    }

    /// Validate this profile.
    ///
    /// Checks that:
    /// - The name is non-empty and has no whitespace
    /// - The URL is non-empty and uses http or https
    /// - The login, if given, is non-empty
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError::ValidationError` with details if validation fails.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(ConfigError::ValidationError(
                "profile name cannot be empty".to_string(),
            ));
        }

        if self.name.contains(char::is_whitespace) {
            return Err(ConfigError::ValidationError(format!(
                "profile name '{}' cannot contain whitespace",
                self.name
            )));
        }

        if self.url.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "profile '{}': URL cannot be empty",
                self.name
            )));
        }

        if !self.url.starts_with("https://") && !self.url.starts_with("http://") {
            return Err(ConfigError::ValidationError(format!(
                "profile '{}': URL must start with http:// or https://",
                self.name
            )));
        }

        if matches!(&self.login, Some(login) if login.trim().is_empty()) {
            return Err(ConfigError::ValidationError(format!(
                "profile '{}': login cannot be blank",
                self.name
            )));
        }

        Ok(())
    }

    /// Whether this profile logs in instead of using a token.
    pub fn uses_login(&self) -> bool {
        self.login.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn work() -> Profile {
        Profile::new(
            "work".to_string(),
            "https://company.myjetbrains.com/youtrack".to_string(),
        )
    }

    #[test]
    fn test_profile_creation() {
        let profile = work();

        assert_eq!(profile.name, "work");
        assert_eq!(profile.url, "https://company.myjetbrains.com/youtrack");
        assert!(!profile.uses_login());
    }

    #[test]
    fn test_valid_profile() {
        assert!(work().validate().is_ok());
    }

    #[test]
    fn test_empty_name_rejected() {
        let profile = Profile::new("".to_string(), "https://yt.example.com".to_string());

        let result = profile.validate();
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("name cannot be empty"));
    }

    #[test]
    fn test_whitespace_name_rejected() {
        let profile = Profile::new("my work".to_string(), "https://yt.example.com".to_string());

        let result = profile.validate();
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("cannot contain whitespace"));
    }

    #[test]
    fn test_empty_url_rejected() {
        let profile = Profile::new("work".to_string(), "".to_string());

        let result = profile.validate();
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("URL cannot be empty"));
    }

    #[test]
    fn test_invalid_url_scheme_rejected() {
        let profile = Profile::new("work".to_string(), "yt.example.com".to_string());

        let result = profile.validate();
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("must start with http"));
    }

    #[test]
    fn test_http_url_accepted() {
        let profile = Profile::new("local".to_string(), "http://localhost:8080".to_string());

        assert!(profile.validate().is_ok());
    }

    #[test]
    fn test_blank_login_rejected() {
        let profile = Profile::with_login(
            "work".to_string(),
            "https://yt.example.com".to_string(),
            "  ".to_string(),
        );

        let result = profile.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("login cannot be blank"));
    }

    #[test]
    fn test_profile_serialization() {
        let profile = Profile::with_login(
            "work".to_string(),
            "https://yt.example.com".to_string(),
            "root".to_string(),
        );

        let toml_str = toml::to_string(&profile).unwrap();
        let parsed: Profile = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed, profile);
    }

    #[test]
    fn test_token_profile_omits_login() {
        let toml_str = toml::to_string(&work()).unwrap();
        assert!(!toml_str.contains("login"));
    }
}
