//! Centralized error types for the YouTrack client.
//!
//! This module provides a unified error hierarchy for the command-line
//! front end with user-friendly error messages. All error types use
//! `thiserror` for ergonomic error handling.

use reqwest::StatusCode;
use thiserror::Error;

use crate::api::ApiError;
use crate::config::ConfigError;

/// The main application error type.
///
/// This enum aggregates all error types that can occur in the client,
/// providing user-friendly error messages while preserving the underlying
/// error context for debugging.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration-related errors.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// API-related errors.
    #[error("{0}")]
    Api(#[from] ApiError),

    /// IO errors (file system, etc.).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with a message.
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Create a generic error.
    pub fn other(msg: impl Into<String>) -> Self {
        AppError::Other(msg.into())
    }

    /// Get a user-friendly message for display.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Config(e) => match e {
                ConfigError::NoConfigDir => {
                    "Could not find configuration directory. Please check your system settings."
                        .to_string()
                }
                ConfigError::CreateDirError(_) => {
                    "Could not create configuration directory. Check file permissions.".to_string()
                }
                ConfigError::ReadError(_) => {
                    "Could not read configuration file. Please check the file exists and is readable.".to_string()
                }
                ConfigError::WriteError(_) => {
                    "Could not save configuration. Please check file permissions.".to_string()
                }
                ConfigError::ParseError(_) => {
                    "Configuration file is invalid. Please check the file format.".to_string()
                }
                ConfigError::SerializeError(_) => {
                    "Could not save configuration. Internal error.".to_string()
                }
                ConfigError::ValidationError(msg) => format!("Configuration error: {}", msg),
                ConfigError::ProfileNotFound(name) => {
                    format!("Profile '{}' not found.", name)
                }
            },
            AppError::Api(e) => match e {
                ApiError::Status { status, path, .. } => match *status {
                    StatusCode::UNAUTHORIZED => {
                        "Authentication failed. Please check your login or token.".to_string()
                    }
                    StatusCode::FORBIDDEN => {
                        "Access denied. You don't have permission to access this resource."
                            .to_string()
                    }
                    StatusCode::NOT_FOUND => format!("'{}' was not found.", path),
                    s if s.is_server_error() => {
                        "YouTrack server error. Please try again later.".to_string()
                    }
                    s => format!("Request to '{}' was rejected ({}).", path, s),
                },
                ApiError::EmptyContent { .. }
                | ApiError::Xml { .. }
                | ApiError::UnexpectedResponse { .. }
                | ApiError::Json(_) => {
                    "Unexpected response from YouTrack. Please try again.".to_string()
                }
                ApiError::MissingSessionCookie => {
                    "Login succeeded but no session was returned.".to_string()
                }
                ApiError::Network(_) => {
                    "Connection failed. Please check your network and server URL.".to_string()
                }
                ApiError::Keyring(_) => {
                    "Could not access secure storage. Please store the profile's token again."
                        .to_string()
                }
                ApiError::Io(_) => "A file operation failed.".to_string(),
                ApiError::InvalidInput(msg) => format!("Invalid input: {}", msg),
            },
            AppError::Io(_) => "A file operation failed. Please check file permissions.".to_string(),
            AppError::Other(msg) => msg.clone(),
        }
    }

    /// Check if this error is critical.
    ///
    /// Critical errors prevent any further work, such as configuration or
    /// authentication problems.
    pub fn is_critical(&self) -> bool {
        match self {
            AppError::Config(_) => true,
            AppError::Api(ApiError::Keyring(_)) | AppError::Api(ApiError::MissingSessionCookie) => true,
            AppError::Api(e) => matches!(
                e.status(),
                Some(StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
            ),
            _ => false,
        }
    }

    /// Check if this error is recoverable by trying again later.
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::Api(ApiError::Network(_)) => true,
            AppError::Api(e) => match e.status() {
                Some(status) => status.is_server_error() || status == StatusCode::NOT_FOUND,
                None => false,
            },
            _ => false,
        }
    }

    /// Get a suggested action for the user.
    pub fn suggested_action(&self) -> Option<&'static str> {
        match self {
            AppError::Config(ConfigError::NoConfigDir)
            | AppError::Config(ConfigError::ProfileNotFound(_)) => {
                Some("Add a [[profiles]] entry to the configuration file.")
            }
            AppError::Api(ApiError::Keyring(_)) => Some("Run 'ytc token set <profile> <token>'."),
            AppError::Api(e) if e.status() == Some(StatusCode::UNAUTHORIZED) => {
                Some("Check the profile's token or password with 'ytc token set'.")
            }
            AppError::Api(ApiError::Network(_)) => {
                Some("Check your network connection and the profile URL.")
            }
            _ => None,
        }
    }
}

/// Result type for application operations.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderMap;

    fn status(code: StatusCode) -> AppError {
        AppError::Api(ApiError::status_error("/issue/ABC-1", code, HeaderMap::new(), b""))
    }

    #[test]
    fn test_app_error_from_config_error() {
        let config_err = ConfigError::NoConfigDir;
        let app_err: AppError = config_err.into();
        assert!(matches!(app_err, AppError::Config(ConfigError::NoConfigDir)));
    }

    #[test]
    fn test_app_error_from_api_error() {
        let api_err = ApiError::MissingSessionCookie;
        let app_err: AppError = api_err.into();
        assert!(matches!(app_err, AppError::Api(ApiError::MissingSessionCookie)));
    }

    #[test]
    fn test_user_message_unauthorized() {
        let msg = status(StatusCode::UNAUTHORIZED).user_message();
        assert!(msg.contains("Authentication failed"));
    }

    #[test]
    fn test_user_message_not_found() {
        let msg = status(StatusCode::NOT_FOUND).user_message();
        assert!(msg.contains("/issue/ABC-1"));
        assert!(msg.contains("not found"));
    }

    #[test]
    fn test_user_message_config_validation() {
        let err = AppError::Config(ConfigError::ValidationError("duplicate profile".to_string()));
        assert!(err.user_message().contains("duplicate profile"));
    }

    #[test]
    fn test_is_critical() {
        assert!(status(StatusCode::UNAUTHORIZED).is_critical());
        assert!(status(StatusCode::FORBIDDEN).is_critical());
        assert!(AppError::Config(ConfigError::NoConfigDir).is_critical());
        assert!(!status(StatusCode::GATEWAY_TIMEOUT).is_critical());
    }

    #[test]
    fn test_is_recoverable() {
        assert!(status(StatusCode::GATEWAY_TIMEOUT).is_recoverable());
        assert!(status(StatusCode::NOT_FOUND).is_recoverable());
        assert!(!status(StatusCode::UNAUTHORIZED).is_recoverable());
        assert!(!AppError::other("x").is_recoverable());
    }

    #[test]
    fn test_suggested_action_unauthorized() {
        let action = status(StatusCode::UNAUTHORIZED).suggested_action();
        assert!(action.unwrap().contains("token set"));
    }

    #[test]
    fn test_other_error() {
        let err = AppError::other("something went wrong");
        assert!(matches!(err, AppError::Other(_)));
        assert_eq!(err.user_message(), "something went wrong");
    }
}
