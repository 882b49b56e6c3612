//! API error types for the YouTrack client.

use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use thiserror::Error;

use super::xml::XmlError;

/// Errors that can occur when talking to the YouTrack API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with a status the call does not accept.
    #[error("{path}: HTTP {status}: {body}")]
    Status {
        path: String,
        status: StatusCode,
        headers: HeaderMap,
        body: String,
    },

    /// A read expected content and got an empty body.
    #[error("{path}: empty content")]
    EmptyContent { path: String },

    /// A read expected XML and got something malformed.
    #[error("{path}: {message}")]
    Xml {
        path: String,
        message: String,
        body: String,
    },

    /// The response was not of the shape a record needs.
    #[error("{path}: expected {expected}")]
    UnexpectedResponse {
        path: String,
        expected: &'static str,
    },

    /// The login endpoint answered 200 without setting a session cookie.
    #[error("Login succeeded but no session cookie was returned")]
    MissingSessionCookie,

    /// Network or HTTP error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON body could not be decoded.
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Local file access for attachments failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Keyring error when storing/retrieving secrets.
    #[error("Keyring error: {0}")]
    Keyring(String),

    /// The caller passed something the API cannot express.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;

impl ApiError {
    /// Build a status error from a failed response.
    pub fn status_error(path: &str, status: StatusCode, headers: HeaderMap, body: &[u8]) -> Self {
        ApiError::Status {
            path: path.to_string(),
            status,
            headers,
            body: String::from_utf8_lossy(body).into_owned(),
        }
    }

    /// Build a strict-path XML error.
    pub fn xml(path: &str, err: XmlError, body: &[u8]) -> Self {
        ApiError::Xml {
            path: path.to_string(),
            message: err.to_string(),
            body: String::from_utf8_lossy(body).into_owned(),
        }
    }

    /// The HTTP status carried by this error, if it came from a response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the request core may retry this error (401, 403, 500, 504).
    pub fn is_session_or_overload(&self) -> bool {
        matches!(
            self.status(),
            Some(
                StatusCode::UNAUTHORIZED
                    | StatusCode::FORBIDDEN
                    | StatusCode::INTERNAL_SERVER_ERROR
                    | StatusCode::GATEWAY_TIMEOUT
            )
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: StatusCode) -> ApiError {
        ApiError::status_error("/issue/X-1", code, HeaderMap::new(), b"denied")
    }

    #[test]
    fn test_status_error_carries_path_and_body() {
        match status(StatusCode::NOT_FOUND) {
            ApiError::Status { path, status, body, .. } => {
                assert_eq!(path, "/issue/X-1");
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(body, "denied");
            }
            other => panic!("Expected Status error, got {:?}", other),
        }
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(status(StatusCode::UNAUTHORIZED).is_session_or_overload());
        assert!(status(StatusCode::FORBIDDEN).is_session_or_overload());
        assert!(status(StatusCode::INTERNAL_SERVER_ERROR).is_session_or_overload());
        assert!(status(StatusCode::GATEWAY_TIMEOUT).is_session_or_overload());
    }

    #[test]
    fn test_not_retryable_statuses() {
        assert!(!status(StatusCode::BAD_REQUEST).is_session_or_overload());
        assert!(!status(StatusCode::NOT_FOUND).is_session_or_overload());
        assert!(!ApiError::MissingSessionCookie.is_session_or_overload());
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::EmptyContent {
            path: "/issue/X-1/comment".to_string(),
        };
        assert_eq!(err.to_string(), "/issue/X-1/comment: empty content");

        assert_eq!(
            status(StatusCode::BAD_REQUEST).to_string(),
            "/issue/X-1: HTTP 400 Bad Request: denied"
        );
    }
}
