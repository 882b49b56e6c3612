//! Raw responses and the result of lenient response parsing.

use std::fmt;

use reqwest::header::{HeaderMap, CONTENT_TYPE, LOCATION};
use reqwest::StatusCode;

use super::error::{ApiError, Result};
use super::xml::Element;

/// A completed HTTP exchange with its (already redacted) body.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Look up a response header as text.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The declared content type, if any.
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// The `Location` header, if any.
    pub fn location(&self) -> Option<&str> {
        self.headers.get(LOCATION).and_then(|v| v.to_str().ok())
    }

    /// The body decoded as UTF-8 (lossy).
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// What the lenient request path produced.
#[derive(Debug, Clone)]
pub enum Parsed {
    /// An XML document (its root element).
    Xml(Element),
    /// A JSON document.
    Json(serde_json::Value),
    /// A PUT answered with a `Location` header.
    Created(String),
    /// The body, untouched.
    Raw(Vec<u8>),
    /// The body claimed to be XML or JSON but could not be parsed.
    Unparsed,
}

impl Parsed {
    /// True for the unparsed sentinel and for an empty raw body.
    pub fn is_empty(&self) -> bool {
        match self {
            Parsed::Unparsed => true,
            Parsed::Raw(body) => body.is_empty(),
            _ => false,
        }
    }

    /// Borrow the XML root, if this is an XML document.
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Parsed::Xml(el) => Some(el),
            _ => None,
        }
    }

    /// Take the XML root, failing when the response was anything else.
    pub fn into_element(self, path: &str) -> Result<Element> {
        match self {
            Parsed::Xml(el) => Ok(el),
            _ => Err(ApiError::UnexpectedResponse {
                path: path.to_string(),
                expected: "an XML document",
            }),
        }
    }

    /// Render the result as text, the way callers of import endpoints see it.
    pub fn into_text(self) -> String {
        match self {
            Parsed::Xml(el) => el.to_xml(),
            Parsed::Json(value) => value.to_string(),
            Parsed::Created(location) => format!("Created: {}", location),
            Parsed::Raw(body) => String::from_utf8_lossy(&body).into_owned(),
            Parsed::Unparsed => String::new(),
        }
    }
}

impl fmt::Display for Parsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.clone().into_text())
    }
}
