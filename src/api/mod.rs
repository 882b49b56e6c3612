//! YouTrack REST API client and types.
//!
//! This module provides the interface for communicating with the legacy
//! XML REST API of a YouTrack server.

mod admin;
mod auth;
mod client;
mod error;
mod fields;
mod import;
mod issues;
mod projects;
mod response;
mod timetracking;
pub mod types;
pub mod xml;

pub use auth::{cookie_header, delete_secret, get_secret, store_secret, AuthHeader, Credentials, Session};
pub use client::{redact_system_users, ApiRequest, Connection, ConnectionOptions, MAX_ATTEMPTS};
pub use error::{ApiError, Result};
pub use import::{
    issues_xml, links_xml, users_xml, work_items_xml, DenyList, ImportItem, ImportLink,
    ImportOptions, ImportReport, ImportUser, IssueRecord, IssuesXml, DENIED_ISSUE_FIELDS,
};
pub use issues::{Command, IntelliSenseOptions, NewAttachment, NewIssue};
pub use response::{Parsed, RawResponse};
