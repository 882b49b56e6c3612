//! youtrack-client - a client for the YouTrack legacy REST API.
//!
//! The [`api::Connection`] type owns one authenticated session and exposes
//! the issue, administration, custom field and time tracking operations.

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
