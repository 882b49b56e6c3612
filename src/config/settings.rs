//! Client settings configuration.

use serde::{Deserialize, Serialize};

/// Client-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// The name of the default profile to use.
    pub default_profile: Option<String>,
    /// Timeout for a single HTTP request, in seconds.
    pub request_timeout_secs: u64,
    /// Sleep after a gateway timeout before retrying, in seconds.
    pub gateway_timeout_backoff_secs: u64,
    /// Delay between polls while the server is still counting issues.
    pub count_poll_interval_secs: u64,
    /// Records resubmitted one by one after an empty bulk import response.
    /// Unset means all of them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub import_fallback_budget: Option<usize>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_profile: None,
            request_timeout_secs: 30,
            gateway_timeout_backoff_secs: 30,
            count_poll_interval_secs: 5,
            import_fallback_budget: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_keys_use_defaults() {
        let settings: Settings = toml::from_str("request_timeout_secs = 10").unwrap();
        assert_eq!(settings.request_timeout_secs, 10);
        assert_eq!(settings.gateway_timeout_backoff_secs, 30);
        assert_eq!(settings.count_poll_interval_secs, 5);
        assert_eq!(settings.import_fallback_budget, None);
    }
}
