//! Configuration management for the YouTrack client.
//!
//! This module handles loading, saving, and managing user configuration
//! including server profiles and client settings.

mod profile;
mod settings;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

pub use profile::Profile;
pub use settings::Settings;

/// Directory name under the platform config directory.
const APP_DIR: &str = "youtrack-client";

const CONFIG_FILE: &str = "config.toml";

/// Environment variable that overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "YOUTRACK_CLIENT_CONFIG";

/// Errors from loading, saving or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine configuration directory")]
    NoConfigDir,

    #[error("failed to create configuration directory: {0}")]
    CreateDirError(#[source] std::io::Error),

    #[error("failed to read configuration file: {0}")]
    ReadError(#[source] std::io::Error),

    #[error("failed to write configuration file: {0}")]
    WriteError(#[source] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("failed to serialize configuration: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("invalid configuration: {0}")]
    ValidationError(String),

    #[error("profile '{0}' not found")]
    ProfileNotFound(String),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// The whole configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub profiles: Vec<Profile>,
}

impl Config {
    /// Location of the config file: `$YOUTRACK_CLIENT_CONFIG`, or
    /// `<config_dir>/youtrack-client/config.toml`.
    pub fn config_path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }
        let base = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(base.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load the config file. A missing file yields the defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;

        info!(path = %path.display(), profiles = config.profiles.len(), "Configuration loaded");
        Ok(config)
    }

    /// Save to the default location.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::CreateDirError)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(ConfigError::WriteError)?;

        info!(path = %path.display(), "Configuration saved");
        Ok(())
    }

    /// Validate every profile, name uniqueness and the default profile.
    pub fn validate(&self) -> Result<()> {
        for (i, profile) in self.profiles.iter().enumerate() {
            profile.validate()?;
            if self.profiles[..i].iter().any(|p| p.name == profile.name) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate profile name '{}'",
                    profile.name
                )));
            }
        }

        if let Some(default) = &self.settings.default_profile {
            if !self.profiles.iter().any(|p| &p.name == default) {
                return Err(ConfigError::ValidationError(format!(
                    "default profile '{}' does not exist",
                    default
                )));
            }
        }

        Ok(())
    }

    pub fn profile(&self, name: &str) -> Result<&Profile> {
        self.profiles
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| ConfigError::ProfileNotFound(name.to_string()))
    }

    /// The configured default profile, or the first one.
    pub fn default_profile(&self) -> Option<&Profile> {
        match &self.settings.default_profile {
            Some(name) => self.profiles.iter().find(|p| &p.name == name),
            None => self.profiles.first(),
        }
    }

    /// The named profile, or the default one when no name is given.
    pub fn resolve_profile(&self, name: Option<&str>) -> Result<&Profile> {
        match name {
            Some(name) => self.profile(name),
            None => self
                .default_profile()
                .ok_or_else(|| ConfigError::ProfileNotFound("<default>".to_string())),
        }
    }

    /// Add a profile after validating it.
    pub fn add_profile(&mut self, profile: Profile) -> Result<()> {
        profile.validate()?;
        if self.profiles.iter().any(|p| p.name == profile.name) {
            return Err(ConfigError::ValidationError(format!(
                "profile '{}' already exists",
                profile.name
            )));
        }
        self.profiles.push(profile);
        Ok(())
    }

    /// Remove a profile, clearing the default if it pointed there.
    pub fn remove_profile(&mut self, name: &str) -> Result<Profile> {
        let index = self
            .profiles
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| ConfigError::ProfileNotFound(name.to_string()))?;

        if self.settings.default_profile.as_deref() == Some(name) {
            self.settings.default_profile = None;
        }
        Ok(self.profiles.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn profile(name: &str) -> Profile {
        Profile::new(name.to_string(), "https://yt.example.com".to_string())
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.add_profile(profile("work")).unwrap();
        config.settings.default_profile = Some("work".to_string());
        config.settings.gateway_timeout_backoff_secs = 0;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_parse_error_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "profiles = 3").unwrap();

        assert!(matches!(Config::load_from(&path), Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_duplicate_profiles_rejected() {
        let config = Config {
            settings: Settings::default(),
            profiles: vec![profile("work"), profile("work")],
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate profile"));
    }

    #[test]
    fn test_unknown_default_profile_rejected() {
        let mut config = Config::default();
        config.settings.default_profile = Some("missing".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolve_profile() {
        let mut config = Config::default();
        config.add_profile(profile("work")).unwrap();
        config.add_profile(profile("home")).unwrap();

        assert_eq!(config.resolve_profile(None).unwrap().name, "work");
        assert_eq!(config.resolve_profile(Some("home")).unwrap().name, "home");
        assert!(matches!(
            config.resolve_profile(Some("nope")),
            Err(ConfigError::ProfileNotFound(_))
        ));

        config.settings.default_profile = Some("home".to_string());
        assert_eq!(config.resolve_profile(None).unwrap().name, "home");
    }

    #[test]
    fn test_remove_profile_clears_default() {
        let mut config = Config::default();
        config.add_profile(profile("work")).unwrap();
        config.settings.default_profile = Some("work".to_string());

        config.remove_profile("work").unwrap();
        assert!(config.settings.default_profile.is_none());
        assert!(config.profiles.is_empty());
    }

    #[test]
    #[serial]
    fn test_config_path_env_override() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        std::env::set_var(CONFIG_PATH_ENV, &path);

        let resolved = Config::config_path();
        std::env::remove_var(CONFIG_PATH_ENV);

        assert_eq!(resolved.unwrap(), path);
    }

    #[test]
    #[serial]
    fn test_load_uses_env_override() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[settings]\ndefault_profile = \"work\"\n\n[[profiles]]\nname = \"work\"\nurl = \"https://yt.example.com\"\nlogin = \"root\"\n",
        )
        .unwrap();
        std::env::set_var(CONFIG_PATH_ENV, &path);

        let loaded = Config::load();
        std::env::remove_var(CONFIG_PATH_ENV);

        let config = loaded.unwrap();
        assert_eq!(config.profiles[0].login.as_deref(), Some("root"));
        assert_eq!(config.settings.request_timeout_secs, 30);
    }
}
