//! Configuration management for aipsync.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::record::Category;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "aipsync";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "aip.db";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `AIPSYNC_`, nested keys split on `__`)
/// 2. TOML config file at `~/.config/aipsync/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Publication API configuration.
    pub remote: RemoteConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/aipsync/aip.db`
    pub database_path: Option<PathBuf>,
}

/// Publication API configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL every endpoint path is joined to.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Endpoint paths, relative to `base_url`.
    pub endpoints: EndpointConfig,
}

/// Endpoint paths of the publication API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Version descriptor.
    pub version: String,
    /// Aerodrome records.
    pub ad: String,
    /// Enroute records.
    pub enr: String,
    /// Amendment records.
    pub amdt: String,
    /// Supplement records.
    pub sup: String,
    /// NOTAM records.
    pub notam: String,
    /// Information circular records.
    pub aic: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_secs: 10,
            endpoints: EndpointConfig::default(),
        }
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            version: "aip/version".to_string(),
            ad: "aip/ad".to_string(),
            enr: "aip/enr".to_string(),
            amdt: "aip/amdt".to_string(),
            sup: "aip/sup".to_string(),
            notam: "aip/notam".to_string(),
            aic: "aip/aic".to_string(),
        }
    }
}

impl EndpointConfig {
    /// Endpoint path for a category.
    #[must_use]
    pub fn for_category(&self, category: Category) -> &str {
        match category {
            Category::Ad => &self.ad,
            Category::Enr => &self.enr,
            Category::Amdt => &self.amdt,
            Category::Sup => &self.sup,
            Category::Notam => &self.notam,
            Category::Aic => &self.aic,
        }
    }
}

impl RemoteConfig {
    /// Join an endpoint path onto the base URL.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Get the request timeout as a Duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("AIPSYNC_").split("__"));

        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        let base_url = self.remote.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(Error::ConfigValidation {
                message: format!("base_url must be an http(s) URL, got '{base_url}'"),
            });
        }

        if self.remote.timeout_secs == 0 {
            return Err(Error::ConfigValidation {
                message: "timeout_secs must be greater than 0".to_string(),
            });
        }

        let endpoints = &self.remote.endpoints;
        if endpoints.version.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "endpoint for version must not be empty".to_string(),
            });
        }
        for category in Category::ALL {
            if endpoints.for_category(category).trim().is_empty() {
                return Err(Error::ConfigValidation {
                    message: format!("endpoint for {} must not be empty", category.as_str()),
                });
            }
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_remote_config() {
        let remote = RemoteConfig::default();

        assert_eq!(remote.base_url, "http://localhost:8080");
        assert_eq!(remote.timeout_secs, 10);
        assert_eq!(remote.timeout(), Duration::from_secs(10));
        assert_eq!(remote.endpoints.version, "aip/version");
    }

    #[test]
    fn test_endpoint_for_each_category() {
        let endpoints = EndpointConfig::default();
        for category in Category::ALL {
            let path = endpoints.for_category(category);
            assert!(path.ends_with(category.as_str()), "{path}");
        }
    }

    #[test]
    fn test_url_joining() {
        let mut remote = RemoteConfig::default();
        remote.base_url = "https://aip.example.org/api/".to_string();

        assert_eq!(
            remote.url("/aip/version"),
            "https://aip.example.org/api/aip/version"
        );
        assert_eq!(remote.url("aip/ad"), "https://aip.example.org/api/aip/ad");
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_non_http_base_url() {
        let mut config = Config::default();
        config.remote.base_url = "ftp://aip.example.org".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("base_url"));
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = Config::default();
        config.remote.timeout_secs = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("timeout_secs"));
    }

    #[test]
    fn test_validate_empty_endpoint() {
        let mut config = Config::default();
        config.remote.endpoints.notam = "  ".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("notam"));
    }

    #[test]
    fn test_database_path_default() {
        let config = Config::default();
        assert!(config.database_path().to_string_lossy().contains("aip.db"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/custom/path/aip.sqlite"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/aip.sqlite")
        );
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("aipsync"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        // A missing file falls back to defaults.
        let config = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_toml_file() {
        let path = std::env::temp_dir().join(format!("aipsync_config_{}.toml", std::process::id()));
        std::fs::write(
            &path,
            "[remote]\nbase_url = \"https://aip.example.org\"\ntimeout_secs = 30\n\n[remote.endpoints]\nad = \"charts/ad.json\"\n",
        )
        .unwrap();

        let config = Config::load_from(Some(path.clone())).unwrap();
        assert_eq!(config.remote.base_url, "https://aip.example.org");
        assert_eq!(config.remote.timeout_secs, 30);
        assert_eq!(config.remote.endpoints.ad, "charts/ad.json");
        // Unset keys keep their defaults.
        assert_eq!(config.remote.endpoints.enr, "aip/enr");

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let path = std::env::temp_dir().join(format!(
            "aipsync_bad_config_{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "[remote]\ntimeout_secs = 0\n").unwrap();

        let result = Config::load_from(Some(path.clone()));
        assert!(matches!(result, Err(Error::ConfigValidation { .. })));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_remote_config_deserialize() {
        let json = r#"{"base_url": "https://x.example", "endpoints": {"version": "v"}}"#;
        let remote: RemoteConfig = serde_json::from_str(json).unwrap();
        assert_eq!(remote.base_url, "https://x.example");
        assert_eq!(remote.timeout_secs, 10);
        assert_eq!(remote.endpoints.version, "v");
        assert_eq!(remote.endpoints.aic, "aip/aic");
    }
}
