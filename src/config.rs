//! Configuration management for Bookcrawl.
//!
//! Handles loading, saving, and validating configuration from
//! platform-specific config directories.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Application name used for config directory.
const APP_NAME: &str = "Bookcrawl";

/// Default config filename.
const CONFIG_FILENAME: &str = "config.toml";

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Target site layout.
    pub site: SiteConfig,

    /// HTTP and cooldown settings.
    pub network: NetworkConfig,

    /// Output locations.
    pub paths: PathsConfig,
}

/// Where the catalog lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Site root; detail pages are `{base_url}/b{id}/`.
    pub base_url: String,

    /// Catalog section relative to the base URL.
    pub category_path: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://tululu.org".to_string(),
            category_path: "l55/".to_string(),
        }
    }
}

impl SiteConfig {
    /// Returns the base URL with a trailing slash so `join` appends to it.
    pub fn base(&self) -> Result<Url, ConfigError> {
        let mut raw = self.base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        Url::parse(&raw).map_err(|e| ConfigError::InvalidValue {
            key: "site.base_url".to_string(),
            message: e.to_string(),
        })
    }

    /// Returns the first page of the catalog section.
    pub fn category_url(&self) -> Result<Url, ConfigError> {
        let mut path = self.category_path.trim_start_matches('/').to_string();
        if !path.ends_with('/') {
            path.push('/');
        }
        self.base()?
            .join(&path)
            .map_err(|e| ConfigError::InvalidValue {
                key: "site.category_path".to_string(),
                message: e.to_string(),
            })
    }
}

/// HTTP and cooldown configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Wait before the next book request after a network failure.
    pub cooldown_sec: f64,

    /// Wait before the next catalog page after a network failure.
    pub page_cooldown_sec: f64,

    /// Whole-request timeout in seconds.
    pub request_timeout_sec: f64,

    /// User agent sent with every request.
    pub user_agent: String,

    /// Print every request and its classification to stderr.
    pub debug: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            cooldown_sec: 60.0,
            page_cooldown_sec: 60.0,
            request_timeout_sec: 30.0,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            debug: false,
        }
    }
}

impl NetworkConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs_f64(self.cooldown_sec.max(0.0))
    }

    pub fn page_cooldown(&self) -> Duration {
        Duration::from_secs_f64(self.page_cooldown_sec.max(0.0))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.request_timeout_sec.max(0.0))
    }
}

/// File path configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Root of everything the run writes.
    pub dest_folder: PathBuf,

    /// Text subdirectory under `dest_folder`.
    pub books_dir: String,

    /// Cover image subdirectory under `dest_folder`.
    pub images_dir: String,

    /// Snapshot file. Relative paths are taken from `dest_folder`.
    pub description_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            dest_folder: PathBuf::from("."),
            books_dir: "books".to_string(),
            images_dir: "images".to_string(),
            description_file: PathBuf::from("books_description.json"),
        }
    }
}

impl PathsConfig {
    pub fn books_path(&self) -> PathBuf {
        self.dest_folder.join(&self.books_dir)
    }

    pub fn images_path(&self) -> PathBuf {
        self.dest_folder.join(&self.images_dir)
    }

    pub fn description_path(&self) -> PathBuf {
        if self.description_file.is_absolute() {
            self.description_file.clone()
        } else {
            self.dest_folder.join(&self.description_file)
        }
    }
}

impl Config {
    /// Returns the platform-specific config directory path.
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|p| p.join(APP_NAME))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Returns the full path to the config file.
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join(CONFIG_FILENAME))
    }

    /// Loads configuration from the default location.
    ///
    /// If the config file doesn't exist, creates a default one.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let config = Config::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Saves configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.site.category_url()?;

        for (key, value) in [
            ("network.cooldown_sec", self.network.cooldown_sec),
            ("network.page_cooldown_sec", self.network.page_cooldown_sec),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: "must be a non-negative number".to_string(),
                });
            }
        }

        if !self.network.request_timeout_sec.is_finite() || self.network.request_timeout_sec <= 0.0
        {
            return Err(ConfigError::InvalidValue {
                key: "network.request_timeout_sec".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.site.base_url, "https://tululu.org");
        assert_eq!(config.network.cooldown(), Duration::from_secs(60));
        assert_eq!(config.paths.books_dir, "books");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_site_urls() {
        let site = SiteConfig::default();
        assert_eq!(site.base().unwrap().as_str(), "https://tululu.org/");
        assert_eq!(
            site.category_url().unwrap().as_str(),
            "https://tululu.org/l55/"
        );

        let site = SiteConfig {
            base_url: "http://127.0.0.1:8080/".to_string(),
            category_path: "/l55".to_string(),
        };
        assert_eq!(
            site.category_url().unwrap().as_str(),
            "http://127.0.0.1:8080/l55/"
        );
    }

    #[test]
    fn test_config_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILENAME);

        // Missing file is created with defaults.
        let created = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(created.network.request_timeout_sec, 30.0);

        let mut config = Config::default();
        config.network.cooldown_sec = 5.0;
        config.paths.dest_folder = PathBuf::from("/tmp/library");
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.network.cooldown_sec, 5.0);
        assert_eq!(loaded.paths.books_path(), PathBuf::from("/tmp/library/books"));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "[network]\ncooldown_sec = 2.5\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.network.cooldown_sec, 2.5);
        assert_eq!(config.network.page_cooldown_sec, 60.0);
        assert_eq!(config.site.category_path, "l55/");
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.network.cooldown_sec = -1.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.network.request_timeout_sec = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.site.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_description_path() {
        let mut paths = PathsConfig {
            dest_folder: PathBuf::from("out"),
            ..PathsConfig::default()
        };
        assert_eq!(
            paths.description_path(),
            PathBuf::from("out/books_description.json")
        );

        paths.description_file = PathBuf::from("/var/data/books.json");
        assert_eq!(paths.description_path(), PathBuf::from("/var/data/books.json"));
    }
}
