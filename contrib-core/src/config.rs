//! Listing configuration
//!
//! Where the catalog is published and how it is fetched. Stored as YAML in
//! the platform config directory:
//!
//! ```yaml
//! catalog_url: https://contributions.example.org/contributions.xml
//! timeout_seconds: 30
//! user_agent: contrib/0.1.0
//! ```
//!
//! A missing file means defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default catalog location
pub const DEFAULT_CATALOG_URL: &str = "https://contributions.processing.org/contributions.xml";

/// Default HTTP timeout
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Config file name inside the config directory
const CONFIG_FILE: &str = "listing.yaml";

fn default_catalog_url() -> String {
    DEFAULT_CATALOG_URL.to_string()
}

fn default_timeout_seconds() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}

fn default_user_agent() -> String {
    concat!("contrib/", env!("CARGO_PKG_VERSION")).to_string()
}

/// Catalog source settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingConfig {
    /// URL (or `file://` path) of the published catalog
    #[serde(default = "default_catalog_url")]
    pub catalog_url: String,

    /// HTTP timeout applied by the HTTP downloader
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// User agent sent with catalog requests
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            catalog_url: default_catalog_url(),
            timeout_seconds: default_timeout_seconds(),
            user_agent: default_user_agent(),
        }
    }
}

impl ListingConfig {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::default_config_path()?)
    }

    /// Load configuration from a specific path, falling back to defaults
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No listing config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read listing config: {}", path.display()))?;
        let config: Self = serde_yaml_ng::from_str(&content)
            .with_context(|| format!("Failed to parse listing config: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        self.validate()?;

        let content =
            serde_yaml_ng::to_string(self).context("Failed to serialize listing config")?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write listing config: {}", path.display()))
    }

    /// Check the catalog URL scheme
    pub fn validate(&self) -> Result<()> {
        let url = &self.catalog_url;
        if !url.starts_with("http://") && !url.starts_with("https://") && !url.starts_with("file://")
        {
            anyhow::bail!("Catalog URL must start with http://, https:// or file://");
        }
        Ok(())
    }

    /// Default config file path
    pub fn default_config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE))
    }

    fn config_dir() -> Result<PathBuf> {
        directories::ProjectDirs::from("org", "processing", "contrib")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .or_else(|| dirs::config_dir().map(|d| d.join("contrib")))
            .context("Could not determine config directory")
    }
}

#[cfg(test)]
mod config_tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = ListingConfig::load_from_path(&temp_dir.path().join("listing.yaml")).unwrap();
        assert_eq!(config, ListingConfig::default());
        assert_eq!(config.catalog_url, DEFAULT_CATALOG_URL);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("listing.yaml");
        std::fs::write(&path, "catalog_url: file:///srv/contributions.xml\n").unwrap();

        let config = ListingConfig::load_from_path(&path).unwrap();
        assert_eq!(config.catalog_url, "file:///srv/contributions.xml");
        assert_eq!(config.timeout_seconds, DEFAULT_TIMEOUT_SECONDS);
    }

    #[test]
    fn test_rejects_unknown_scheme() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("listing.yaml");
        std::fs::write(&path, "catalog_url: ftp://example.com/list.xml\n").unwrap();

        let err = ListingConfig::load_from_path(&path).unwrap_err();
        assert!(err.to_string().contains("Catalog URL"));
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("listing.yaml");

        let config = ListingConfig {
            catalog_url: "https://mirror.example.com/contributions.xml".to_string(),
            timeout_seconds: 5,
            ..Default::default()
        };
        config.save_to_path(&path).unwrap();

        assert_eq!(ListingConfig::load_from_path(&path).unwrap(), config);
    }
}
