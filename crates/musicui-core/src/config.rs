use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::platform;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub mpv: MpvConfig,
}

/// Where the song collection lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Collection read endpoint (`.../items/songs`).
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Base path that cover asset identifiers are resolved against.
    #[serde(default = "default_asset_base")]
    pub asset_base: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MpvConfig {
    #[serde(default = "default_volume")]
    pub default_volume: f32,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            asset_base: default_asset_base(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for MpvConfig {
    fn default() -> Self {
        Self {
            default_volume: default_volume(),
        }
    }
}

fn default_endpoint() -> String {
    "https://cms.samespace.com/items/songs".to_string()
}

fn default_asset_base() -> String {
    "https://cms.samespace.com/assets".to_string()
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_volume() -> f32 {
    0.5
}

impl Config {
    /// Load the user config, writing the defaults on first run.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [catalog]
            endpoint = "http://127.0.0.1:9000/items/songs"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.catalog.endpoint, "http://127.0.0.1:9000/items/songs");
        assert_eq!(cfg.catalog.asset_base, "https://cms.samespace.com/assets");
        assert_eq!(cfg.catalog.request_timeout_secs, 15);
        assert_eq!(cfg.mpv.default_volume, 0.5);
    }

    #[test]
    fn test_empty_toml() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.catalog.endpoint, default_endpoint());
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.mpv.default_volume = 0.8;
        cfg.catalog.request_timeout_secs = 3;
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.mpv.default_volume, 0.8);
        assert_eq!(loaded.catalog.request_timeout_secs, 3);
        assert_eq!(loaded.catalog.endpoint, cfg.catalog.endpoint);
    }
}
