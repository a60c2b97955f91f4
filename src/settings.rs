use crate::types::AlbumMonitor;
use crate::{LidarrError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Saved server address and key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSettings {
    pub base_url: String,
    pub api_key: String,
}

/// Saved choices for adding artists without prompting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistDefaults {
    pub root_folder_path: String,
    pub quality_profile_id: i64,
    pub metadata_profile_id: i64,
    pub monitored: bool,
    pub album_monitor_option: AlbumMonitor,
    #[serde(default)]
    pub tag_ids: Vec<i64>,
}

/// On-disk layout of the settings file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<ConnectionSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist_defaults: Option<ArtistDefaults>,
}

/// Settings persisted as JSON, by default in
/// `~/.config/lidarr-api/defaults.json`.
///
/// A missing or unreadable file behaves like an empty one. Nothing is
/// written until one of the `save*` methods is called.
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    settings: Settings,
}

impl SettingsStore {
    /// Get the default settings path using XDG directories.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| LidarrError::Config("Cannot determine XDG config directory".to_string()))?;
        Ok(config_dir.join("lidarr-api").join("defaults.json"))
    }

    /// Load settings from `path`, or from [`default_path`](Self::default_path).
    pub fn open(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };
        let settings = Self::load(&path);
        Ok(Self { path, settings })
    }

    fn load(path: &Path) -> Settings {
        if !path.exists() {
            return Settings::default();
        }

        let parsed = fs::read_to_string(path)
            .map_err(LidarrError::from)
            .and_then(|content| serde_json::from_str(&content).map_err(LidarrError::from));

        match parsed {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Ignoring unreadable settings file {}: {e}", path.display());
                Settings::default()
            }
        }
    }

    /// Write the current settings, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.settings)
            .map_err(|e| LidarrError::InvalidData(format!("Failed to serialize settings: {e}")))?;
        fs::write(&self.path, content)?;

        log::debug!("Settings saved to: {}", self.path.display());
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn connection(&self) -> Option<&ConnectionSettings> {
        self.settings.connection.as_ref()
    }

    pub fn save_connection(&mut self, base_url: &str, api_key: &str) -> Result<()> {
        self.settings.connection = Some(ConnectionSettings {
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
        });
        self.save()
    }

    pub fn artist_defaults(&self) -> Option<&ArtistDefaults> {
        self.settings.artist_defaults.as_ref()
    }

    pub fn save_artist_defaults(&mut self, defaults: ArtistDefaults) -> Result<()> {
        self.settings.artist_defaults = Some(defaults);
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_defaults() -> ArtistDefaults {
        ArtistDefaults {
            root_folder_path: "/music".to_string(),
            quality_profile_id: 1,
            metadata_profile_id: 1,
            monitored: true,
            album_monitor_option: AlbumMonitor::Future,
            tag_ids: vec![3],
        }
    }

    #[test]
    fn test_missing_file_gives_empty_settings() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::open(Some(dir.path().join("defaults.json"))).unwrap();
        assert!(store.connection().is_none());
        assert!(store.artist_defaults().is_none());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("defaults.json");

        let mut store = SettingsStore::open(Some(path.clone())).unwrap();
        store
            .save_connection("http://lidarr:8686", "secret")
            .unwrap();
        store.save_artist_defaults(sample_defaults()).unwrap();

        let reloaded = SettingsStore::open(Some(path.clone())).unwrap();
        assert_eq!(reloaded.connection().unwrap().base_url, "http://lidarr:8686");
        assert_eq!(reloaded.artist_defaults(), Some(&sample_defaults()));

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["artist_defaults"]["album_monitor_option"], 2);
        assert_eq!(raw["connection"]["api_key"], "secret");
    }

    #[test]
    fn test_corrupt_file_is_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("defaults.json");
        fs::write(&path, "{not json").unwrap();

        let store = SettingsStore::open(Some(path)).unwrap();
        assert_eq!(store.settings(), &Settings::default());
    }
}
