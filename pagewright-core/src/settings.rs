//! Key-value settings persistence for [`Configuration`]
//!
//! Configuration is stored field by field so a bad or missing value only
//! falls back to its own default.

use crate::error::ConfigError;
use crate::types::Configuration;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A string key-value store
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError>;

    fn remove(&mut self, key: &str) -> Result<(), ConfigError>;

    /// Set several keys at once
    fn set_many(&mut self, entries: &[(&str, String)]) -> Result<(), ConfigError> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }
}

/// In-memory store (for tests and ephemeral sessions)
#[derive(Debug, Clone, Default)]
pub struct MemorySettings {
    values: BTreeMap<String, String>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), ConfigError> {
        self.values.remove(key);
        Ok(())
    }
}

/// Store backed by a JSON object on disk.
///
/// Every change rewrites the file through a temp file and a rename, so a
/// crash never leaves a half-written settings file.
#[derive(Debug, Clone)]
pub struct JsonFileSettings {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl JsonFileSettings {
    /// Open the store at `path`; a missing file is an empty store
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => serde_json::from_str(&text)
                .map_err(|e| ConfigError::Store(format!("{}: {}", path.display(), e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(ConfigError::Store(format!("{}: {}", path.display(), e))),
        };
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), ConfigError> {
        let store_err = |e: std::io::Error| ConfigError::Store(format!("{}: {}", self.path.display(), e));

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(store_err)?;
        }
        let data = serde_json::to_vec_pretty(&self.values)
            .map_err(|e| ConfigError::Store(e.to_string()))?;

        // Write to temp file in same directory (ensures same filesystem for rename)
        let temp_path = self.path.with_extension("json.tmp");
        std::fs::write(&temp_path, &data).map_err(store_err)?;
        std::fs::rename(&temp_path, &self.path).map_err(store_err)
    }
}

impl SettingsStore for JsonFileSettings {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.values.insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<(), ConfigError> {
        if self.values.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }

    fn set_many(&mut self, entries: &[(&str, String)]) -> Result<(), ConfigError> {
        for (key, value) in entries {
            self.values.insert(key.to_string(), value.clone());
        }
        self.flush()
    }
}

impl Configuration {
    /// Read a configuration from `store`.
    ///
    /// Missing fields take their defaults. Values that fail to parse or
    /// fall out of range are logged and replaced by the default too.
    pub fn load(store: &dyn SettingsStore) -> Self {
        let mut config = Configuration::default();
        for key in Self::FIELDS {
            let Some(value) = store.get(key) else {
                continue;
            };
            let mut candidate = config.clone();
            let applied = candidate
                .set_field(key, &value)
                .and_then(|_| candidate.validate());
            match applied {
                Ok(()) => config = candidate,
                Err(e) => tracing::warn!(key, value = %value, "ignoring stored setting: {}", e),
            }
        }
        config
    }

    /// Validate and write every field to `store`
    pub fn persist(&self, store: &mut dyn SettingsStore) -> Result<(), ConfigError> {
        self.validate()?;
        let entries: Vec<(&str, String)> = Self::FIELDS
            .iter()
            .filter_map(|key| self.get_field(key).map(|value| (*key, value)))
            .collect();
        store.set_many(&entries)
    }

    /// Remove every stored field so the defaults apply again
    pub fn reset(store: &mut dyn SettingsStore) -> Result<(), ConfigError> {
        for key in Self::FIELDS {
            store.remove(key)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PageNumberAlignment;

    #[test]
    fn test_persist_and_load() {
        let mut store = MemorySettings::new();
        let mut config = Configuration::default();
        config.font_size = 14.0;
        config.page_number_alignment = PageNumberAlignment::Right;
        config.header_text = Some("Draft".to_string());
        config.persist(&mut store).unwrap();

        assert_eq!(Configuration::load(&store), config);
    }

    #[test]
    fn test_invalid_values_fall_back_per_field() {
        let mut store = MemorySettings::new();
        store.set("font_size", "200").unwrap();
        store.set("line_height", "abc").unwrap();
        store.set("text_color", "#336699").unwrap();

        let config = Configuration::load(&store);
        assert_eq!(config.font_size, 12.0);
        assert_eq!(config.line_height, 1.5);
        assert_eq!(config.text_color, "#336699");
    }

    #[test]
    fn test_persist_rejects_invalid_config() {
        let mut store = MemorySettings::new();
        let mut config = Configuration::default();
        config.page_padding = 500.0;
        assert!(matches!(
            config.persist(&mut store),
            Err(ConfigError::OutOfRange { field: "page_padding", .. })
        ));
        assert!(store.get("page_padding").is_none());
    }

    #[test]
    fn test_json_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut store = JsonFileSettings::open(&path).unwrap();
        let mut config = Configuration::default();
        config.font_family = "Palatino".to_string();
        config.persist(&mut store).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());

        let reopened = JsonFileSettings::open(&path).unwrap();
        assert_eq!(Configuration::load(&reopened).font_family, "Palatino");

        let mut reopened = reopened;
        Configuration::reset(&mut reopened).unwrap();
        let again = JsonFileSettings::open(&path).unwrap();
        assert_eq!(Configuration::load(&again), Configuration::default());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(JsonFileSettings::open(&path), Err(ConfigError::Store(_))));
    }
}
