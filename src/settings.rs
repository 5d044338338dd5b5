use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::debug;

const UI_PREFERENCES_KEY: &str = "ui";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to access settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("settings file {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("settings value for '{key}' has the wrong shape: {source}")]
    Value {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Key-value port for persisted preferences.
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>, SettingsError>;
    fn set(&self, key: &str, value: Value) -> Result<(), SettingsError>;
}

#[derive(Debug, Default)]
pub struct MemorySettings {
    values: Mutex<HashMap<String, Value>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Result<Option<Value>, SettingsError> {
        let values = self.values.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), SettingsError> {
        self.values
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.to_string(), value);
        Ok(())
    }
}

/// Settings kept as one JSON object in a file. Writes go to a sibling temp
/// file that is then renamed over the original.
#[derive(Debug)]
pub struct JsonFileSettings {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileSettings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Map<String, Value>, SettingsError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(source) => {
                return Err(SettingsError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        if text.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Ok(Map::new()),
            Err(source) => Err(SettingsError::Parse {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn write_all(&self, values: &Map<String, Value>) -> Result<(), SettingsError> {
        let io_error = |source| SettingsError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_error)?;
        }

        let content = serde_json::to_string_pretty(values).map_err(|source| SettingsError::Parse {
            path: self.path.clone(),
            source,
        })?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, content).map_err(io_error)?;
        fs::rename(&tmp_path, &self.path).map_err(io_error)?;
        debug!(path = %self.path.display(), "settings saved");
        Ok(())
    }
}

impl SettingsStore for JsonFileSettings {
    fn get(&self, key: &str) -> Result<Option<Value>, SettingsError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: Value) -> Result<(), SettingsError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut values = self.read_all()?;
        values.insert(key.to_string(), value);
        self.write_all(&values)
    }
}

/// Display preferences that survive restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UiPreferences {
    pub sidebar_open: bool,
    pub dark_mode: bool,
}

impl Default for UiPreferences {
    fn default() -> Self {
        Self {
            sidebar_open: true,
            dark_mode: false,
        }
    }
}

impl UiPreferences {
    pub fn load(store: &dyn SettingsStore) -> Result<Self, SettingsError> {
        match store.get(UI_PREFERENCES_KEY)? {
            Some(value) => serde_json::from_value(value).map_err(|source| SettingsError::Value {
                key: UI_PREFERENCES_KEY.to_string(),
                source,
            }),
            None => Ok(Self::default()),
        }
    }

    pub fn save(&self, store: &dyn SettingsStore) -> Result<(), SettingsError> {
        let value = serde_json::to_value(self).map_err(|source| SettingsError::Value {
            key: UI_PREFERENCES_KEY.to_string(),
            source,
        })?;
        store.set(UI_PREFERENCES_KEY, value)
    }

    pub fn toggle_sidebar(&mut self) {
        self.sidebar_open = !self.sidebar_open;
    }

    pub fn toggle_dark_mode(&mut self) {
        self.dark_mode = !self.dark_mode;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_preferences_default_when_unset() {
        let store = MemorySettings::new();
        let preferences = UiPreferences::load(&store).expect("load");
        assert!(preferences.sidebar_open);
        assert!(!preferences.dark_mode);
    }

    #[test]
    fn test_preferences_round_trip_through_file_store() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("settings.json");
        let store = JsonFileSettings::new(&path);

        let mut preferences = UiPreferences::default();
        preferences.toggle_dark_mode();
        preferences.toggle_sidebar();
        preferences.save(&store).expect("save");
        store.set("other", json!(1)).expect("set other key");

        let reopened = JsonFileSettings::new(&path);
        assert_eq!(
            UiPreferences::load(&reopened).expect("load"),
            UiPreferences {
                sidebar_open: false,
                dark_mode: true
            }
        );
        assert_eq!(reopened.get("other").expect("get"), Some(json!(1)));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_partial_preferences_fill_missing_fields() {
        let store = MemorySettings::new();
        store.set("ui", json!({ "darkMode": true })).expect("set");
        let preferences = UiPreferences::load(&store).expect("load");
        assert!(preferences.sidebar_open);
        assert!(preferences.dark_mode);
    }

    #[test]
    fn test_corrupt_file_reports_parse_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").expect("write");
        let store = JsonFileSettings::new(&path);
        assert!(matches!(
            UiPreferences::load(&store),
            Err(SettingsError::Parse { .. })
        ));
    }
}
