use crate::draw::settings::{DrawPreferences, DrawSettings, PREFERENCES_KEY, SETTINGS_KEY};
use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

pub const STORE_FILE_NAME: &str = "magic_pen_store.json";

/// One write observed by a subscriber. Revisions increase with every write
/// to the store, across all keys.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreChange {
    pub key: String,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
    pub revision: u64,
}

#[derive(Debug, Default)]
struct StoreInner {
    values: Map<String, Value>,
    subscribers: Vec<Sender<StoreChange>>,
    revision: u64,
}

/// Key-value store shared by every surface (popup, settings page, page
/// overlays). Last write wins; each write is broadcast to all subscribers
/// in write order.
#[derive(Debug, Clone, Default)]
pub struct SharedStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl SharedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.lock().ok()?.values.get(key).cloned()
    }

    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.get(key)
            .map(|value| {
                serde_json::from_value(value).with_context(|| format!("decode store key {key}"))
            })
            .transpose()
    }

    pub fn set(&self, key: &str, value: Value) {
        self.write(key, Some(value));
    }

    pub fn set_as<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let value =
            serde_json::to_value(value).with_context(|| format!("encode store key {key}"))?;
        self.set(key, value);
        Ok(())
    }

    pub fn remove(&self, key: &str) {
        self.write(key, None);
    }

    fn write(&self, key: &str, value: Option<Value>) {
        let Ok(mut inner) = self.inner.lock() else {
            tracing::error!(key, "shared store lock poisoned; write dropped");
            return;
        };
        let old_value = match value.clone() {
            Some(value) => inner.values.insert(key.to_owned(), value),
            None => inner.values.remove(key),
        };
        inner.revision += 1;
        let change = StoreChange {
            key: key.to_owned(),
            old_value,
            new_value: value,
            revision: inner.revision,
        };
        inner
            .subscribers
            .retain(|subscriber| subscriber.send(change.clone()).is_ok());
        tracing::debug!(key, revision = change.revision, "store value written");
    }

    /// Registers a new listener. Dropping the receiver unsubscribes it on the
    /// next write.
    pub fn subscribe(&self) -> Receiver<StoreChange> {
        let (tx, rx) = mpsc::channel();
        if let Ok(mut inner) = self.inner.lock() {
            inner.subscribers.push(tx);
        }
        rx
    }

    pub fn revision(&self) -> u64 {
        self.inner.lock().map(|inner| inner.revision).unwrap_or(0)
    }

    /// First-run defaults. Existing keys are left alone.
    pub fn install_defaults(&self) -> Result<()> {
        if self.get(PREFERENCES_KEY).is_none() {
            self.set_as(PREFERENCES_KEY, &DrawPreferences::default())?;
        }
        if self.get(SETTINGS_KEY).is_none() {
            self.set_as(SETTINGS_KEY, &DrawSettings::default())?;
        }
        Ok(())
    }

    /// Reads the preference record, falling back to defaults when it is
    /// missing or unreadable.
    pub fn load_preferences(&self) -> DrawPreferences {
        match self.get_as::<DrawPreferences>(PREFERENCES_KEY) {
            Ok(Some(preferences)) => preferences,
            Ok(None) => DrawPreferences::default(),
            Err(err) => {
                tracing::warn!(?err, "stored draw preferences unreadable; using defaults");
                DrawPreferences::default()
            }
        }
    }

    pub fn save_preferences(&self, preferences: &DrawPreferences) -> Result<()> {
        self.set_as(PREFERENCES_KEY, preferences)
    }

    pub fn load_settings(&self) -> Result<DrawSettings> {
        Ok(self.get_as(SETTINGS_KEY)?.unwrap_or_default())
    }

    fn snapshot(&self) -> Result<Map<String, Value>> {
        let inner = self
            .inner
            .lock()
            .map_err(|_| anyhow!("shared store lock poisoned"))?;
        Ok(inner.values.clone())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let store = Self::new();
        if !path.exists() {
            return Ok(store);
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read store file {}", path.display()))?;
        if content.trim().is_empty() {
            return Ok(store);
        }
        let values: Map<String, Value> = serde_json::from_str(&content)
            .with_context(|| format!("deserialize store file {}", path.display()))?;
        if let Ok(mut inner) = store.inner.lock() {
            inner.values = values;
        }
        Ok(store)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create store parent folder {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&self.snapshot()?)
            .context("serialize shared store contents")?;
        std::fs::write(path, json).with_context(|| format!("write store file {}", path.display()))
    }
}

pub fn store_path_from_exe_path(exe_path: &Path) -> Result<PathBuf> {
    let parent = exe_path
        .parent()
        .ok_or_else(|| anyhow!("executable path has no parent: {}", exe_path.display()))?;
    Ok(parent.join(STORE_FILE_NAME))
}

pub fn resolve_store_path() -> Result<PathBuf> {
    let exe_path = std::env::current_exe().context("resolve current executable")?;
    store_path_from_exe_path(&exe_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::model::{Color, Tool};
    use serde_json::json;

    #[test]
    fn store_path_is_resolved_next_to_executable() {
        let exe = Path::new("/tmp/pen/bin/magic_pen");
        let path = store_path_from_exe_path(exe).expect("path");
        assert_eq!(path, Path::new("/tmp/pen/bin").join(STORE_FILE_NAME));
    }

    #[test]
    fn subscribers_see_writes_in_order_with_old_and_new_values() {
        let store = SharedStore::new();
        let rx = store.subscribe();

        store.set("k", json!(1));
        store.set("k", json!(2));
        store.remove("k");

        let changes: Vec<StoreChange> = rx.try_iter().collect();
        assert_eq!(changes.len(), 3);
        assert_eq!(changes[0].old_value, None);
        assert_eq!(changes[0].new_value, Some(json!(1)));
        assert_eq!(changes[1].old_value, Some(json!(1)));
        assert_eq!(changes[2].new_value, None);
        assert!(changes.windows(2).all(|w| w[0].revision < w[1].revision));
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let store = SharedStore::new();
        let kept = store.subscribe();
        drop(store.subscribe());
        store.set("a", json!(true));
        store.set("b", json!(false));
        assert_eq!(kept.try_iter().count(), 2);
        assert_eq!(store.inner.lock().expect("lock").subscribers.len(), 1);
    }

    #[test]
    fn install_defaults_keeps_existing_values() {
        let store = SharedStore::new();
        let custom = DrawPreferences {
            current_tool: Tool::Circle,
            ..DrawPreferences::default()
        };
        store.save_preferences(&custom).expect("save");
        store.install_defaults().expect("defaults");

        assert_eq!(store.load_preferences(), custom);
        assert_eq!(store.load_settings().expect("settings"), DrawSettings::default());
    }

    #[test]
    fn unreadable_preferences_fall_back_to_defaults() {
        let store = SharedStore::new();
        store.set(PREFERENCES_KEY, json!({ "currentColor": "not a color" }));
        assert_eq!(store.load_preferences(), DrawPreferences::default());
    }

    #[test]
    fn file_roundtrip_preserves_values() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join(STORE_FILE_NAME);

        let store = SharedStore::new();
        store
            .save_preferences(&DrawPreferences {
                is_enabled: true,
                current_tool: Tool::Highlighter,
                current_color: Color::rgb(1, 2, 3),
                stroke_size: 11,
            })
            .expect("save prefs");
        store.save_to_path(&path).expect("save file");

        let loaded = SharedStore::load_from_path(&path).expect("load file");
        assert_eq!(loaded.load_preferences(), store.load_preferences());
    }

    #[test]
    fn missing_or_blank_file_loads_empty_store() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join(STORE_FILE_NAME);
        assert!(SharedStore::load_from_path(&path)
            .expect("missing")
            .get(PREFERENCES_KEY)
            .is_none());

        std::fs::write(&path, "  \n").expect("write blank");
        assert!(SharedStore::load_from_path(&path)
            .expect("blank")
            .get(PREFERENCES_KEY)
            .is_none());

        std::fs::write(&path, "{ nope").expect("write broken");
        assert!(SharedStore::load_from_path(&path).is_err());
    }
}
