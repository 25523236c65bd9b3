//! Durable client-side preferences and the stored credential.
//!
//! Values are kept as strings under fixed keys, the way a browser's
//! local storage would hold them, so a store written by one client build
//! stays readable by another.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::errors::DashboardResult;

pub const KEY_AUTH_TOKEN: &str = "auth_token";
pub const KEY_USERNAME: &str = "username";
pub const KEY_DARK_MODE: &str = "darkMode";
pub const KEY_REFRESH_INTERVAL: &str = "refreshInterval";
pub const KEY_NOTIFICATIONS: &str = "enableNotifications";

pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 30;

/// Class toggled on the root element while dark mode is on.
pub const DARK_MODE_CLASS: &str = "dark-mode";

/// String key-value storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> DashboardResult<()>;
    fn remove(&self, key: &str) -> DashboardResult<()>;
}

// ── JSON file store ─────────────────────────────────────────────────────

/// Store backed by a single pretty-printed JSON object on disk, rewritten on every change.
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl JsonFileStore {
    /// Open `<dir>/prefs.json`, starting empty when it is missing or unreadable.
    pub fn open(dir: &Path) -> DashboardResult<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join("prefs.json");
        let entries = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                eprintln!("Warning: ignoring corrupt {}: {}", path.display(), e);
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> DashboardResult<()> {
        let serialized = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, serialized)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> DashboardResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    fn remove(&self, key: &str) -> DashboardResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }
}

// ── In-memory store ─────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> DashboardResult<()> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> DashboardResult<()> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
        Ok(())
    }
}

// ── Preferences ─────────────────────────────────────────────────────────

/// User-facing settings. Each one is persisted and defaulted on its own.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preferences {
    pub dark_mode: bool,
    pub refresh_interval_secs: u64,
    pub notifications_enabled: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            dark_mode: false,
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            notifications_enabled: true,
        }
    }
}

impl Preferences {
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let defaults = Self::default();
        Self {
            dark_mode: store
                .get(KEY_DARK_MODE)
                .map_or(defaults.dark_mode, |v| v == "true"),
            refresh_interval_secs: store
                .get(KEY_REFRESH_INTERVAL)
                .and_then(|v| parse_interval(&v))
                .unwrap_or(defaults.refresh_interval_secs),
            notifications_enabled: store
                .get(KEY_NOTIFICATIONS)
                .map_or(defaults.notifications_enabled, |v| v == "true"),
        }
    }

    pub fn set_dark_mode(&mut self, store: &dyn KeyValueStore, on: bool) -> DashboardResult<()> {
        self.dark_mode = on;
        store.set(KEY_DARK_MODE, bool_str(on))
    }

    /// Zero is rejected and leaves the current interval in place.
    pub fn set_refresh_interval(
        &mut self,
        store: &dyn KeyValueStore,
        secs: u64,
    ) -> DashboardResult<bool> {
        if secs == 0 {
            return Ok(false);
        }
        self.refresh_interval_secs = secs;
        store.set(KEY_REFRESH_INTERVAL, &secs.to_string())?;
        Ok(true)
    }

    pub fn set_notifications(&mut self, store: &dyn KeyValueStore, on: bool) -> DashboardResult<()> {
        self.notifications_enabled = on;
        store.set(KEY_NOTIFICATIONS, bool_str(on))
    }
}

fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Leading-digits parse: `"45s"` reads as 45, junk or zero yields `None`.
fn parse_interval(raw: &str) -> Option<u64> {
    let digits: String = raw.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok().filter(|secs| *secs > 0)
}

// ── Appearance ──────────────────────────────────────────────────────────

/// Class list of the root display element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RootElement {
    classes: BTreeSet<String>,
}

impl RootElement {
    pub fn toggle_class(&mut self, class: &str, on: bool) {
        if on {
            self.classes.insert(class.to_string());
        } else {
            self.classes.remove(class);
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains(class)
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.classes.iter().map(String::as_str)
    }

    pub fn is_dark(&self) -> bool {
        self.has_class(DARK_MODE_CLASS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_store_is_empty() {
        let store = MemoryStore::new();
        let prefs = Preferences::load(&store);
        assert_eq!(prefs, Preferences::default());
        assert_eq!(prefs.refresh_interval_secs, 30);
        assert!(prefs.notifications_enabled);
        assert!(!prefs.dark_mode);
    }

    #[test]
    fn test_dark_mode_persists_as_string() {
        let store = MemoryStore::new();
        let mut prefs = Preferences::load(&store);

        prefs.set_dark_mode(&store, true).unwrap();
        assert_eq!(store.get(KEY_DARK_MODE).as_deref(), Some("true"));

        prefs.set_dark_mode(&store, false).unwrap();
        assert_eq!(store.get(KEY_DARK_MODE).as_deref(), Some("false"));
    }

    #[test]
    fn test_each_preference_defaults_independently() {
        let store = MemoryStore::new();
        store.set(KEY_DARK_MODE, "true").unwrap();
        store.set(KEY_REFRESH_INTERVAL, "not a number").unwrap();

        let prefs = Preferences::load(&store);
        assert!(prefs.dark_mode);
        assert_eq!(prefs.refresh_interval_secs, DEFAULT_REFRESH_INTERVAL_SECS);
        assert!(prefs.notifications_enabled);
    }

    #[test]
    fn test_refresh_interval_parsing() {
        assert_eq!(parse_interval("45"), Some(45));
        assert_eq!(parse_interval("45s"), Some(45));
        assert_eq!(parse_interval("0"), None);
        assert_eq!(parse_interval("abc"), None);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let store = MemoryStore::new();
        let mut prefs = Preferences::default();
        assert!(!prefs.set_refresh_interval(&store, 0).unwrap());
        assert_eq!(prefs.refresh_interval_secs, 30);
        assert!(store.get(KEY_REFRESH_INTERVAL).is_none());

        assert!(prefs.set_refresh_interval(&store, 10).unwrap());
        assert_eq!(store.get(KEY_REFRESH_INTERVAL).as_deref(), Some("10"));
    }

    #[test]
    fn test_json_store_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = JsonFileStore::open(dir.path()).unwrap();
            store.set(KEY_AUTH_TOKEN, "abc").unwrap();
            store.set(KEY_NOTIFICATIONS, "false").unwrap();
            store.set(KEY_USERNAME, "admin").unwrap();
            store.remove(KEY_USERNAME).unwrap();
        }
        let store = JsonFileStore::open(dir.path()).unwrap();
        assert_eq!(store.get(KEY_AUTH_TOKEN).as_deref(), Some("abc"));
        assert!(store.get(KEY_USERNAME).is_none());
        assert!(!Preferences::load(&store).notifications_enabled);
    }

    #[test]
    fn test_json_store_survives_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("prefs.json"), "{not json").unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        assert!(store.get(KEY_AUTH_TOKEN).is_none());
    }

    #[test]
    fn test_root_element_single_class() {
        let mut root = RootElement::default();
        root.toggle_class(DARK_MODE_CLASS, true);
        root.toggle_class(DARK_MODE_CLASS, true);
        assert_eq!(root.classes().count(), 1);
        assert!(root.is_dark());

        root.toggle_class(DARK_MODE_CLASS, false);
        assert!(!root.is_dark());
        assert_eq!(root.classes().count(), 0);
    }
}
