//! Durable key/value preferences
//!
//! The store is the only state that survives a restart. Reads always see the
//! latest write from the same process: the in-memory map is updated before the
//! file is written, so a failed write still leaves the new value in effect for
//! the rest of the session.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use log::warn;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::schedule::{self, ReminderTime};

/// Key holding the reminder time as `HH:MM`
pub const REMINDER_TIME_KEY: &str = "reminderTime";
/// Key holding the last notification day as `YYYY-MM-DD`
pub const LAST_NOTIFIED_KEY: &str = "lastNotifiedDate";

/// Minimal key/value contract shared by the file store and the in-memory store
pub trait PreferenceStore: Send {
    fn get(&self, key: &str) -> Option<String>;

    /// Record a value. An `Err` means the value was not made durable, but it
    /// must still be returned by later `get` calls in this process.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// Preferences persisted as a flat TOML table
pub struct Storage {
    file_path: PathBuf,
    values: BTreeMap<String, String>,
}

impl Storage {
    /// Open the store, loading existing values. A missing file is an empty store.
    pub fn open(file_path: impl AsRef<Path>) -> Result<Self> {
        let file_path = file_path.as_ref().to_path_buf();
        let values = Self::load(&file_path)?;
        Ok(Self { file_path, values })
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    fn load(file_path: &Path) -> Result<BTreeMap<String, String>> {
        if !file_path.exists() {
            return Ok(BTreeMap::new());
        }

        let content = fs::read_to_string(file_path)
            .with_context(|| format!("Failed to read {}", file_path.display()))?;
        let values = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", file_path.display()))?;
        Ok(values)
    }

    fn save(&self) -> Result<()> {
        let content = toml::to_string_pretty(&self.values)?;
        fs::write(&self.file_path, content)
            .with_context(|| format!("Failed to write {}", self.file_path.display()))?;
        Ok(())
    }
}

impl PreferenceStore for Storage {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        self.save()
    }
}

/// Non-durable store, used when no state file is wanted and in tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Typed view over a [`PreferenceStore`]
///
/// Write failures are logged and swallowed here; callers never see them.
pub struct Preferences {
    store: Box<dyn PreferenceStore>,
}

impl Preferences {
    pub fn new(store: impl PreferenceStore + 'static) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    /// The stored reminder time, or 08:00 when unset or unreadable
    pub fn reminder_time(&self) -> ReminderTime {
        match self.store.get(REMINDER_TIME_KEY) {
            Some(value) => value.parse().unwrap_or_else(|e| {
                warn!("Ignoring stored {}: {}", REMINDER_TIME_KEY, e);
                ReminderTime::default()
            }),
            None => ReminderTime::default(),
        }
    }

    pub fn set_reminder_time(&mut self, time: ReminderTime) {
        self.write(REMINDER_TIME_KEY, &time.to_string());
    }

    pub fn last_notified(&self) -> Option<NaiveDate> {
        self.store
            .get(LAST_NOTIFIED_KEY)
            .and_then(|value| schedule::parse_day(&value))
    }

    pub fn set_last_notified(&mut self, day: NaiveDate) {
        self.write(LAST_NOTIFIED_KEY, &schedule::format_day(day));
    }

    fn write(&mut self, key: &str, value: &str) {
        if let Err(e) = self.store.set(key, value) {
            warn!(
                "Preference '{}' not saved, keeping in-memory value for this session: {:#}",
                key, e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{NamedTempFile, tempdir};

    /// Store whose durable write always fails
    struct FailingStore(MemoryStore);

    impl PreferenceStore for FailingStore {
        fn get(&self, key: &str) -> Option<String> {
            self.0.get(key)
        }

        fn set(&mut self, key: &str, value: &str) -> Result<()> {
            self.0.set(key, value)?;
            anyhow::bail!("quota exceeded")
        }
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path().join("spark.toml")).unwrap();
        assert_eq!(storage.get(REMINDER_TIME_KEY), None);
    }

    #[test]
    fn test_values_survive_reopen() {
        let temp_file = NamedTempFile::new().unwrap();

        let mut storage = Storage::open(temp_file.path()).unwrap();
        storage.set(REMINDER_TIME_KEY, "21:15").unwrap();
        assert_eq!(storage.get(REMINDER_TIME_KEY).as_deref(), Some("21:15"));
        drop(storage);

        let reopened = Storage::open(temp_file.path()).unwrap();
        assert_eq!(reopened.file_path(), temp_file.path());
        assert_eq!(reopened.get(REMINDER_TIME_KEY).as_deref(), Some("21:15"));
    }

    #[test]
    fn test_file_uses_camel_case_keys() {
        let temp_file = NamedTempFile::new().unwrap();
        let mut storage = Storage::open(temp_file.path()).unwrap();
        storage.set(LAST_NOTIFIED_KEY, "2025-03-15").unwrap();

        let content = fs::read_to_string(temp_file.path()).unwrap();
        assert!(content.contains("lastNotifiedDate = \"2025-03-15\""));
    }

    #[test]
    fn test_failed_write_keeps_value_in_memory() {
        let dir = tempdir().unwrap();
        // The parent directory does not exist, so every save fails
        let mut storage = Storage::open(dir.path().join("missing").join("spark.toml")).unwrap();
        assert!(storage.set(REMINDER_TIME_KEY, "06:45").is_err());
        assert_eq!(storage.get(REMINDER_TIME_KEY).as_deref(), Some("06:45"));
    }

    #[test]
    fn test_preferences_defaults() {
        let prefs = Preferences::new(MemoryStore::new());
        assert_eq!(prefs.reminder_time().to_string(), "08:00");
        assert_eq!(prefs.last_notified(), None);
    }

    #[test]
    fn test_preferences_ignore_garbage() {
        let mut store = MemoryStore::new();
        store.set(REMINDER_TIME_KEY, "soon").unwrap();
        store.set(LAST_NOTIFIED_KEY, "Sat Mar 15 2025").unwrap();

        let prefs = Preferences::new(store);
        assert_eq!(prefs.reminder_time(), ReminderTime::default());
        assert_eq!(prefs.last_notified(), None);
    }

    #[test]
    fn test_preferences_swallow_write_failures() {
        let mut prefs = Preferences::new(FailingStore(MemoryStore::new()));
        let time: ReminderTime = "19:00".parse().unwrap();
        prefs.set_reminder_time(time);
        assert_eq!(prefs.reminder_time(), time);

        let day = NaiveDate::from_ymd_opt(2025, 3, 15).unwrap();
        prefs.set_last_notified(day);
        assert_eq!(prefs.last_notified(), Some(day));
    }
}
