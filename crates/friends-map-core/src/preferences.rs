// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use crate::storage::{KeyValueStorage, StorageError, StorageEvent};
use crate::{MapKind, Theme};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::mpsc::Receiver;
use std::sync::Arc;

pub const PREFERENCES_KEY: &str = "userPreferences";
pub const THEME_KEY: &str = "theme";

/// Records without `schemaVersion` are version 0 and get stamped on open.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Reads `key`, or `None` when it was never written.
pub fn read_json<T: DeserializeOwned>(
    storage: &dyn KeyValueStorage,
    key: &str,
) -> Result<Option<T>, StorageError> {
    let Some(raw) = storage.get_item(key)? else {
        return Ok(None);
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| StorageError::Corrupt {
            key: key.to_string(),
            source,
        })
}

/// Never fails: missing keys and unreadable values yield `default`.
pub fn read_value<T: DeserializeOwned>(storage: &dyn KeyValueStorage, key: &str, default: T) -> T {
    match read_json(storage, key) {
        Ok(Some(value)) => value,
        Ok(None) => default,
        Err(e) => {
            log::warn!("[Preferences] Error reading key \"{}\": {}", key, e);
            default
        }
    }
}

pub fn write_value<T: Serialize>(
    storage: &dyn KeyValueStorage,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value).map_err(|source| StorageError::Corrupt {
        key: key.to_string(),
        source,
    })?;
    storage.set_item(key, &raw)
}

/// One persisted setting with an in-memory copy.
///
/// Writes go to storage synchronously. A failed write is logged and the
/// in-memory value keeps the new value, so the two diverge until the next
/// successful write. Changes from other contexts are folded in by [`StoredValue::sync`].
pub struct StoredValue<T> {
    key: String,
    default: T,
    value: T,
    storage: Arc<dyn KeyValueStorage>,
    events: Receiver<StorageEvent>,
}

impl<T> StoredValue<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    pub fn new(storage: Arc<dyn KeyValueStorage>, key: impl Into<String>, default: T) -> Self {
        let key = key.into();
        let events = storage.subscribe();
        let value = read_value(storage.as_ref(), &key, default.clone());
        Self {
            key,
            default,
            value,
            storage,
            events,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn set(&mut self, value: T) {
        self.value = value;
        if let Err(e) = write_value(self.storage.as_ref(), &self.key, &self.value) {
            log::warn!("[Preferences] Error setting key \"{}\": {}", self.key, e);
        }
    }

    pub fn update<F>(&mut self, updater: F)
    where
        F: FnOnce(&T) -> T,
    {
        let next = updater(&self.value);
        self.set(next);
    }

    /// Drops the persisted copy and falls back to the default.
    pub fn remove(&mut self) {
        self.value = self.default.clone();
        if let Err(e) = self.storage.remove_item(&self.key) {
            log::warn!("[Preferences] Error removing key \"{}\": {}", self.key, e);
        }
    }

    /// Applies pending external writes to this key, last writer wins.
    /// Removals from elsewhere are ignored. Returns whether the value changed.
    pub fn sync(&mut self) -> bool {
        self.storage.poll();

        let mut changed = false;
        while let Ok(event) = self.events.try_recv() {
            if event.key != self.key {
                continue;
            }
            let Some(raw) = event.new_value else {
                log::debug!("[Preferences] Key \"{}\" removed elsewhere", self.key);
                continue;
            };
            match serde_json::from_str::<T>(&raw) {
                Ok(value) => {
                    self.value = value;
                    changed = true;
                }
                Err(e) => {
                    log::warn!(
                        "[Preferences] Error parsing storage event for key \"{}\": {}",
                        self.key,
                        e
                    );
                }
            }
        }
        changed
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    #[serde(default)]
    pub schema_version: u32,
    pub theme: Theme,
    pub language: String,
    pub map_type: MapKind,
    pub auto_save: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            theme: Theme::Light,
            language: "zh-CN".to_string(),
            map_type: MapKind::World,
            auto_save: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PreferenceUpdate {
    Theme(Theme),
    Language(String),
    MapType(MapKind),
    AutoSave(bool),
}

impl Preferences {
    pub fn with(&self, update: PreferenceUpdate) -> Self {
        let mut next = self.clone();
        match update {
            PreferenceUpdate::Theme(theme) => next.theme = theme,
            PreferenceUpdate::Language(language) => next.language = language,
            PreferenceUpdate::MapType(map_type) => next.map_type = map_type,
            PreferenceUpdate::AutoSave(auto_save) => next.auto_save = auto_save,
        }
        next
    }
}

pub struct PreferencesStore {
    stored: StoredValue<Preferences>,
}

impl PreferencesStore {
    pub fn open(storage: Arc<dyn KeyValueStorage>) -> Self {
        let mut stored = StoredValue::new(storage, PREFERENCES_KEY, Preferences::default());

        let version = stored.get().schema_version;
        if version < CURRENT_SCHEMA_VERSION {
            log::info!(
                "[Preferences] Migrating {} from schema v{} to v{}",
                PREFERENCES_KEY,
                version,
                CURRENT_SCHEMA_VERSION
            );
            stored.update(|prev| Preferences {
                schema_version: CURRENT_SCHEMA_VERSION,
                ..prev.clone()
            });
        }

        Self { stored }
    }

    pub fn get(&self) -> &Preferences {
        self.stored.get()
    }

    /// Merges one field into the current record and persists the whole record.
    pub fn update_preference(&mut self, update: PreferenceUpdate) {
        self.stored.update(|prev| prev.with(update));
    }

    pub fn sync(&mut self) -> bool {
        self.stored.sync()
    }
}

pub struct ThemeStore {
    stored: StoredValue<Theme>,
}

impl ThemeStore {
    pub fn open(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self {
            stored: StoredValue::new(storage, THEME_KEY, Theme::Light),
        }
    }

    pub fn theme(&self) -> Theme {
        *self.stored.get()
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.stored.set(theme);
    }

    pub fn toggle(&mut self) -> Theme {
        self.stored.update(|t| t.toggle());
        self.theme()
    }

    pub fn sync(&mut self) -> bool {
        self.stored.sync()
    }
}

/// Every persisted setting of one application context.
pub struct Settings {
    storage: Arc<dyn KeyValueStorage>,
    preferences: PreferencesStore,
    theme: ThemeStore,
}

impl Settings {
    pub fn open(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self {
            preferences: PreferencesStore::open(Arc::clone(&storage)),
            theme: ThemeStore::open(Arc::clone(&storage)),
            storage,
        }
    }

    pub fn preferences(&self) -> &Preferences {
        self.preferences.get()
    }

    pub fn theme(&self) -> Theme {
        self.theme.theme()
    }

    /// The `theme` key is authoritative; the copy inside the preferences record follows it.
    pub fn set_theme(&mut self, theme: Theme) {
        self.theme.set_theme(theme);
        if self.preferences.get().theme != theme {
            self.preferences
                .update_preference(PreferenceUpdate::Theme(theme));
        }
    }

    pub fn toggle_theme(&mut self) -> Theme {
        let next = self.theme().toggle();
        self.set_theme(next);
        next
    }

    pub fn update_preference(&mut self, update: PreferenceUpdate) {
        if let PreferenceUpdate::Theme(theme) = update {
            self.set_theme(theme);
        } else {
            self.preferences.update_preference(update);
        }
    }

    /// Persists the active map when auto-save is on.
    pub fn remember_map(&mut self, map: MapKind) {
        let prefs = self.preferences.get();
        if prefs.auto_save && prefs.map_type != map {
            self.preferences
                .update_preference(PreferenceUpdate::MapType(map));
        }
    }

    /// Returns whether anything changed. A theme written elsewhere is mirrored
    /// into the preferences record.
    pub fn sync(&mut self) -> bool {
        let prefs_changed = self.preferences.sync();
        let theme_changed = self.theme.sync();
        if theme_changed && self.preferences.get().theme != self.theme() {
            self.preferences
                .update_preference(PreferenceUpdate::Theme(self.theme()));
        }
        prefs_changed || theme_changed
    }

    pub fn storage(&self) -> &Arc<dyn KeyValueStorage> {
        &self.storage
    }

    pub fn footprint_bytes(&self) -> usize {
        storage_footprint_bytes(self.preferences())
    }
}

pub fn storage_footprint_bytes(preferences: &Preferences) -> usize {
    serde_json::to_string(preferences)
        .map(|s| s.len())
        .unwrap_or(0)
}

/// Clears every persisted key, ours or not. Irreversible; does nothing unless
/// `confirmed`. The caller must rebuild its state from scratch afterwards.
pub fn reset_all(storage: &dyn KeyValueStorage, confirmed: bool) -> Result<bool, StorageError> {
    if !confirmed {
        log::info!("[Preferences] Reset declined");
        return Ok(false);
    }
    storage.clear()?;
    log::warn!("[Preferences] All persisted settings cleared");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn memory() -> Arc<dyn KeyValueStorage> {
        Arc::new(MemoryStorage::new())
    }

    #[test]
    fn test_defaults_when_unset() {
        let storage = memory();
        let prefs = PreferencesStore::open(Arc::clone(&storage));
        assert_eq!(prefs.get(), &Preferences::default());
        assert_eq!(read_value(storage.as_ref(), "never-set", 7u32), 7);
        // Opening with defaults writes nothing.
        assert!(storage.keys().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_value_falls_back() {
        let storage = memory();
        storage.set_item(THEME_KEY, "not json").unwrap();
        let theme = ThemeStore::open(Arc::clone(&storage));
        assert_eq!(theme.theme(), Theme::Light);
        assert!(matches!(
            read_json::<Theme>(storage.as_ref(), THEME_KEY),
            Err(StorageError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_update_preference_merges() {
        let storage = memory();
        let mut prefs = PreferencesStore::open(Arc::clone(&storage));
        prefs.update_preference(PreferenceUpdate::MapType(MapKind::China));
        prefs.update_preference(PreferenceUpdate::AutoSave(false));

        let persisted: Preferences = read_json(storage.as_ref(), PREFERENCES_KEY)
            .unwrap()
            .unwrap();
        assert_eq!(persisted.map_type, MapKind::China);
        assert!(!persisted.auto_save);
        assert_eq!(persisted.language, "zh-CN");
    }

    #[test]
    fn test_serialized_layout_is_camel_case() {
        let raw = serde_json::to_string(&Preferences::default()).unwrap();
        assert!(raw.contains("\"mapType\":\"world\""));
        assert!(raw.contains("\"autoSave\":true"));
        assert!(raw.contains("\"schemaVersion\":1"));
    }

    #[test]
    fn test_legacy_record_is_stamped() {
        let storage = memory();
        storage
            .set_item(
                PREFERENCES_KEY,
                r#"{"theme":"dark","language":"en","mapType":"china","autoSave":false}"#,
            )
            .unwrap();
        let prefs = PreferencesStore::open(Arc::clone(&storage));
        assert_eq!(prefs.get().schema_version, CURRENT_SCHEMA_VERSION);
        assert_eq!(prefs.get().map_type, MapKind::China);

        let persisted: Preferences = read_json(storage.as_ref(), PREFERENCES_KEY)
            .unwrap()
            .unwrap();
        assert_eq!(persisted.schema_version, CURRENT_SCHEMA_VERSION);
        assert_eq!(persisted.language, "en");
    }

    #[test]
    fn test_write_failure_keeps_memory_value() {
        let storage: Arc<dyn KeyValueStorage> = Arc::new(MemoryStorage::with_quota(8));
        let mut value = StoredValue::new(Arc::clone(&storage), "k", String::new());
        value.set("this string is far too long".to_string());
        assert_eq!(value.get(), "this string is far too long");
        assert_eq!(storage.get_item("k").unwrap(), None);
    }

    #[test]
    fn test_disabled_storage_is_non_fatal() {
        let storage: Arc<dyn KeyValueStorage> = Arc::new(MemoryStorage::disabled());
        let mut settings = Settings::open(storage);
        settings.set_theme(Theme::Dark);
        assert_eq!(settings.theme(), Theme::Dark);
        assert!(!settings.sync());
    }

    #[test]
    fn test_updater_form() {
        let storage = memory();
        let mut counter = StoredValue::new(Arc::clone(&storage), "count", 0u32);
        counter.update(|n| n + 1);
        counter.update(|n| n + 1);
        assert_eq!(*counter.get(), 2);
        assert_eq!(read_value(storage.as_ref(), "count", 0u32), 2);

        counter.remove();
        assert_eq!(*counter.get(), 0);
        assert_eq!(storage.get_item("count").unwrap(), None);
    }

    #[test]
    fn test_cross_context_sync() {
        let tab_a = MemoryStorage::new();
        let tab_b = tab_a.context();
        let mut settings_a = Settings::open(Arc::new(tab_a));
        let mut settings_b = Settings::open(Arc::new(tab_b));

        settings_a.set_theme(Theme::Dark);
        assert_eq!(settings_b.theme(), Theme::Light);
        assert!(settings_b.sync());
        assert_eq!(settings_b.theme(), Theme::Dark);
        assert_eq!(settings_b.preferences().theme, Theme::Dark);
        // The writer gets no echo of its own change.
        assert!(!settings_a.sync());
    }

    #[test]
    fn test_bare_theme_write_reaches_preferences() {
        let tab_a = MemoryStorage::new();
        let tab_b = tab_a.context();
        let mut settings_b = Settings::open(Arc::new(tab_b));

        write_value(&tab_a, THEME_KEY, &Theme::Dark).unwrap();
        assert!(settings_b.sync());
        assert_eq!(settings_b.theme(), Theme::Dark);
        assert_eq!(settings_b.preferences().theme, Theme::Dark);
    }

    #[test]
    fn test_remember_map_respects_auto_save() {
        let mut settings = Settings::open(memory());
        settings.remember_map(MapKind::China);
        assert_eq!(settings.preferences().map_type, MapKind::China);

        settings.update_preference(PreferenceUpdate::AutoSave(false));
        settings.remember_map(MapKind::World);
        assert_eq!(settings.preferences().map_type, MapKind::China);
    }

    #[test]
    fn test_reset_requires_confirmation() {
        let storage = memory();
        let mut settings = Settings::open(Arc::clone(&storage));
        settings.set_theme(Theme::Dark);
        storage.set_item("unrelated", "1").unwrap();

        assert!(!reset_all(storage.as_ref(), false).unwrap());
        assert_eq!(storage.keys().unwrap().len(), 3);

        assert!(reset_all(storage.as_ref(), true).unwrap());
        assert!(storage.keys().unwrap().is_empty());
        let fresh = Settings::open(storage);
        assert_eq!(fresh.theme(), Theme::Light);
        assert_eq!(fresh.preferences(), &Preferences::default());
    }

    #[test]
    fn test_footprint() {
        let prefs = Preferences::default();
        assert_eq!(
            storage_footprint_bytes(&prefs),
            serde_json::to_string(&prefs).unwrap().len()
        );
    }
}
