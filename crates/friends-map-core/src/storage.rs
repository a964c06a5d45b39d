// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

//! String key-value persistence shared by every settings value.
//!
//! A backend reports changes made by *other* contexts (another window, another
//! process on the same file) through [`KeyValueStorage::subscribe`]. A context
//! never receives events for its own writes.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

pub const STORAGE_FILE_NAME: &str = "storage.json";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Storage quota exceeded writing '{key}' ({needed} of {quota} bytes)")]
    QuotaExceeded {
        key: String,
        needed: usize,
        quota: usize,
    },
    #[error("Storage is disabled")]
    Disabled,
    #[error("Corrupt value under '{key}': {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// `new_value` is `None` when the key was removed or the storage cleared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    pub new_value: Option<String>,
}

pub trait KeyValueStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
    /// Removes every key, not only the ones this application wrote.
    fn clear(&self) -> Result<(), StorageError>;
    fn keys(&self) -> Result<Vec<String>, StorageError>;
    fn subscribe(&self) -> Receiver<StorageEvent>;
    /// Folds in changes made outside this handle. Push-based backends do nothing.
    fn poll(&self) {}
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panicked writer leaves plain data behind; keep serving it.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn diff(old: &BTreeMap<String, String>, new: &BTreeMap<String, String>) -> Vec<StorageEvent> {
    let mut events: Vec<StorageEvent> = new
        .iter()
        .filter(|(k, v)| old.get(*k) != Some(*v))
        .map(|(k, v)| StorageEvent {
            key: k.clone(),
            new_value: Some(v.clone()),
        })
        .collect();
    events.extend(
        old.keys()
            .filter(|k| !new.contains_key(*k))
            .map(|k| StorageEvent {
                key: k.clone(),
                new_value: None,
            }),
    );
    events
}

// --- In-process backing ---

struct MemoryBacking {
    items: Mutex<BTreeMap<String, String>>,
    subscribers: Mutex<Vec<(u64, Sender<StorageEvent>)>>,
    next_context: AtomicU64,
    quota_bytes: Option<usize>,
    disabled: bool,
}

/// In-process storage. Clones made with [`MemoryStorage::context`] share the
/// same items and see each other's writes as events.
pub struct MemoryStorage {
    backing: Arc<MemoryBacking>,
    context_id: u64,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::build(None, false)
    }

    /// Writes that would push the total size of keys and values past
    /// `quota_bytes` fail with [`StorageError::QuotaExceeded`].
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self::build(Some(quota_bytes), false)
    }

    /// Every operation fails with [`StorageError::Disabled`].
    pub fn disabled() -> Self {
        Self::build(None, true)
    }

    fn build(quota_bytes: Option<usize>, disabled: bool) -> Self {
        Self {
            backing: Arc::new(MemoryBacking {
                items: Mutex::new(BTreeMap::new()),
                subscribers: Mutex::new(Vec::new()),
                next_context: AtomicU64::new(1),
                quota_bytes,
                disabled,
            }),
            context_id: 0,
        }
    }

    /// Another execution context over the same items.
    pub fn context(&self) -> Self {
        Self {
            backing: Arc::clone(&self.backing),
            context_id: self.backing.next_context.fetch_add(1, Ordering::Relaxed),
        }
    }

    fn check_enabled(&self) -> Result<(), StorageError> {
        if self.backing.disabled {
            Err(StorageError::Disabled)
        } else {
            Ok(())
        }
    }

    fn notify(&self, events: Vec<StorageEvent>) {
        if events.is_empty() {
            return;
        }
        let mut subscribers = lock(&self.backing.subscribers);
        subscribers.retain(|(context, tx)| {
            if *context == self.context_id {
                return true;
            }
            events.iter().all(|e| tx.send(e.clone()).is_ok())
        });
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.check_enabled()?;
        Ok(lock(&self.backing.items).get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check_enabled()?;
        {
            let mut items = lock(&self.backing.items);
            if let Some(quota) = self.backing.quota_bytes {
                let others: usize = items
                    .iter()
                    .filter(|(k, _)| k.as_str() != key)
                    .map(|(k, v)| k.len() + v.len())
                    .sum();
                let needed = others + key.len() + value.len();
                if needed > quota {
                    return Err(StorageError::QuotaExceeded {
                        key: key.to_string(),
                        needed,
                        quota,
                    });
                }
            }
            if items.get(key).map(String::as_str) == Some(value) {
                return Ok(());
            }
            items.insert(key.to_string(), value.to_string());
        }
        self.notify(vec![StorageEvent {
            key: key.to_string(),
            new_value: Some(value.to_string()),
        }]);
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.check_enabled()?;
        let removed = lock(&self.backing.items).remove(key).is_some();
        if removed {
            self.notify(vec![StorageEvent {
                key: key.to_string(),
                new_value: None,
            }]);
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.check_enabled()?;
        let old = std::mem::take(&mut *lock(&self.backing.items));
        self.notify(diff(&old, &BTreeMap::new()));
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        self.check_enabled()?;
        Ok(lock(&self.backing.items).keys().cloned().collect())
    }

    fn subscribe(&self) -> Receiver<StorageEvent> {
        let (tx, rx) = mpsc::channel();
        lock(&self.backing.subscribers).push((self.context_id, tx));
        rx
    }
}

// --- File backing ---

#[derive(Debug, Default)]
struct FileSnapshot {
    items: BTreeMap<String, String>,
    /// File contents as last read or written by this handle.
    raw: Option<String>,
}

/// One JSON object file, rewritten synchronously on every mutation.
///
/// Other processes writing the same file are picked up by [`KeyValueStorage::poll`]
/// and before every write, by comparing the file's contents against the last ones
/// this handle saw. A write only replaces the keys it touches.
pub struct FileStorage {
    path: PathBuf,
    snapshot: Mutex<FileSnapshot>,
    subscribers: Mutex<Vec<Sender<StorageEvent>>>,
}

fn read_raw(path: &Path) -> Result<Option<String>, StorageError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn parse_items(raw: Option<&str>) -> Result<BTreeMap<String, String>, StorageError> {
    match raw {
        Some(content) if !content.trim().is_empty() => {
            serde_json::from_str(content).map_err(|source| StorageError::Corrupt {
                key: STORAGE_FILE_NAME.to_string(),
                source,
            })
        }
        _ => Ok(BTreeMap::new()),
    }
}

impl FileStorage {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let raw = read_raw(&path).unwrap_or_else(|e| {
            log::warn!("[Storage] Cannot read {:?}: {}", path, e);
            None
        });
        let items = parse_items(raw.as_deref()).unwrap_or_else(|e| {
            log::warn!("[Storage] Ignoring unreadable {:?}: {}", path, e);
            BTreeMap::new()
        });
        log::debug!("[Storage] Opened {:?} with {} keys", path, items.len());

        Self {
            path,
            snapshot: Mutex::new(FileSnapshot { items, raw }),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// `storage.json` under [`crate::get_config_root`].
    pub fn in_config_root() -> Self {
        Self::open(crate::get_config_root().join(STORAGE_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Folds the file's current contents into `snapshot` and returns what
    /// changed since this handle last looked.
    fn refresh(&self, snapshot: &mut FileSnapshot) -> Vec<StorageEvent> {
        let raw = match read_raw(&self.path) {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("[Storage] Cannot read {:?}: {}", self.path, e);
                return Vec::new();
            }
        };
        if raw == snapshot.raw {
            return Vec::new();
        }

        let parsed = parse_items(raw.as_deref());
        snapshot.raw = raw;
        match parsed {
            Ok(items) => {
                let events = diff(&snapshot.items, &items);
                snapshot.items = items;
                events
            }
            Err(e) => {
                log::warn!(
                    "[Storage] External change to {:?} unreadable: {}",
                    self.path,
                    e
                );
                Vec::new()
            }
        }
    }

    fn persist(
        &self,
        snapshot: &mut FileSnapshot,
        items: BTreeMap<String, String>,
    ) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        let content =
            serde_json::to_string_pretty(&items).map_err(|source| StorageError::Corrupt {
                key: STORAGE_FILE_NAME.to_string(),
                source,
            })?;
        fs::write(&self.path, &content)?;
        snapshot.items = items;
        snapshot.raw = Some(content);
        Ok(())
    }

    fn mutate<F>(&self, f: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let (external, result) = {
            let mut snapshot = lock(&self.snapshot);
            let mut external = self.refresh(&mut snapshot);
            let mut items = snapshot.items.clone();
            f(&mut items);
            let result = if items == snapshot.items {
                Ok(())
            } else {
                self.persist(&mut snapshot, items)
            };
            // Keys this write replaced are no longer news.
            external.retain(|e| snapshot.items.get(&e.key) == e.new_value.as_ref());
            (external, result)
        };
        self.notify(external);
        result
    }

    fn notify(&self, events: Vec<StorageEvent>) {
        if events.is_empty() {
            return;
        }
        let mut subscribers = lock(&self.subscribers);
        subscribers.retain(|tx| events.iter().all(|e| tx.send(e.clone()).is_ok()));
    }
}

impl KeyValueStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(lock(&self.snapshot).items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.mutate(|items| {
            items.insert(key.to_string(), value.to_string());
        })
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.mutate(|items| {
            items.remove(key);
        })
    }

    fn clear(&self) -> Result<(), StorageError> {
        log::info!("[Storage] Clearing all keys in {:?}", self.path);
        self.mutate(|items| items.clear())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(lock(&self.snapshot).items.keys().cloned().collect())
    }

    fn subscribe(&self) -> Receiver<StorageEvent> {
        let (tx, rx) = mpsc::channel();
        lock(&self.subscribers).push(tx);
        rx
    }

    fn poll(&self) {
        let events = self.refresh(&mut lock(&self.snapshot));
        if !events.is_empty() {
            log::debug!(
                "[Storage] {} external change(s) in {:?}",
                events.len(),
                self.path
            );
        }
        self.notify(events);
    }
}
