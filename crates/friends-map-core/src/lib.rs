// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

pub mod debounce;
pub mod filter;
pub mod friend;
pub mod geo;
pub mod navigation;
pub mod preferences;
pub mod state;
pub mod storage;
pub mod theme;

use std::path::PathBuf;
use thiserror::Error;

pub use friend::{Friend, FriendStore};
pub use geo::MapKind;
pub use theme::Theme;

/// Environment variable that relocates every persisted file.
pub const CONFIG_DIR_ENV: &str = "FRIENDS_MAP_CONFIG_DIR";

#[derive(Error, Debug)]
pub enum FriendsMapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed friend data: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Duplicate friend id '{0}'")]
    DuplicateId(String),
    #[error("Friend '{id}' has out-of-range coordinates ({latitude}, {longitude})")]
    InvalidCoordinate {
        id: String,
        latitude: f64,
        longitude: f64,
    },
    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),
}

/// Directory holding `storage.json` and the GUI log.
pub fn get_config_root() -> PathBuf {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }

    directories::ProjectDirs::from("org", "friends-map", "friends-map")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".friends-map"))
}
