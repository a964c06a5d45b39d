// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use crate::FriendsMapError;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

const BUNDLED_FRIENDS: &str = include_str!("../data/friends.json");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Friend {
    pub id: String,
    pub name: String,
    pub province: String,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Friend {
    /// Falls back to a gravatar placeholder seeded by `id`.
    pub fn avatar_url(&self, size: u32) -> String {
        match &self.avatar {
            Some(url) if !url.trim().is_empty() => url.clone(),
            _ => format!(
                "https://www.gravatar.com/avatar/{}?s={}&d=monsterid&r=pg",
                self.id, size
            ),
        }
    }

    pub fn location_label(&self) -> String {
        match &self.address {
            Some(address) => format!("{}, {}, {}", self.province, self.city, address),
            None => format!("{}, {}", self.province, self.city),
        }
    }

    /// False when either coordinate is zero or NaN; such records are not navigable.
    pub fn has_coordinates(&self) -> bool {
        let usable = |v: f64| !v.is_nan() && v != 0.0;
        usable(self.latitude) && usable(self.longitude)
    }
}

/// The immutable friend list, loaded once and shared for the life of the process.
#[derive(Debug, Clone, Default)]
pub struct FriendStore {
    friends: Arc<Vec<Friend>>,
}

impl FriendStore {
    pub fn from_friends(friends: Vec<Friend>) -> Result<Self, FriendsMapError> {
        let mut seen = HashSet::new();
        for friend in &friends {
            if !seen.insert(friend.id.as_str()) {
                return Err(FriendsMapError::DuplicateId(friend.id.clone()));
            }
            let lat_ok = (-90.0..=90.0).contains(&friend.latitude);
            let lon_ok = (-180.0..=180.0).contains(&friend.longitude);
            if !lat_ok || !lon_ok {
                return Err(FriendsMapError::InvalidCoordinate {
                    id: friend.id.clone(),
                    latitude: friend.latitude,
                    longitude: friend.longitude,
                });
            }
        }

        Ok(Self {
            friends: Arc::new(friends),
        })
    }

    pub fn from_json(content: &str) -> Result<Self, FriendsMapError> {
        let friends: Vec<Friend> = serde_json::from_str(content)?;
        Self::from_friends(friends)
    }

    /// The list compiled into the binary.
    pub fn bundled() -> Result<Self, FriendsMapError> {
        Self::from_json(BUNDLED_FRIENDS)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read friend data {:?}", path))?;
        let store = Self::from_json(&content)
            .with_context(|| format!("Failed to load friend data {:?}", path))?;
        log::info!("[Friends] Loaded {} friends from {:?}", store.len(), path);
        Ok(store)
    }

    pub fn friends(&self) -> &[Friend] {
        &self.friends
    }

    pub fn get(&self, id: &str) -> Option<&Friend> {
        self.friends.iter().find(|f| f.id == id)
    }

    pub fn len(&self) -> usize {
        self.friends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.friends.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn friend(id: &str, lat: f64, lon: f64) -> Friend {
        Friend {
            id: id.to_string(),
            name: format!("Friend {}", id),
            province: "Beijing".to_string(),
            city: "Beijing".to_string(),
            address: None,
            latitude: lat,
            longitude: lon,
            avatar: None,
            description: None,
        }
    }

    #[test]
    fn test_bundled_loads() {
        let store = FriendStore::bundled().unwrap();
        assert!(!store.is_empty());
        assert_eq!(store.get("1").map(|f| f.name.as_str()), Some("Alice Chen"));
        assert!(store.get("missing").is_none());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let result = FriendStore::from_friends(vec![friend("a", 1.0, 1.0), friend("a", 2.0, 2.0)]);
        assert!(matches!(result, Err(FriendsMapError::DuplicateId(id)) if id == "a"));
    }

    #[test]
    fn test_out_of_range_rejected() {
        let result = FriendStore::from_friends(vec![friend("a", 91.0, 0.0)]);
        assert!(matches!(
            result,
            Err(FriendsMapError::InvalidCoordinate { .. })
        ));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let result = FriendStore::from_json("[{\"id\": 1}]");
        assert!(matches!(result, Err(FriendsMapError::Parse(_))));
    }

    #[test]
    fn test_optional_fields_missing() {
        let json = r#"[{"id":"x","name":"X","province":"P","city":"C","latitude":1.5,"longitude":2.5}]"#;
        let store = FriendStore::from_json(json).unwrap();
        let f = &store.friends()[0];
        assert_eq!(f.address, None);
        assert_eq!(f.location_label(), "P, C");
    }

    #[test]
    fn test_avatar_placeholder_is_deterministic() {
        let f = friend("42", 1.0, 1.0);
        assert_eq!(
            f.avatar_url(40),
            "https://www.gravatar.com/avatar/42?s=40&d=monsterid&r=pg"
        );
        assert_eq!(f.avatar_url(40), f.avatar_url(40));

        let mut with_avatar = f.clone();
        with_avatar.avatar = Some("https://example.com/me.png".to_string());
        assert_eq!(with_avatar.avatar_url(40), "https://example.com/me.png");
    }

    #[test]
    fn test_zero_coordinates_not_navigable() {
        assert!(friend("a", 39.9, 116.4).has_coordinates());
        assert!(!friend("a", 0.0, 116.4).has_coordinates());
        assert!(!friend("a", 39.9, f64::NAN).has_coordinates());
    }
}
