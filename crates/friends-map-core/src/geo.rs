// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use crate::Friend;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl BoundingBox {
    pub const fn new(north: f64, south: f64, east: f64, west: f64) -> Self {
        Self {
            north,
            south,
            east,
            west,
        }
    }

    /// Edges are inclusive. NaN on either axis is outside.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.south && lat <= self.north && lon >= self.west && lon <= self.east
    }
}

pub const CHINA_BOUNDS: BoundingBox = BoundingBox::new(53.5, 18.2, 134.8, 73.5);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapViewport {
    /// (lat, lon)
    pub center: (f64, f64),
    pub zoom: f64,
}

pub const DEFAULT_WORLD_VIEWPORT: MapViewport = MapViewport {
    center: (20.0, 0.0),
    zoom: 2.0,
};

pub const DEFAULT_CHINA_VIEWPORT: MapViewport = MapViewport {
    center: (35.0, 105.0),
    zoom: 4.0,
};

pub fn is_in_china(lat: f64, lon: f64) -> bool {
    CHINA_BOUNDS.contains(lat, lon)
}

pub fn get_china_friends(friends: &[Friend]) -> Vec<Friend> {
    friends
        .iter()
        .filter(|f| is_in_china(f.latitude, f.longitude))
        .cloned()
        .collect()
}

/// The world view shows everyone, classified or not.
pub fn get_world_friends(friends: &[Friend]) -> Vec<Friend> {
    friends.to_vec()
}

/// Mean coordinate of the list, `(0, 0)` when empty.
pub fn map_center(friends: &[Friend]) -> (f64, f64) {
    if friends.is_empty() {
        return (0.0, 0.0);
    }
    let n = friends.len() as f64;
    let lat: f64 = friends.iter().map(|f| f.latitude).sum();
    let lon: f64 = friends.iter().map(|f| f.longitude).sum();
    (lat / n, lon / n)
}

/// Equirectangular projection onto a `width` x `height` canvas.
pub fn marker_position(lat: f64, lon: f64, width: f64, height: f64) -> (f64, f64) {
    let x = (lon + 180.0) * (width / 360.0);
    let y = (90.0 - lat) * (height / 180.0);
    (x, y)
}

pub fn zoom_level_for_scale(scale: f64) -> f64 {
    scale.log2() + 1.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapKind {
    #[default]
    World,
    China,
}

impl MapKind {
    pub const ALL: [MapKind; 2] = [MapKind::World, MapKind::China];

    pub fn toggle(self) -> Self {
        match self {
            MapKind::World => MapKind::China,
            MapKind::China => MapKind::World,
        }
    }

    pub fn viewport(self) -> MapViewport {
        match self {
            MapKind::World => DEFAULT_WORLD_VIEWPORT,
            MapKind::China => DEFAULT_CHINA_VIEWPORT,
        }
    }

    /// The subset of `friends` this map variant plots.
    pub fn friends_for(self, friends: &[Friend]) -> Vec<Friend> {
        match self {
            MapKind::World => get_world_friends(friends),
            MapKind::China => get_china_friends(friends),
        }
    }

    pub fn shows(self, friend: &Friend) -> bool {
        match self {
            MapKind::World => true,
            MapKind::China => is_in_china(friend.latitude, friend.longitude),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MapKind::World => "World Map",
            MapKind::China => "China Map",
        }
    }
}

impl fmt::Display for MapKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapKind::World => write!(f, "world"),
            MapKind::China => write!(f, "china"),
        }
    }
}

impl FromStr for MapKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "world" => Ok(MapKind::World),
            "china" => Ok(MapKind::China),
            other => Err(format!("unknown map type '{}' (expected world or china)", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn friend(id: &str, lat: f64, lon: f64) -> Friend {
        Friend {
            id: id.to_string(),
            name: id.to_string(),
            province: "P".to_string(),
            city: "C".to_string(),
            address: None,
            latitude: lat,
            longitude: lon,
            avatar: None,
            description: None,
        }
    }

    #[test]
    fn test_china_box_edges_inclusive() {
        assert!(is_in_china(53.5, 100.0));
        assert!(is_in_china(18.2, 100.0));
        assert!(is_in_china(30.0, 134.8));
        assert!(is_in_china(30.0, 73.5));
        assert!(is_in_china(53.5, 73.5));
    }

    #[test]
    fn test_china_box_outside() {
        assert!(!is_in_china(53.51, 100.0));
        assert!(!is_in_china(18.19, 100.0));
        assert!(!is_in_china(30.0, 134.81));
        assert!(!is_in_china(30.0, 73.49));
        assert!(!is_in_china(34.0, -118.2)); // Los Angeles
        assert!(!is_in_china(51.5, -0.12)); // London
    }

    #[test]
    fn test_nan_is_outside() {
        assert!(!is_in_china(f64::NAN, 100.0));
        assert!(!is_in_china(30.0, f64::NAN));
    }

    #[test]
    fn test_world_friends_is_identity() {
        let list = vec![friend("a", 39.9, 116.4), friend("b", 34.0, -118.2)];
        assert_eq!(get_world_friends(&list), list);
        assert!(get_world_friends(&[]).is_empty());
    }

    #[test]
    fn test_china_friends_preserve_order() {
        let list = vec![
            friend("sh", 31.2, 121.5),
            friend("la", 34.0, -118.2),
            friend("bj", 39.9, 116.4),
        ];
        let ids: Vec<_> = get_china_friends(&list).into_iter().map(|f| f.id).collect();
        assert_eq!(ids, vec!["sh", "bj"]);
    }

    #[test]
    fn test_map_center() {
        assert_eq!(map_center(&[]), (0.0, 0.0));
        let list = vec![friend("a", 10.0, 20.0), friend("b", 30.0, 40.0)];
        assert_eq!(map_center(&list), (20.0, 30.0));
    }

    #[test]
    fn test_marker_position() {
        assert_eq!(marker_position(0.0, 0.0, 360.0, 180.0), (180.0, 90.0));
        assert_eq!(marker_position(90.0, -180.0, 360.0, 180.0), (0.0, 0.0));
        assert_eq!(zoom_level_for_scale(4.0), 3.0);
    }

    #[test]
    fn test_map_kind_parse_and_toggle() {
        assert_eq!("China".parse::<MapKind>(), Ok(MapKind::China));
        assert!("mars".parse::<MapKind>().is_err());
        assert_eq!(MapKind::World.toggle(), MapKind::China);
        assert_eq!(MapKind::China.toggle(), MapKind::World);
        assert_eq!(MapKind::China.viewport().zoom, 4.0);
    }
}
