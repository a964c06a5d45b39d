// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use crate::{Friend, MapKind};

pub const DEFAULT_FLY_TO_ZOOM: f64 = 10.0;
/// Reported by [`MapNavigator::current_zoom`] while the active view is missing.
pub const FALLBACK_ZOOM: f64 = 2.0;

/// A rendered map the navigator can steer.
pub trait MapView {
    /// `None` means the view's own default zoom, [`DEFAULT_FLY_TO_ZOOM`].
    fn fly_to(&mut self, lat: f64, lon: f64, zoom: Option<f64>);
    fn zoom(&self) -> f64;
    fn is_ready(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationOutcome {
    Dispatched,
    MissingCoordinates,
    MapNotReady,
}

/// Routes navigation to whichever of the two map views is active.
#[derive(Debug)]
pub struct MapNavigator<V> {
    active: MapKind,
    world: Option<V>,
    china: Option<V>,
}

impl<V> Default for MapNavigator<V> {
    fn default() -> Self {
        Self::new(MapKind::default())
    }
}

impl<V> MapNavigator<V> {
    pub fn new(active: MapKind) -> Self {
        Self {
            active,
            world: None,
            china: None,
        }
    }

    pub fn attach(&mut self, kind: MapKind, view: V) {
        *self.slot(kind) = Some(view);
    }

    pub fn active(&self) -> MapKind {
        self.active
    }

    pub fn set_active(&mut self, kind: MapKind) {
        self.active = kind;
    }

    pub fn toggle(&mut self) -> MapKind {
        self.active = self.active.toggle();
        self.active
    }

    pub fn view(&self, kind: MapKind) -> Option<&V> {
        match kind {
            MapKind::World => self.world.as_ref(),
            MapKind::China => self.china.as_ref(),
        }
    }

    pub fn view_mut(&mut self, kind: MapKind) -> Option<&mut V> {
        self.slot(kind).as_mut()
    }

    pub fn active_view(&self) -> Option<&V> {
        self.view(self.active)
    }

    pub fn active_view_mut(&mut self) -> Option<&mut V> {
        self.view_mut(self.active)
    }

    fn slot(&mut self, kind: MapKind) -> &mut Option<V> {
        match kind {
            MapKind::World => &mut self.world,
            MapKind::China => &mut self.china,
        }
    }
}

impl<V: MapView> MapNavigator<V> {
    /// Only the active view is touched.
    pub fn fly_to_friend(&mut self, friend: &Friend) -> NavigationOutcome {
        let active = self.active;
        let Some(view) = self.active_view_mut().filter(|v| v.is_ready()) else {
            log::debug!(
                "[Navigation] {} not ready, ignoring fly-to {}",
                active,
                friend.name
            );
            return NavigationOutcome::MapNotReady;
        };

        if !friend.has_coordinates() {
            log::warn!(
                "[Navigation] {} has no usable coordinates ({}, {})",
                friend.name,
                friend.latitude,
                friend.longitude
            );
            return NavigationOutcome::MissingCoordinates;
        }

        view.fly_to(friend.latitude, friend.longitude, None);
        log::info!(
            "[Navigation] Flying to {} at {}, {}",
            friend.name,
            friend.city,
            friend.province
        );
        NavigationOutcome::Dispatched
    }

    pub fn current_zoom(&self) -> f64 {
        self.active_view().map(|v| v.zoom()).unwrap_or(FALLBACK_ZOOM)
    }
}
