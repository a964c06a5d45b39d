// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use crate::style::Palette;
use crate::Message;
use friends_map_core::navigation::{self, DEFAULT_FLY_TO_ZOOM};
use friends_map_core::{Friend, MapKind};
use iced::advanced::{self, layout, renderer, widget, Layout, Widget};
use iced::widget::image;
use iced::{mouse, Color, Element, Event, Length, Radians, Rectangle};
use lru::LruCache;
use std::num::NonZeroUsize;

use std::sync::{Arc, Mutex};

// --- Slippy Map / Mercator Math ---
pub const TILE_SIZE: f64 = 256.0;
const MAX_ZOOM: f64 = 19.0;
const MAX_LAT: f64 = 85.0511;

pub fn lon_to_x(lon: f64, zoom: f64) -> f64 {
    ((lon + 180.0) / 360.0) * 2.0f64.powf(zoom) * TILE_SIZE
}

pub fn lat_to_y(lat: f64, zoom: f64) -> f64 {
    let lat_rad = lat.to_radians();
    (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / std::f64::consts::PI) / 2.0
        * 2.0f64.powf(zoom)
        * TILE_SIZE
}

pub fn x_to_lon(x: f64, zoom: f64) -> f64 {
    (x / (TILE_SIZE * 2.0f64.powf(zoom))) * 360.0 - 180.0
}

pub fn y_to_lat(y: f64, zoom: f64) -> f64 {
    let n = std::f64::consts::PI - 2.0 * std::f64::consts::PI * y / (TILE_SIZE * 2.0f64.powf(zoom));
    (0.5 * (n.exp() - (-n).exp())).atan().to_degrees()
}

// --- Tile Management ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoords {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl TileCoords {
    pub fn url(&self) -> String {
        format!(
            "https://tile.openstreetmap.org/{}/{}/{}.png",
            self.z, self.x, self.y
        )
    }
}

/// Shared by both map views; tiles are keyed by coordinates, not by map.
pub struct TileManager {
    tiles: Arc<Mutex<LruCache<TileCoords, image::Handle>>>,
    pending: Arc<Mutex<std::collections::HashSet<TileCoords>>>,
}

impl TileManager {
    pub fn new() -> Self {
        Self {
            tiles: Arc::new(Mutex::new(LruCache::new(
                NonZeroUsize::new(300).unwrap_or(NonZeroUsize::MIN),
            ))),
            pending: Arc::new(Mutex::new(std::collections::HashSet::new())),
        }
    }

    pub fn get_tile(&self, coords: TileCoords) -> Option<image::Handle> {
        let mut tiles = self.tiles.lock().ok()?;
        tiles.get(&coords).cloned()
    }

    pub fn request_tile(&self, coords: TileCoords) {
        {
            let (Ok(mut pending), Ok(tiles)) = (self.pending.lock(), self.tiles.lock()) else {
                return;
            };
            if pending.contains(&coords) || tiles.contains(&coords) {
                return;
            }
            pending.insert(coords);
        }

        let tiles_arc = Arc::clone(&self.tiles);
        let pending_arc = Arc::clone(&self.pending);

        std::thread::spawn(move || {
            let resp = ureq::get(&coords.url())
                .set("User-Agent", concat!("friends-map/", env!("CARGO_PKG_VERSION")))
                .timeout(std::time::Duration::from_secs(10))
                .call();

            match resp {
                Ok(response) => {
                    let mut bytes = Vec::new();
                    if std::io::Read::read_to_end(&mut response.into_reader(), &mut bytes).is_ok()
                    {
                        let handle = image::Handle::from_bytes(bytes);
                        if let Ok(mut tiles) = tiles_arc.lock() {
                            tiles.put(coords, handle);
                        }
                    }
                }
                Err(e) => {
                    log::warn!("[Map] Failed to fetch tile {:?}: {}", coords, e);
                }
            }
            if let Ok(mut pending) = pending_arc.lock() {
                pending.remove(&coords);
            }
        });
    }
}

/// Camera of one map variant; the navigator steers it through [`navigation::MapView`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapCamera {
    /// (lat, lon)
    pub center: (f64, f64),
    pub zoom: f64,
    pub ready: bool,
}

impl MapCamera {
    pub fn new(kind: MapKind) -> Self {
        let viewport = kind.viewport();
        Self {
            center: viewport.center,
            zoom: viewport.zoom,
            ready: false,
        }
    }
}

impl navigation::MapView for MapCamera {
    fn fly_to(&mut self, lat: f64, lon: f64, zoom: Option<f64>) {
        self.center = (lat.clamp(-MAX_LAT, MAX_LAT), lon);
        self.zoom = zoom.unwrap_or(DEFAULT_FLY_TO_ZOOM).clamp(0.0, MAX_ZOOM);
    }

    fn zoom(&self) -> f64 {
        self.zoom
    }

    fn is_ready(&self) -> bool {
        self.ready
    }
}

pub struct FriendMapView<'a> {
    pub kind: MapKind,
    pub friends: Vec<&'a Friend>,
    pub selected: Option<&'a str>,
    pub hovered: Option<&'a str>,
    pub tile_manager: &'a TileManager,
    pub camera: MapCamera,
    pub palette: Palette,
}

impl<'a> FriendMapView<'a> {
    fn marker_color(&self) -> Color {
        match self.kind {
            MapKind::World => self.palette.accent,
            MapKind::China => Color::from_rgb(0.91, 0.30, 0.24), // #e74c3c
        }
    }

    /// Nearest marker within a 10px screen radius of `world_point` (zoom-0 pixels).
    fn hit_test(&self, world_point: (f64, f64), scale: f64) -> Option<&'a Friend> {
        let (wx, wy) = world_point;
        self.friends
            .iter()
            .map(|f| {
                let tx = lon_to_x(f.longitude, 0.0);
                let ty = lat_to_y(f.latitude, 0.0);
                (*f, (tx - wx).powi(2) + (ty - wy).powi(2))
            })
            .filter(|(_, dist_sq)| *dist_sq < (10.0 / scale).powi(2))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(f, _)| f)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct MapState {
    is_dragging: bool,
    press_position: Option<iced::Point>,
    last_cursor: Option<iced::Point>,
    /// Camera as moved by input not yet echoed back through `MapCamera`.
    live_center: (f64, f64),
    live_zoom: f64,
    seen_camera_center: Option<(f64, f64)>,
    seen_camera_zoom: Option<f64>,
}

impl<'a, Theme, Renderer> Widget<Message, Theme, Renderer> for FriendMapView<'a>
where
    Renderer: renderer::Renderer + advanced::image::Renderer<Handle = image::Handle>,
{
    fn size(&self) -> iced::Size<Length> {
        iced::Size {
            width: Length::Fill,
            height: Length::Fill,
        }
    }

    fn tag(&self) -> widget::tree::Tag {
        widget::tree::Tag::of::<MapState>()
    }

    fn state(&self) -> widget::tree::State {
        widget::tree::State::new(MapState::default())
    }

    fn layout(
        &self,
        _tree: &mut widget::Tree,
        _renderer: &Renderer,
        limits: &layout::Limits,
    ) -> layout::Node {
        layout::Node::new(limits.max())
    }

    fn draw(
        &self,
        tree: &widget::Tree,
        renderer: &mut Renderer,
        _theme: &Theme,
        _style: &renderer::Style,
        layout: Layout<'_>,
        _cursor: mouse::Cursor,
        _viewport: &Rectangle,
    ) {
        let state = tree.state.downcast_ref::<MapState>();
        let bounds = layout.bounds();

        let zoom = if state.seen_camera_zoom == Some(self.camera.zoom) {
            state.live_zoom
        } else {
            self.camera.zoom
        };
        let (center_lat, center_lon) = if state.seen_camera_center == Some(self.camera.center) {
            state.live_center
        } else {
            self.camera.center
        };

        let zoom_scale = 2.0f64.powf(zoom);
        let camera_center_x = lon_to_x(center_lon, 0.0);
        let camera_center_y = lat_to_y(center_lat, 0.0);

        let to_screen = |wx: f64, wy: f64| {
            (
                bounds.x + (bounds.width / 2.0) + ((wx - camera_center_x) * zoom_scale) as f32,
                bounds.y + (bounds.height / 2.0) + ((wy - camera_center_y) * zoom_scale) as f32,
            )
        };

        renderer.with_layer(bounds, |renderer| {
            renderer.fill_quad(
                renderer::Quad {
                    bounds,
                    border: iced::Border::default(),
                    ..Default::default()
                },
                self.palette.background_secondary,
            );

            // --- Tile Layer ---
            let z = zoom.floor().clamp(0.0, MAX_ZOOM) as u32;
            let num_tiles = 2u32.pow(z);
            let tile_size_z0 = TILE_SIZE / 2.0f64.powf(z as f64);

            let half_w = (bounds.width as f64 / 2.0) / zoom_scale;
            let half_h = (bounds.height as f64 / 2.0) / zoom_scale;

            let min_tx = ((camera_center_x - half_w) / tile_size_z0).floor() as i32;
            let max_tx = ((camera_center_x + half_w) / tile_size_z0).ceil() as i32;
            let min_ty = ((camera_center_y - half_h) / tile_size_z0).floor() as i32;
            let max_ty = ((camera_center_y + half_h) / tile_size_z0).ceil() as i32;

            for tx in min_tx.max(0)..=max_tx.min(num_tiles as i32 - 1) {
                for ty in min_ty.max(0)..=max_ty.min(num_tiles as i32 - 1) {
                    let coords = TileCoords {
                        x: tx as u32,
                        y: ty as u32,
                        z,
                    };
                    let (screen_x, screen_y) =
                        to_screen(tx as f64 * tile_size_z0, ty as f64 * tile_size_z0);
                    let current_tile_size = (tile_size_z0 * zoom_scale) as f32;

                    let tile_rect = Rectangle {
                        x: screen_x,
                        y: screen_y,
                        width: current_tile_size,
                        height: current_tile_size,
                    };

                    if let Some(handle) = self.tile_manager.get_tile(coords) {
                        renderer.draw_image(
                            advanced::image::Image {
                                handle,
                                filter_method: image::FilterMethod::Linear,
                                rotation: Radians(0.0),
                                opacity: 1.0,
                                snap: false,
                            },
                            tile_rect,
                        );
                    } else {
                        renderer.fill_quad(
                            renderer::Quad {
                                bounds: tile_rect,
                                ..Default::default()
                            },
                            self.palette.background_primary,
                        );
                        self.tile_manager.request_tile(coords);
                    }
                }
            }
        });

        // --- Marker Layer ---
        renderer.with_layer(bounds, |renderer| {
            let base_color = self.marker_color();
            let highlight = Color::from_rgb(1.0, 0.85, 0.0);

            for friend in &self.friends {
                let is_selected = self.selected == Some(friend.id.as_str());
                let is_hovered = self.hovered == Some(friend.id.as_str());
                let size: f32 = if is_selected || is_hovered { 18.0 } else { 12.0 };
                let fill = if is_selected { highlight } else { base_color };

                let (sx, sy) = to_screen(
                    lon_to_x(friend.longitude, 0.0),
                    lat_to_y(friend.latitude, 0.0),
                );
                if !bounds.contains(iced::Point::new(sx, sy)) {
                    continue;
                }

                renderer.fill_quad(
                    renderer::Quad {
                        bounds: Rectangle {
                            x: sx - size / 2.0,
                            y: sy - size / 2.0,
                            width: size,
                            height: size,
                        },
                        border: iced::Border {
                            color: Color::WHITE,
                            width: if is_hovered { 3.0 } else { 2.0 },
                            radius: (size / 2.0).into(),
                        },
                        ..Default::default()
                    },
                    fill,
                );
            }
        });
    }

    fn on_event(
        &mut self,
        tree: &mut widget::Tree,
        event: Event,
        layout: iced::advanced::Layout<'_>,
        cursor: mouse::Cursor,
        _renderer: &Renderer,
        _clipboard: &mut dyn advanced::Clipboard,
        shell: &mut advanced::Shell<'_, Message>,
        _viewport: &Rectangle,
    ) -> advanced::graphics::core::event::Status {
        let state = tree.state.downcast_mut::<MapState>();
        let bounds = layout.bounds();
        let kind = self.kind;
        let zoom_prop = self.camera.zoom;
        let center_prop = self.camera.center;

        // A fly-to or map switch moved the camera.
        if state.seen_camera_center != Some(center_prop) || state.seen_camera_zoom != Some(zoom_prop) {
            state.live_center = center_prop;
            state.live_zoom = zoom_prop;
            state.seen_camera_center = Some(center_prop);
            state.seen_camera_zoom = Some(zoom_prop);
        }

        let current_zoom = state.live_zoom;
        let (center_lat, center_lon) = state.live_center;

        let camera_x = lon_to_x(center_lon, 0.0);
        let camera_y = lat_to_y(center_lat, 0.0);
        let scale = 2.0f64.powf(current_zoom);

        let cursor_point = cursor.position_in(bounds);
        let mouse_z0 = cursor_point.map(|p| {
            let rx = (p.x as f64) - (bounds.width as f64 / 2.0);
            let ry = (p.y as f64) - (bounds.height as f64 / 2.0);
            (camera_x + rx / scale, camera_y + ry / scale)
        });

        match event {
            Event::Mouse(mouse::Event::WheelScrolled { delta }) => {
                if let Some(p) = cursor_point {
                    let d = match delta {
                        mouse::ScrollDelta::Lines { y, .. } => y as f64,
                        mouse::ScrollDelta::Pixels { y, .. } => (y as f64) / 100.0,
                    };
                    let min_zoom = (bounds.width as f64 / TILE_SIZE).log2().max(0.0);
                    let new_zoom = (current_zoom + d * 0.2).clamp(min_zoom, MAX_ZOOM);

                    if (new_zoom - current_zoom).abs() > 0.001 {
                        let new_scale = 2.0f64.powf(new_zoom);

                        let mx = (p.x as f64) - (bounds.width as f64 / 2.0);
                        let my = (p.y as f64) - (bounds.height as f64 / 2.0);

                        let new_camera_x = camera_x + mx / scale - mx / new_scale;
                        let new_camera_y = camera_y + my / scale - my / new_scale;

                        let new_half_w = ((bounds.width as f64 / 2.0) / new_scale).min(TILE_SIZE / 2.0);
                        let new_center = (
                            y_to_lat(new_camera_y.clamp(0.0, TILE_SIZE), 0.0),
                            x_to_lon(new_camera_x.clamp(new_half_w, TILE_SIZE - new_half_w), 0.0),
                        );

                        state.live_center = new_center;
                        state.live_zoom = new_zoom;

                        shell.publish(Message::MapMoved {
                            kind,
                            center: new_center,
                            zoom: new_zoom,
                        });
                        return advanced::graphics::core::event::Status::Captured;
                    }
                }
            }
            Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) => {
                if cursor.is_over(bounds) {
                    if let Some(position) = cursor.position() {
                        state.is_dragging = true;
                        state.press_position = Some(position);
                        state.last_cursor = Some(position);
                        return advanced::graphics::core::event::Status::Captured;
                    }
                }
            }
            Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Left)) => {
                let was_dragging = state.is_dragging;
                let press_pos = state.press_position;
                let release_pos = cursor.position();

                state.is_dragging = false;
                state.press_position = None;
                state.last_cursor = None;

                if was_dragging {
                    // Under 5px of travel is a click.
                    if let (Some(p1), Some(p2), Some(world)) = (press_pos, release_pos, mouse_z0) {
                        if (p1.x - p2.x).hypot(p1.y - p2.y) < 5.0 {
                            if let Some(friend) = self.hit_test(world, scale) {
                                shell.publish(Message::SelectFriend(friend.id.clone()));
                            }
                        }
                    }
                    return advanced::graphics::core::event::Status::Captured;
                }
            }
            Event::Mouse(mouse::Event::CursorMoved { position }) => {
                if state.is_dragging {
                    if let Some(last_pos) = state.last_cursor {
                        let delta = position - last_pos;
                        state.last_cursor = Some(position);

                        let new_wx = camera_x - delta.x as f64 / scale;
                        let new_wy = camera_y - delta.y as f64 / scale;

                        let half_vw = (bounds.width as f64 / 2.0) / scale;
                        let half_vh = (bounds.height as f64 / 2.0) / scale;

                        let clamped_wx = if half_vw * 2.0 >= TILE_SIZE {
                            TILE_SIZE / 2.0
                        } else {
                            new_wx.clamp(half_vw, TILE_SIZE - half_vw)
                        };
                        let clamped_wy = if half_vh * 2.0 >= TILE_SIZE {
                            TILE_SIZE / 2.0
                        } else {
                            new_wy.clamp(half_vh, TILE_SIZE - half_vh)
                        };

                        let new_center = (y_to_lat(clamped_wy, 0.0), x_to_lon(clamped_wx, 0.0));
                        state.live_center = new_center;

                        shell.publish(Message::MapMoved {
                            kind,
                            center: new_center,
                            zoom: current_zoom,
                        });
                        return advanced::graphics::core::event::Status::Captured;
                    }
                }

                if let Some(world) = mouse_z0 {
                    let hit = self.hit_test(world, scale).map(|f| f.id.as_str());
                    if hit != self.hovered {
                        shell.publish(Message::HoverFriend(hit.map(str::to_string)));
                        return advanced::graphics::core::event::Status::Captured;
                    }
                }
            }
            _ => {}
        }

        advanced::graphics::core::event::Status::Ignored
    }

    fn mouse_interaction(
        &self,
        _tree: &widget::Tree,
        layout: iced::advanced::Layout<'_>,
        cursor: mouse::Cursor,
        _viewport: &Rectangle,
        _renderer: &Renderer,
    ) -> mouse::Interaction {
        if self.hovered.is_some() && cursor.is_over(layout.bounds()) {
            mouse::Interaction::Pointer
        } else if cursor.is_over(layout.bounds()) {
            mouse::Interaction::Grab
        } else {
            mouse::Interaction::default()
        }
    }
}

impl<'a, Theme, Renderer> From<FriendMapView<'a>> for Element<'a, Message, Theme, Renderer>
where
    Theme: 'a,
    Renderer: 'a + renderer::Renderer + advanced::image::Renderer<Handle = image::Handle>,
{
    fn from(map_view: FriendMapView<'a>) -> Self {
        Self::new(map_view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use friends_map_core::navigation::MapView;

    #[test]
    fn test_mercator_round_trip_axis() {
        let x = lon_to_x(116.4, 3.0);
        assert!((x_to_lon(x, 3.0) - 116.4).abs() < 1e-9);
        let y = lat_to_y(39.9, 3.0);
        assert!((y_to_lat(y, 3.0) - 39.9).abs() < 1e-9);
    }

    #[test]
    fn test_camera_fly_to_default_zoom() {
        let mut camera = MapCamera::new(MapKind::China);
        assert_eq!(camera.center, (35.0, 105.0));
        assert!(!camera.is_ready());

        camera.fly_to(39.9, 116.4, None);
        assert_eq!(camera.center, (39.9, 116.4));
        assert_eq!(camera.zoom(), DEFAULT_FLY_TO_ZOOM);

        camera.fly_to(89.0, 0.0, Some(42.0));
        assert_eq!(camera.center.0, MAX_LAT);
        assert_eq!(camera.zoom, MAX_ZOOM);
    }
}
