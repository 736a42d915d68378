#![warn(missing_docs)]

//! A click-to-select location picker built on an `egui` slippy map.
//!
//! The crate provides a reusable [`MapView`] widget that downloads tiles from
//! a [`config::MapConfig`] provider, plus the picker views built on top of it:
//! [`picker::PrimaryMap`] for selecting a point (by click or an initial
//! geolocation fix) and [`picker::DetailMap`] for a close-up of the selection.
//! [`app::PickerApp`] composes them into a full application.
//!
//! # Example
//!
//! ```no_run
//! use egui_location_picker::app::PickerApp;
//!
//! fn main() -> eframe::Result {
//!     eframe::run_native(
//!         "Location picker",
//!         eframe::NativeOptions::default(),
//!         Box::new(|_cc| Ok(Box::new(PickerApp::default()))),
//!     )
//! }
//! ```

/// The application container: selection state, summary panel, detail view.
pub mod app;

/// Configuration for map tile providers and the picker's named defaults.
pub mod config;

/// One-shot geolocation lookup.
pub mod geolocate;

/// The selected-point marker and its shared default icon.
pub mod marker;

/// The primary and detail map views.
pub mod picker;

/// Geographic coordinates and Web Mercator math.
pub mod projection;

/// Tile cache and download machinery.
pub mod tiles;

use eframe::egui;
use egui::{Color32, Rect, Response, Sense, Ui, Vec2, Widget};
use std::collections::HashMap;
use thiserror::Error;

use crate::config::MapConfig;
use crate::marker::{Marker, MarkerIcon};
use crate::projection::{GeoPos, MapProjection, lat_to_y, lon_to_x, x_to_lon, y_to_lat};
use crate::tiles::{Tile, TileId, draw_tile, load_tile};

// The size of a map tile in pixels.
pub(crate) const TILE_SIZE: u32 = 256;
/// The minimum zoom level.
pub const MIN_ZOOM: u8 = 0;
/// The maximum zoom level.
pub const MAX_ZOOM: u8 = 19;

// Duration of the fly-to pan animation in seconds.
const FLY_TO_DURATION: f64 = 0.6;

/// Errors that can occur while using the map views.
#[derive(Error, Debug)]
pub enum MapError {
    /// An error occurred while making a web request.
    #[error("Connection error")]
    ConnectionError(#[from] reqwest::Error),

    /// A remote resource failed to download.
    #[error("A download failed. HTTP Status: `{0}`")]
    DownloadError(String),

    /// Downloaded bytes could not be decoded as an image.
    #[error("Unable to decode downloaded bytes as image")]
    ImageDecodeError(#[from] image::ImageError),

    /// The geolocation service response could not be parsed.
    #[error("Unable to parse geolocation response")]
    ResponseParseError(#[from] serde_json::Error),

    /// The geolocation service could not produce a position.
    #[error("Geolocation failed: {0}")]
    LocateError(String),
}

/// An in-flight pan animation between two centers at a fixed zoom.
struct FlyTo {
    from: GeoPos,
    to: GeoPos,
    start_time: Option<f64>,
}

/// A slippy map widget with an optional selected-point marker.
pub struct MapView {
    /// The geographical center of the map.
    pub center: GeoPos,

    /// The zoom level of the map.
    pub zoom: u8,

    tiles: HashMap<TileId, Tile>,
    marker: Option<Marker>,
    icon: MarkerIcon,
    config: Box<dyn MapConfig>,
    interactive: bool,
    fly_to: Option<FlyTo>,
    clicked: Option<GeoPos>,
}

impl MapView {
    /// Creates a new interactive `MapView`.
    ///
    /// # Arguments
    ///
    /// * `config` - A type that implements `MapConfig`, which provides configuration for the map.
    pub fn new<C: MapConfig + 'static>(config: C) -> Self {
        let center = config.default_center();
        let zoom = config.default_zoom();
        Self {
            tiles: HashMap::new(),
            marker: None,
            icon: MarkerIcon::default(),
            config: Box::new(config),
            interactive: true,
            fly_to: None,
            clicked: None,
            center,
            zoom,
        }
    }

    /// Creates a `MapView` that ignores all pointer input. Used for the detail
    /// view, which never pans, zooms or listens for clicks.
    pub fn non_interactive<C: MapConfig + 'static>(config: C) -> Self {
        let mut map = Self::new(config);
        map.interactive = false;
        map
    }

    /// Places the marker at `pos` with a fresh popup, replacing any previous
    /// marker.
    pub fn set_marker(&mut self, pos: GeoPos) {
        self.marker = Some(Marker::new(pos));
    }

    /// The current marker position, if a marker is placed.
    pub fn marker_pos(&self) -> Option<GeoPos> {
        self.marker.as_ref().map(|m| m.pos)
    }

    /// Starts a smooth pan to `target` at the current zoom level.
    pub fn fly_to(&mut self, target: GeoPos) {
        self.fly_to = Some(FlyTo {
            from: self.center,
            to: target,
            start_time: None,
        });
    }

    /// Returns the coordinate of a click since the last call, if any.
    pub fn take_click(&mut self) -> Option<GeoPos> {
        self.clicked.take()
    }

    /// Handles user input for panning, zooming and point selection.
    fn handle_input(&mut self, ui: &Ui, rect: &Rect, response: Response) {
        if !self.interactive {
            return;
        }

        // A plain click selects a point. egui only reports `clicked` when the
        // press was not a drag, so panning does not produce selections.
        if response.clicked() {
            if let Some(pointer_pos) = response.interact_pointer_pos() {
                let projection = MapProjection::new(self.zoom, self.center, *rect);
                self.clicked = Some(projection.unproject(pointer_pos));
            }
        }

        // Handle panning. A manual drag cancels an in-flight fly-to.
        if response.dragged() {
            self.fly_to = None;

            let delta = response.drag_delta();
            let center_in_tiles_x = lon_to_x(self.center.lon, self.zoom);
            let center_in_tiles_y = lat_to_y(self.center.lat, self.zoom);

            let mut new_center_x = center_in_tiles_x - (delta.x as f64 / TILE_SIZE as f64);
            let mut new_center_y = center_in_tiles_y - (delta.y as f64 / TILE_SIZE as f64);

            // Clamp the new center to the map boundaries.
            let world_size_in_tiles = 2.0_f64.powi(self.zoom as i32);
            let view_size_in_tiles_x = rect.width() as f64 / TILE_SIZE as f64;
            let view_size_in_tiles_y = rect.height() as f64 / TILE_SIZE as f64;

            let min_center_x = view_size_in_tiles_x / 2.0;
            let max_center_x = world_size_in_tiles - view_size_in_tiles_x / 2.0;
            let min_center_y = view_size_in_tiles_y / 2.0;
            let max_center_y = world_size_in_tiles - view_size_in_tiles_y / 2.0;

            // If the map is smaller than the viewport, center it. Otherwise, clamp the center.
            new_center_x = if min_center_x > max_center_x {
                world_size_in_tiles / 2.0
            } else {
                new_center_x.clamp(min_center_x, max_center_x)
            };
            new_center_y = if min_center_y > max_center_y {
                world_size_in_tiles / 2.0
            } else {
                new_center_y.clamp(min_center_y, max_center_y)
            };

            self.center = GeoPos::new(
                y_to_lat(new_center_y, self.zoom),
                x_to_lon(new_center_x, self.zoom),
            );
        }

        // Handle scroll zooming around the cursor.
        if response.hovered() {
            if let Some(mouse_pos) = response.hover_pos() {
                let mouse_rel = mouse_pos - rect.min;

                // Determine the geo-coordinate under the mouse cursor.
                let center_x = lon_to_x(self.center.lon, self.zoom);
                let center_y = lat_to_y(self.center.lat, self.zoom);
                let widget_center_x = rect.width() as f64 / 2.0;
                let widget_center_y = rect.height() as f64 / 2.0;

                let target_x = center_x + (mouse_rel.x as f64 - widget_center_x) / TILE_SIZE as f64;
                let target_y = center_y + (mouse_rel.y as f64 - widget_center_y) / TILE_SIZE as f64;

                let scroll = ui.input(|i| i.raw_scroll_delta.y);
                if scroll != 0.0 {
                    let old_zoom = self.zoom;
                    let mut new_zoom = (self.zoom as i32 + scroll.signum() as i32)
                        .clamp(MIN_ZOOM as i32, MAX_ZOOM as i32)
                        as u8;

                    // If we are zooming out, check if the new zoom level is valid.
                    if scroll < 0.0 {
                        let world_pixel_size = 2.0_f64.powi(new_zoom as i32) * TILE_SIZE as f64;
                        // If the world size would become smaller than the widget size, reject the zoom.
                        if world_pixel_size < rect.width() as f64
                            || world_pixel_size < rect.height() as f64
                        {
                            new_zoom = old_zoom;
                        }
                    }

                    if new_zoom != old_zoom {
                        self.fly_to = None;

                        let target_lon = x_to_lon(target_x, old_zoom);
                        let target_lat = y_to_lat(target_y, old_zoom);

                        // Set the new zoom level
                        self.zoom = new_zoom;

                        // Adjust the map center so the geo-coordinate under the mouse remains the
                        // same
                        let new_target_x = lon_to_x(target_lon, new_zoom);
                        let new_target_y = lat_to_y(target_lat, new_zoom);

                        let new_center_x = new_target_x
                            - (mouse_rel.x as f64 - widget_center_x) / TILE_SIZE as f64;
                        let new_center_y = new_target_y
                            - (mouse_rel.y as f64 - widget_center_y) / TILE_SIZE as f64;

                        self.center = GeoPos::new(
                            y_to_lat(new_center_y, new_zoom),
                            x_to_lon(new_center_x, new_zoom),
                        );
                    }
                }
            }
        }
    }

    /// Advances the fly-to animation, if one is in flight.
    fn update_fly_to(&mut self, ui: &Ui) {
        let Some(anim) = &mut self.fly_to else {
            return;
        };

        let now = ui.input(|i| i.time);
        let start = *anim.start_time.get_or_insert(now);
        let t = ((now - start) / FLY_TO_DURATION).clamp(0.0, 1.0);

        self.center = interpolate_center(anim.from, anim.to, ease_in_out(t), self.zoom);

        if t >= 1.0 {
            self.fly_to = None;
        } else {
            ui.ctx().request_repaint();
        }
    }

    /// Draws the map tiles, marker and attribution.
    fn draw_map(&mut self, ui: &mut Ui, rect: &Rect) {
        let painter = ui.painter_at(*rect);
        painter.rect_filled(*rect, 0.0, Color32::from_rgb(220, 220, 220)); // Background

        let visible_tiles: Vec<_> = self.visible_tiles(rect).collect();
        for (tile_id, _) in &visible_tiles {
            load_tile(&mut self.tiles, self.config.as_ref(), ui.ctx(), *tile_id);
        }
        for (tile_id, tile_pos) in visible_tiles {
            draw_tile(&self.tiles, ui, &painter, tile_id, tile_pos);
        }

        if let Some(marker) = &mut self.marker {
            let projection = MapProjection::new(self.zoom, self.center, *rect);
            marker.draw(ui, &painter, &projection, &mut self.icon);
        }

        self.draw_attribution(ui, rect);
    }

    /// Returns an iterator over the visible tiles.
    fn visible_tiles(&self, rect: &Rect) -> impl Iterator<Item = (TileId, egui::Pos2)> {
        let center_x = lon_to_x(self.center.lon, self.zoom);
        let center_y = lat_to_y(self.center.lat, self.zoom);

        let widget_center_x = rect.width() / 2.0;
        let widget_center_y = rect.height() / 2.0;

        let x_min = (center_x - widget_center_x as f64 / TILE_SIZE as f64).floor() as i32;
        let y_min = (center_y - widget_center_y as f64 / TILE_SIZE as f64).floor() as i32;
        let x_max = (center_x + widget_center_x as f64 / TILE_SIZE as f64).ceil() as i32;
        let y_max = (center_y + widget_center_y as f64 / TILE_SIZE as f64).ceil() as i32;

        let zoom = self.zoom;
        let world_size = 1_i64 << zoom;
        let rect_min = rect.min;
        (x_min..=x_max).flat_map(move |x| {
            (y_min..=y_max).filter_map(move |y| {
                // Skip tile indices outside the world; there is nothing to fetch there.
                if x < 0 || y < 0 || x as i64 >= world_size || y as i64 >= world_size {
                    return None;
                }
                let tile_id = TileId {
                    z: zoom,
                    x: x as u32,
                    y: y as u32,
                };
                let screen_x = widget_center_x + (x as f64 - center_x) as f32 * TILE_SIZE as f32;
                let screen_y = widget_center_y + (y as f64 - center_y) as f32 * TILE_SIZE as f32;
                let tile_pos = rect_min + Vec2::new(screen_x, screen_y);
                Some((tile_id, tile_pos))
            })
        })
    }

    /// Draws the attribution text.
    fn draw_attribution(&self, ui: &mut Ui, rect: &Rect) {
        if let Some(attribution) = self.config.attribution() {
            let (_text_color, bg_color) = if ui.visuals().dark_mode {
                (Color32::from_gray(230), Color32::from_black_alpha(150))
            } else {
                (Color32::from_gray(80), Color32::from_white_alpha(150))
            };

            let frame = egui::Frame::NONE
                .inner_margin(egui::Margin::same(5)) // A bit of padding
                .fill(bg_color)
                .corner_radius(3.0);

            egui::Area::new(ui.id().with("attribution"))
                .fixed_pos(rect.left_bottom())
                .anchor(egui::Align2::LEFT_BOTTOM, egui::vec2(5.0, -5.0))
                .show(ui.ctx(), |ui| {
                    frame.show(ui, |ui| {
                        ui.style_mut().override_text_style = Some(egui::TextStyle::Small);
                        ui.style_mut().wrap_mode = Some(egui::TextWrapMode::Extend); // Don't wrap attribution text.

                        if let Some(url) = self.config.attribution_url() {
                            ui.hyperlink_to(attribution, url);
                        } else {
                            ui.label(attribution);
                        }
                    });
                });
        }
    }
}

/// Smoothstep easing for the fly-to animation.
fn ease_in_out(t: f64) -> f64 {
    t * t * (3.0 - 2.0 * t)
}

/// Interpolates between two centers in tile space, where panning is linear on
/// screen.
fn interpolate_center(from: GeoPos, to: GeoPos, t: f64, zoom: u8) -> GeoPos {
    let from_x = lon_to_x(from.lon, zoom);
    let from_y = lat_to_y(from.lat, zoom);
    let to_x = lon_to_x(to.lon, zoom);
    let to_y = lat_to_y(to.lat, zoom);

    let x = from_x + (to_x - from_x) * t;
    let y = from_y + (to_y - from_y) * t;

    GeoPos::new(y_to_lat(y, zoom), x_to_lon(x, zoom))
}

impl Widget for &mut MapView {
    fn ui(self, ui: &mut Ui) -> Response {
        let (rect, response) =
            ui.allocate_exact_size(ui.available_size(), Sense::drag().union(Sense::click()));
        let response_clone = response.clone();
        self.handle_input(ui, &rect, response_clone);
        self.update_fly_to(ui);
        self.draw_map(ui, &rect);

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_CENTER, DEFAULT_ZOOM, OpenStreetMapConfig};

    const EPSILON: f64 = 1e-9;

    #[test]
    fn map_view_new() {
        let mut map = MapView::new(OpenStreetMapConfig::default());

        assert_eq!(map.center, DEFAULT_CENTER);
        assert_eq!(map.zoom, DEFAULT_ZOOM);
        assert!(map.marker_pos().is_none());
        assert!(map.take_click().is_none());
        assert!(map.tiles.is_empty());
    }

    #[test]
    fn set_marker_replaces_position() {
        let mut map = MapView::new(OpenStreetMapConfig::default());

        map.set_marker(GeoPos::new(40.7128, -74.0060));
        assert_eq!(map.marker_pos(), Some(GeoPos::new(40.7128, -74.0060)));

        map.set_marker(GeoPos::new(38.9072, -77.0369));
        assert_eq!(map.marker_pos(), Some(GeoPos::new(38.9072, -77.0369)));
    }

    #[test]
    fn ease_in_out_endpoints() {
        assert!((ease_in_out(0.0) - 0.0).abs() < EPSILON);
        assert!((ease_in_out(1.0) - 1.0).abs() < EPSILON);
        assert!((ease_in_out(0.5) - 0.5).abs() < EPSILON);
    }

    #[test]
    fn interpolate_center_endpoints() {
        let from = GeoPos::new(38.9072, -77.0369);
        let to = GeoPos::new(40.7128, -74.0060);

        let at_start = interpolate_center(from, to, 0.0, 8);
        assert!((at_start.lat - from.lat).abs() < EPSILON);
        assert!((at_start.lon - from.lon).abs() < EPSILON);

        let at_end = interpolate_center(from, to, 1.0, 8);
        assert!((at_end.lat - to.lat).abs() < EPSILON);
        assert!((at_end.lon - to.lon).abs() < EPSILON);
    }

    #[test]
    fn interpolate_center_moves_monotonically() {
        let from = GeoPos::new(38.9072, -77.0369);
        let to = GeoPos::new(40.7128, -74.0060);

        let mut prev = from;
        for step in 1..=10 {
            let t = step as f64 / 10.0;
            let pos = interpolate_center(from, to, t, 8);
            assert!(pos.lat >= prev.lat);
            assert!(pos.lon >= prev.lon);
            prev = pos;
        }
    }

    #[test]
    fn fly_to_is_pan_only() {
        let mut map = MapView::new(OpenStreetMapConfig::default());
        let zoom_before = map.zoom;
        map.fly_to(GeoPos::new(40.7128, -74.0060));
        // The animation never touches the zoom level.
        assert_eq!(map.zoom, zoom_before);
        assert!(map.fly_to.is_some());
    }

    #[test]
    fn visible_tiles_stay_inside_the_world() {
        let mut map = MapView::new(OpenStreetMapConfig::default());
        map.zoom = 1;
        map.center = GeoPos::new(0.0, 0.0);

        let rect = Rect::from_min_size(egui::pos2(0.0, 0.0), egui::vec2(2000.0, 2000.0));
        for (tile_id, _) in map.visible_tiles(&rect) {
            assert!(tile_id.x < 2);
            assert!(tile_id.y < 2);
        }
    }
}
