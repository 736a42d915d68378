//! The primary and detail map views.

use egui::Ui;
use eyre::Result;
use log::warn;
use poll_promise::Promise;
use std::sync::Arc;

use crate::MapView;
use crate::config::{DETAIL_ZOOM, OpenStreetMapConfig};
use crate::geolocate;
use crate::projection::GeoPos;

/// The interactive map on which the user selects a location.
///
/// A click always adopts the clicked coordinate. A one-shot geolocation lookup
/// is started on the first frame; its fix is adopted only while no position is
/// set, so a later fix never displaces a click (first-fix-wins). Every adopted
/// coordinate is reported to the caller from [`PrimaryMap::show`].
pub struct PrimaryMap {
    map: MapView,
    position: Option<GeoPos>,
    locate: Option<Promise<Result<GeoPos, Arc<eyre::Report>>>>,
    locate_requested: bool,
}

impl Default for PrimaryMap {
    fn default() -> Self {
        Self {
            map: MapView::new(OpenStreetMapConfig::default()),
            position: None,
            locate: None,
            locate_requested: false,
        }
    }
}

impl PrimaryMap {
    /// The currently selected position, if any.
    pub fn position(&self) -> Option<GeoPos> {
        self.position
    }

    /// Adopts a clicked coordinate. Clicks always overwrite the current
    /// position.
    fn on_click(&mut self, pos: GeoPos) -> GeoPos {
        self.position = Some(pos);
        pos
    }

    /// Adopts a geolocation fix only when no position is set yet. Returns the
    /// fix when it was adopted.
    fn on_location_found(&mut self, pos: GeoPos) -> Option<GeoPos> {
        if self.position.is_none() {
            self.position = Some(pos);
            Some(pos)
        } else {
            None
        }
    }

    /// Renders the map and returns the coordinate adopted this frame, if any.
    pub fn show(&mut self, ui: &mut Ui) -> Option<GeoPos> {
        let mut adopted = None;

        // Ask for the user's location once, while nothing is selected yet.
        if self.position.is_none() && !self.locate_requested {
            self.locate = Some(geolocate::locate());
            self.locate_requested = true;
        }

        if let Some(promise) = self.locate.take_if(|p| p.ready().is_some()) {
            match promise.block_and_take() {
                Ok(fix) => {
                    if let Some(pos) = self.on_location_found(fix) {
                        self.map.set_marker(pos);
                        adopted = Some(pos);
                    }
                    // Pan to the fix whether or not it was adopted.
                    self.map.fly_to(fix);
                }
                Err(e) => {
                    // No fallback: the map stays markerless until the user
                    // clicks.
                    warn!("{e:?}");
                }
            }
        } else if self.locate.is_some() {
            // Poll again next frame.
            ui.ctx().request_repaint();
        }

        ui.add(&mut self.map);

        if let Some(clicked) = self.map.take_click() {
            let pos = self.on_click(clicked);
            self.map.set_marker(pos);
            self.map.fly_to(pos);
            adopted = Some(pos);
        }

        adopted
    }
}

/// A close-up, non-interactive map of a selected location.
///
/// The center is read once at construction; the view never re-centers, pans or
/// zooms afterwards.
pub struct DetailMap {
    map: MapView,
    center: GeoPos,
}

impl DetailMap {
    /// Creates a detail view centered on `center` at [`DETAIL_ZOOM`], with a
    /// marker and popup at the center.
    pub fn new(center: GeoPos) -> Self {
        let mut map = MapView::non_interactive(OpenStreetMapConfig::centered_at(center, DETAIL_ZOOM));
        map.set_marker(center);
        Self { map, center }
    }

    /// The fixed center of the view.
    pub fn center(&self) -> GeoPos {
        self.center
    }

    /// The fixed zoom level of the view.
    pub fn zoom(&self) -> u8 {
        self.map.zoom
    }

    /// Renders the map.
    pub fn show(&mut self, ui: &mut Ui) {
        ui.add(&mut self.map);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_ZOOM;

    #[test]
    fn click_always_adopts() {
        let mut primary = PrimaryMap::default();
        assert!(primary.position().is_none());

        let first = GeoPos::new(40.7128, -74.0060);
        assert_eq!(primary.on_click(first), first);
        assert_eq!(primary.position(), Some(first));

        // Repeated clicks keep overwriting.
        let second = GeoPos::new(38.9072, -77.0369);
        assert_eq!(primary.on_click(second), second);
        assert_eq!(primary.position(), Some(second));
    }

    #[test]
    fn first_fix_is_adopted() {
        let mut primary = PrimaryMap::default();

        let fix = GeoPos::new(51.5074, -0.1275);
        assert_eq!(primary.on_location_found(fix), Some(fix));
        assert_eq!(primary.position(), Some(fix));
    }

    #[test]
    fn later_fix_never_overwrites() {
        let mut primary = PrimaryMap::default();

        let first_fix = GeoPos::new(51.5074, -0.1275);
        primary.on_location_found(first_fix);

        let second_fix = GeoPos::new(60.16952, 24.93545);
        assert_eq!(primary.on_location_found(second_fix), None);
        assert_eq!(primary.position(), Some(first_fix));
    }

    #[test]
    fn fix_never_overwrites_a_click() {
        let mut primary = PrimaryMap::default();

        let clicked = GeoPos::new(40.7128, -74.0060);
        primary.on_click(clicked);

        let fix = GeoPos::new(51.5074, -0.1275);
        assert_eq!(primary.on_location_found(fix), None);
        assert_eq!(primary.position(), Some(clicked));
    }

    #[test]
    fn click_overwrites_a_fix() {
        let mut primary = PrimaryMap::default();

        let fix = GeoPos::new(51.5074, -0.1275);
        primary.on_location_found(fix);

        let clicked = GeoPos::new(40.7128, -74.0060);
        primary.on_click(clicked);
        assert_eq!(primary.position(), Some(clicked));
    }

    #[test]
    fn primary_map_starts_at_defaults() {
        let primary = PrimaryMap::default();
        assert_eq!(primary.map.zoom, DEFAULT_ZOOM);
        assert!(primary.map.marker_pos().is_none());
    }

    #[test]
    fn detail_map_is_fixed_on_its_center() {
        let center = GeoPos::new(38.9072, -77.0369);
        let detail = DetailMap::new(center);

        assert_eq!(detail.center(), center);
        assert_eq!(detail.zoom(), DETAIL_ZOOM);
        assert_eq!(detail.map.center, center);
        assert_eq!(detail.map.marker_pos(), Some(center));
    }
}
