//! Geographic coordinates and Web Mercator math.

use egui::Rect;
use serde::{Deserialize, Serialize};

use crate::TILE_SIZE;

/// A geographical position.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPos {
    /// Latitude in degrees, positive north.
    pub lat: f64,

    /// Longitude in degrees, positive east.
    pub lon: f64,
}

impl GeoPos {
    /// Creates a new `GeoPos`.
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Formats a coordinate component to four decimal places, the precision used
/// everywhere a latitude or longitude is shown to the user.
pub fn format_coord(value: f64) -> String {
    format!("{:.4}", value)
}

/// Converts longitude to the x-coordinate of a tile at a given zoom level.
pub(crate) fn lon_to_x(lon: f64, zoom: u8) -> f64 {
    (lon + 180.0) / 360.0 * (2.0_f64.powi(zoom as i32))
}

/// Converts latitude to the y-coordinate of a tile at a given zoom level.
pub(crate) fn lat_to_y(lat: f64, zoom: u8) -> f64 {
    (1.0 - lat.to_radians().tan().asinh() / std::f64::consts::PI) / 2.0
        * (2.0_f64.powi(zoom as i32))
}

/// Converts the x-coordinate of a tile to longitude at a given zoom level.
pub(crate) fn x_to_lon(x: f64, zoom: u8) -> f64 {
    x / (2.0_f64.powi(zoom as i32)) * 360.0 - 180.0
}

/// Converts the y-coordinate of a tile to latitude at a given zoom level.
pub(crate) fn y_to_lat(y: f64, zoom: u8) -> f64 {
    let n = std::f64::consts::PI - 2.0 * std::f64::consts::PI * y / (2.0_f64.powi(zoom as i32));
    n.sinh().atan().to_degrees()
}

/// A helper for converting between geographical and screen coordinates.
pub struct MapProjection {
    zoom: u8,
    center: GeoPos,
    widget_rect: Rect,
}

impl MapProjection {
    /// Creates a new `MapProjection`.
    pub(crate) fn new(zoom: u8, center: GeoPos, widget_rect: Rect) -> Self {
        Self {
            zoom,
            center,
            widget_rect,
        }
    }

    /// Projects a geographical coordinate to a screen coordinate.
    pub fn project(&self, geo_pos: GeoPos) -> egui::Pos2 {
        let center_x = lon_to_x(self.center.lon, self.zoom);
        let center_y = lat_to_y(self.center.lat, self.zoom);

        let tile_x = lon_to_x(geo_pos.lon, self.zoom);
        let tile_y = lat_to_y(geo_pos.lat, self.zoom);

        let dx = (tile_x - center_x) * TILE_SIZE as f64;
        let dy = (tile_y - center_y) * TILE_SIZE as f64;

        let widget_center = self.widget_rect.center();
        widget_center + egui::vec2(dx as f32, dy as f32)
    }

    /// Un-projects a screen coordinate to a geographical coordinate.
    pub fn unproject(&self, screen_pos: egui::Pos2) -> GeoPos {
        let rel_pos = screen_pos - self.widget_rect.min;
        let widget_center_x = self.widget_rect.width() as f64 / 2.0;
        let widget_center_y = self.widget_rect.height() as f64 / 2.0;

        let center_x = lon_to_x(self.center.lon, self.zoom);
        let center_y = lat_to_y(self.center.lat, self.zoom);

        let target_x = center_x + (rel_pos.x as f64 - widget_center_x) / TILE_SIZE as f64;
        let target_y = center_y + (rel_pos.y as f64 - widget_center_y) / TILE_SIZE as f64;

        GeoPos::new(y_to_lat(target_y, self.zoom), x_to_lon(target_x, self.zoom))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::{Rect, pos2, vec2};

    const EPSILON: f64 = 1e-9;

    #[test]
    fn coord_conversion_roundtrip() {
        // Washington D.C.
        let original_lon = -77.0369;
        let original_lat = 38.9072;
        let zoom: u8 = 8;

        let x = lon_to_x(original_lon, zoom);
        let y = lat_to_y(original_lat, zoom);

        assert!((original_lon - x_to_lon(x, zoom)).abs() < EPSILON);
        assert!((original_lat - y_to_lat(y, zoom)).abs() < EPSILON);

        // New York City
        let original_lon = -74.0060;
        let original_lat = 40.7128;

        let x = lon_to_x(original_lon, zoom);
        let y = lat_to_y(original_lat, zoom);

        assert!((original_lon - x_to_lon(x, zoom)).abs() < EPSILON);
        assert!((original_lat - y_to_lat(y, zoom)).abs() < EPSILON);
    }

    #[test]
    fn y_to_lat_conversion() {
        // y, zoom, expected_lat
        let test_cases = vec![
            // Equator
            (0.5, 0, 0.0),
            (128.0, 8, 0.0),
            // Near poles (Mercator projection limits)
            (0.0, 0, 85.0511287798),
            (1.0, 0, -85.0511287798),
            (0.0, 8, 85.0511287798),
            (256.0, 8, -85.0511287798),
        ];

        for (y, zoom, expected_lat) in test_cases {
            assert!((y_to_lat(y, zoom) - expected_lat).abs() < EPSILON);
        }
    }

    #[test]
    fn lat_to_y_conversion() {
        // lat, zoom, expected_y
        let test_cases = vec![
            (0.0, 0, 0.5),
            (0.0, 8, 128.0),
            (85.0511287798, 0, 0.0),
            (-85.0511287798, 0, 1.0),
            (85.0511287798, 8, 0.0),
            (-85.0511287798, 8, 256.0),
        ];

        for (lat, zoom, expected_y) in test_cases {
            assert!((lat_to_y(lat, zoom) - expected_y).abs() < EPSILON);
        }
    }

    #[test]
    fn lon_to_x_conversion() {
        // lon, zoom, expected_x
        let test_cases = vec![
            (0.0, 0, 0.5),
            (0.0, 8, 128.0),
            (-180.0, 0, 0.0),
            (180.0, 0, 1.0), // upper bound is exclusive for tiles, but not for coordinate space
            (-180.0, 8, 0.0),
            (180.0, 8, 256.0),
        ];

        for (lon, zoom, expected_x) in test_cases {
            assert!((lon_to_x(lon, zoom) - expected_x).abs() < EPSILON);
        }
    }

    #[test]
    fn project_unproject_roundtrip() {
        let rect = Rect::from_min_size(pos2(0.0, 0.0), vec2(500.0, 500.0));
        let center = GeoPos::new(38.9072, -77.0369);
        let projection = MapProjection::new(8, center, rect);

        // The center of the widget maps to the center coordinate.
        let screen = projection.project(center);
        assert!((screen.x - 250.0).abs() < 1e-3);
        assert!((screen.y - 250.0).abs() < 1e-3);

        let back = projection.unproject(screen);
        assert!((back.lat - center.lat).abs() < 1e-6);
        assert!((back.lon - center.lon).abs() < 1e-6);
    }

    #[test]
    fn format_coord_rounds_to_four_decimals() {
        assert_eq!(format_coord(38.90718), "38.9072");
        assert_eq!(format_coord(-77.0369), "-77.0369");
        assert_eq!(format_coord(40.7128), "40.7128");
        assert_eq!(format_coord(0.0), "0.0000");
    }
}
