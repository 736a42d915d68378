//! Configuration for map tile providers and the picker's named defaults.

use crate::projection::GeoPos;
use crate::tiles::TileId;

/// The default geographical center of the primary map: Washington D.C.
pub const DEFAULT_CENTER: GeoPos = GeoPos {
    lat: 38.9072,
    lon: -77.0369,
};

/// The default zoom level of the primary map.
pub const DEFAULT_ZOOM: u8 = 8;

/// The zoom level of the detail map shown for a selected location.
pub const DETAIL_ZOOM: u8 = 14;

/// Configuration for a map provider.
pub trait MapConfig {
    /// Returns the URL for a given tile.
    fn tile_url(&self, tile: &TileId) -> String;

    /// Returns the attribution text to be displayed on the map. If returns `None`, no attribution is shown.
    fn attribution(&self) -> Option<&String>;

    /// Returns the attribution URL to be linked from the attribution text.
    fn attribution_url(&self) -> Option<&String>;

    /// The default geographical center of the map.
    fn default_center(&self) -> GeoPos;

    /// The default zoom level of the map.
    fn default_zoom(&self) -> u8;
}

/// Configuration for the OpenStreetMap tile servers.
///
/// Tile requests are spread over the `a`, `b` and `c` subdomains the same way
/// slippy map clients conventionally do.
///
/// # Example
///
/// ```
/// use egui_location_picker::config::OpenStreetMapConfig;
/// let config = OpenStreetMapConfig::default();
/// ```
pub struct OpenStreetMapConfig {
    subdomains: Vec<String>,
    attribution: String,
    attribution_url: String,
    default_center: GeoPos,
    default_zoom: u8,
}

impl Default for OpenStreetMapConfig {
    fn default() -> Self {
        Self {
            subdomains: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            attribution: "© OpenStreetMap contributors".to_string(),
            attribution_url: "https://www.openstreetmap.org/copyright".to_string(),
            default_center: DEFAULT_CENTER,
            default_zoom: DEFAULT_ZOOM,
        }
    }
}

impl OpenStreetMapConfig {
    /// Creates a config with the given center and zoom, keeping the standard
    /// tile servers and attribution.
    pub fn centered_at(center: GeoPos, zoom: u8) -> Self {
        Self {
            default_center: center,
            default_zoom: zoom,
            ..Self::default()
        }
    }
}

impl MapConfig for OpenStreetMapConfig {
    fn tile_url(&self, tile: &TileId) -> String {
        // Deterministic subdomain choice so a tile is always fetched from (and
        // cached by) the same server.
        let server = &self.subdomains[(tile.x + tile.y) as usize % self.subdomains.len()];
        format!(
            "https://{}.tile.openstreetmap.org/{}/{}/{}.png",
            server, tile.z, tile.x, tile.y
        )
    }

    fn attribution(&self) -> Option<&String> {
        Some(&self.attribution)
    }

    fn attribution_url(&self) -> Option<&String> {
        Some(&self.attribution_url)
    }

    fn default_center(&self) -> GeoPos {
        self.default_center
    }

    fn default_zoom(&self) -> u8 {
        self.default_zoom
    }
}
