//! The selected-point marker and its shared default icon.

use egui::{Align2, Color32, Pos2, Rect, Sense, Ui, Vec2, pos2};
use log::error;
use poll_promise::Promise;
use std::sync::Arc;

use crate::projection::{GeoPos, MapProjection, format_coord};
use crate::tiles::spawn_image_download;

/// Static geometry and image sources for a marker icon.
///
/// Both map views render their marker from the same shared configuration, so
/// the icon can not silently diverge between them.
pub struct MarkerIconSpec {
    /// URL of the marker image.
    pub icon_url: &'static str,

    /// URL of the drop-shadow image drawn beneath the marker.
    pub shadow_url: &'static str,

    /// Pixel size of the marker image.
    pub icon_size: Vec2,

    /// The point of the marker image that is placed on the geographical
    /// position, relative to the image's top-left corner.
    pub icon_anchor: Vec2,

    /// The point from which the popup opens, relative to the icon anchor.
    pub popup_anchor: Vec2,

    /// The point from which a tooltip opens, relative to the icon anchor.
    pub tooltip_anchor: Vec2,

    /// Pixel size of the shadow image.
    pub shadow_size: Vec2,
}

/// The default marker icon, matching the classic blue Leaflet pin.
pub const DEFAULT_ICON: MarkerIconSpec = MarkerIconSpec {
    icon_url: "https://cdnjs.cloudflare.com/ajax/libs/leaflet/1.7.1/images/marker-icon.png",
    shadow_url: "https://cdnjs.cloudflare.com/ajax/libs/leaflet/1.7.1/images/marker-shadow.png",
    icon_size: Vec2::new(25.0, 41.0),
    icon_anchor: Vec2::new(12.0, 41.0),
    popup_anchor: Vec2::new(1.0, -34.0),
    tooltip_anchor: Vec2::new(16.0, -28.0),
    shadow_size: Vec2::new(41.0, 41.0),
};

impl MarkerIconSpec {
    /// The screen rectangle covered by the marker image when its anchor sits
    /// at `anchor_pos`.
    pub fn icon_rect(&self, anchor_pos: Pos2) -> Rect {
        Rect::from_min_size(anchor_pos - self.icon_anchor, self.icon_size)
    }

    /// The screen rectangle covered by the shadow image. The shadow shares the
    /// icon's anchor point.
    pub fn shadow_rect(&self, anchor_pos: Pos2) -> Rect {
        Rect::from_min_size(anchor_pos - self.icon_anchor, self.shadow_size)
    }

    /// The screen point from which the popup opens.
    pub fn popup_point(&self, anchor_pos: Pos2) -> Pos2 {
        anchor_pos + self.popup_anchor
    }
}

/// A remote image in one of three states, mirroring the tile cache.
enum IconImage {
    Loading(Promise<Result<egui::ColorImage, Arc<eyre::Report>>>),
    Loaded(egui::TextureHandle),
    Failed,
}

impl IconImage {
    fn fetch(url: &'static str) -> Self {
        Self::Loading(spawn_image_download(url.to_string()))
    }

    /// Polls the download and returns the texture once available.
    fn texture(&mut self, ctx: &egui::Context, name: &str) -> Option<&egui::TextureHandle> {
        if let Self::Loading(promise) = self {
            if let Some(result) = promise.ready() {
                match result {
                    Ok(color_image) => {
                        let texture =
                            ctx.load_texture(name.to_string(), color_image.clone(), Default::default());
                        *self = Self::Loaded(texture);
                    }
                    Err(e) => {
                        error!("{e:?}");
                        *self = Self::Failed;
                    }
                }
            }
        }

        match self {
            Self::Loaded(texture) => Some(texture),
            _ => None,
        }
    }
}

/// Lazily downloaded textures for the default marker icon and its shadow.
pub struct MarkerIcon {
    icon: IconImage,
    shadow: IconImage,
}

impl Default for MarkerIcon {
    fn default() -> Self {
        Self {
            icon: IconImage::fetch(DEFAULT_ICON.icon_url),
            shadow: IconImage::fetch(DEFAULT_ICON.shadow_url),
        }
    }
}

/// A single selected-point marker with a coordinate popup.
pub struct Marker {
    /// The geographical position of the marker.
    pub pos: GeoPos,

    /// Whether the coordinate popup is currently open.
    pub popup_open: bool,
}

impl Marker {
    /// Creates a marker at `pos` with its popup open.
    pub fn new(pos: GeoPos) -> Self {
        Self {
            pos,
            popup_open: true,
        }
    }

    /// Toggles the popup, as a click on the marker icon does.
    pub fn toggle_popup(&mut self) {
        self.popup_open = !self.popup_open;
    }

    /// The two formatted lines shown in the popup.
    pub fn popup_lines(&self) -> [String; 2] {
        [
            format!("Latitude: {}", format_coord(self.pos.lat)),
            format!("Longitude: {}", format_coord(self.pos.lon)),
        ]
    }

    /// Draws the marker and, when open, its popup.
    pub(crate) fn draw(
        &mut self,
        ui: &mut Ui,
        painter: &egui::Painter,
        projection: &MapProjection,
        icon: &mut MarkerIcon,
    ) {
        let anchor_pos = projection.project(self.pos);

        if let Some(texture) = icon.shadow.texture(ui.ctx(), "marker_shadow") {
            painter.image(
                texture.id(),
                DEFAULT_ICON.shadow_rect(anchor_pos),
                Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0)),
                Color32::WHITE,
            );
        }

        let icon_rect = DEFAULT_ICON.icon_rect(anchor_pos);
        match icon.icon.texture(ui.ctx(), "marker_icon") {
            Some(texture) => {
                painter.image(
                    texture.id(),
                    icon_rect,
                    Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0)),
                    Color32::WHITE,
                );
            }
            None => {
                // Pin placeholder until the image arrives.
                painter.circle_filled(anchor_pos, 5.0, Color32::from_rgb(40, 110, 220));
                ui.ctx().request_repaint();
            }
        }

        let response = ui.interact(icon_rect, ui.id().with("marker"), Sense::click());
        if response.clicked() {
            self.toggle_popup();
        }

        if self.popup_open {
            self.draw_popup(ui, anchor_pos);
        }
    }

    fn draw_popup(&self, ui: &mut Ui, anchor_pos: Pos2) {
        let popup_point = DEFAULT_ICON.popup_point(anchor_pos);
        let [lat_line, lon_line] = self.popup_lines();

        egui::Area::new(ui.id().with("marker_popup"))
            .fixed_pos(popup_point)
            .pivot(Align2::CENTER_BOTTOM)
            .show(ui.ctx(), |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.label(lat_line);
                    ui.label(lon_line);
                });
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_icon_geometry() {
        assert_eq!(DEFAULT_ICON.icon_size, Vec2::new(25.0, 41.0));
        assert_eq!(DEFAULT_ICON.icon_anchor, Vec2::new(12.0, 41.0));
        assert_eq!(DEFAULT_ICON.popup_anchor, Vec2::new(1.0, -34.0));
        assert_eq!(DEFAULT_ICON.tooltip_anchor, Vec2::new(16.0, -28.0));
        assert_eq!(DEFAULT_ICON.shadow_size, Vec2::new(41.0, 41.0));
    }

    #[test]
    fn icon_rect_places_anchor_on_position() {
        let rect = DEFAULT_ICON.icon_rect(pos2(100.0, 200.0));
        assert_eq!(rect.min, pos2(88.0, 159.0));
        assert_eq!(rect.size(), Vec2::new(25.0, 41.0));
        // The anchor point is the bottom tip of the pin.
        assert_eq!(rect.min + DEFAULT_ICON.icon_anchor, pos2(100.0, 200.0));
    }

    #[test]
    fn popup_opens_above_the_pin() {
        let point = DEFAULT_ICON.popup_point(pos2(100.0, 200.0));
        assert_eq!(point, pos2(101.0, 166.0));
    }

    #[test]
    fn marker_popup_lines_use_four_decimals() {
        let marker = Marker::new(GeoPos::new(38.90718, -77.0369));
        let [lat, lon] = marker.popup_lines();
        assert_eq!(lat, "Latitude: 38.9072");
        assert_eq!(lon, "Longitude: -77.0369");
    }

    #[test]
    fn marker_popup_toggles() {
        let mut marker = Marker::new(GeoPos::new(38.9072, -77.0369));
        assert!(marker.popup_open);
        marker.toggle_popup();
        assert!(!marker.popup_open);
        marker.toggle_popup();
        assert!(marker.popup_open);
    }
}
