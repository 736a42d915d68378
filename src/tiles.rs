//! Tile cache and download machinery.

use egui::{Color32, Rect, Sense, Ui, Vec2, pos2};
use eyre::{Context, Result};
use log::{debug, error};
use once_cell::sync::Lazy;
use poll_promise::Promise;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::MapConfig;
use crate::{MapError, TILE_SIZE};

// Reuse the reqwest client for all downloads by making it a static variable.
pub(crate) static CLIENT: Lazy<reqwest::blocking::Client> = Lazy::new(|| {
    reqwest::blocking::Client::builder()
        .user_agent(format!(
            "{}/{}",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        ))
        .build()
        .expect("Failed to build reqwest client")
});

/// A unique identifier for a map tile.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct TileId {
    /// The zoom level.
    pub z: u8,

    /// The x-coordinate of the tile.
    pub x: u32,

    /// The y-coordinate of the tile.
    pub y: u32,
}

/// The state of a tile in the cache.
pub(crate) enum Tile {
    /// The tile is being downloaded.
    Loading(Promise<Result<egui::ColorImage, Arc<eyre::Report>>>),

    /// The tile is in memory.
    Loaded(egui::TextureHandle),

    /// The tile failed to download.
    Failed(Arc<eyre::Report>),
}

/// Decodes downloaded image bytes into an `egui::ColorImage`.
pub(crate) fn decode_image(bytes: &[u8]) -> Result<egui::ColorImage, MapError> {
    let image = image::load_from_memory(bytes)?.to_rgba8();
    let size = [image.width() as _, image.height() as _];
    let pixels = image.into_raw();
    Ok(egui::ColorImage::from_rgba_unmultiplied(size, &pixels))
}

/// Downloads an image from `url` and decodes it. Runs on a worker thread via
/// [`spawn_image_download`].
fn download_image(url: &str) -> Result<egui::ColorImage, MapError> {
    debug!("Downloading image from {url}");
    let response = CLIENT.get(url).send()?;

    if !response.status().is_success() {
        return Err(MapError::DownloadError(response.status().to_string()));
    }

    let bytes = response.bytes()?.to_vec();
    decode_image(&bytes)
}

/// Spawns a one-shot download of an image on a background thread.
pub(crate) fn spawn_image_download(
    url: String,
) -> Promise<Result<egui::ColorImage, Arc<eyre::Report>>> {
    Promise::spawn_thread("download_image", move || {
        download_image(&url)
            .map_err(eyre::Report::from)
            .with_context(|| format!("Failed to download image from {url}"))
            .map_err(Arc::new)
    })
}

/// Ensures `tile_id` is present in the cache, spawning a download if needed,
/// and promotes finished downloads to textures.
pub(crate) fn load_tile(
    tiles: &mut HashMap<TileId, Tile>,
    config: &dyn MapConfig,
    ctx: &egui::Context,
    tile_id: TileId,
) {
    let tile_state = tiles
        .entry(tile_id)
        .or_insert_with(|| Tile::Loading(spawn_image_download(config.tile_url(&tile_id))));

    // Promote a finished download before drawing, so a tile that has just
    // arrived is shown in the same frame.
    if let Tile::Loading(promise) = tile_state {
        if let Some(result) = promise.ready() {
            match result {
                Ok(color_image) => {
                    let texture = ctx.load_texture(
                        format!("tile_{}_{}_{}", tile_id.z, tile_id.x, tile_id.y),
                        color_image.clone(),
                        Default::default(),
                    );
                    *tile_state = Tile::Loaded(texture);
                }
                Err(e) => {
                    error!("{e:?}");
                    *tile_state = Tile::Failed(e.clone());
                }
            }
        }
    }
}

/// Draws a single map tile from the cache at `tile_pos`.
pub(crate) fn draw_tile(
    tiles: &HashMap<TileId, Tile>,
    ui: &mut Ui,
    painter: &egui::Painter,
    tile_id: TileId,
    tile_pos: egui::Pos2,
) {
    let Some(tile_state) = tiles.get(&tile_id) else {
        return;
    };

    let tile_rect = Rect::from_min_size(tile_pos, Vec2::new(TILE_SIZE as f32, TILE_SIZE as f32));

    match tile_state {
        Tile::Loading(_) => {
            // Draw a gray background and a border for the placeholder.
            painter.rect_filled(tile_rect, 0.0, Color32::from_gray(220));
            painter.rect_stroke(
                tile_rect,
                0.0,
                egui::Stroke::new(1.0, Color32::GRAY),
                egui::StrokeKind::Inside,
            );

            // The tile is still loading, so we need to tell egui to repaint.
            ui.ctx().request_repaint();
        }
        Tile::Loaded(texture) => {
            painter.image(
                texture.id(),
                tile_rect,
                Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0)),
                Color32::WHITE,
            );
        }
        Tile::Failed(e) => {
            // Draw a gray background and a border for the placeholder.
            painter.rect_filled(tile_rect, 0.0, Color32::from_gray(220));
            painter.rect_stroke(
                tile_rect,
                0.0,
                egui::Stroke::new(1.0, Color32::GRAY),
                egui::StrokeKind::Inside,
            );

            // Draw a red exclamation mark in the center.
            painter.text(
                tile_rect.center(),
                egui::Align2::CENTER_CENTER,
                "!",
                egui::FontId::proportional(40.0),
                Color32::RED,
            );

            let response = ui.interact(tile_rect, ui.id().with(tile_id), Sense::hover());
            response.on_hover_text(format!("{e}"));
        }
    }
}
