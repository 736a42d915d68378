//! The application container: selection state, summary panel, detail view.

use eframe::egui;

use crate::picker::{DetailMap, PrimaryMap};
use crate::projection::{GeoPos, format_coord};

/// The notice shown when sharing is requested without a selection.
pub const NO_LOCATION_NOTICE: &str = "No location is available.";

/// Height of the detail map panel in points.
const DETAIL_PANEL_HEIGHT: f32 = 300.0;
/// Width of the summary side panel in points.
const SUMMARY_PANEL_WIDTH: f32 = 220.0;

/// The location picker application.
///
/// Owns the selected coordinate and the detail view. The detail view is
/// mounted by the "Share Location" button and, once shown, stays shown for
/// the rest of the session.
#[derive(Default)]
pub struct PickerApp {
    primary: PrimaryMap,
    selection: Option<GeoPos>,
    detail: Option<DetailMap>,
    notice: Option<String>,
}

impl PickerApp {
    /// Stores a newly adopted coordinate from the primary map.
    fn handle_location_change(&mut self, pos: GeoPos) {
        self.selection = Some(pos);
    }

    /// Reveals the detail view for the current selection, or raises a notice
    /// when nothing is selected. Pressing again while the detail view is
    /// already shown changes nothing; its center is read once at mount.
    fn share_location(&mut self) {
        match self.selection {
            Some(pos) => {
                if self.detail.is_none() {
                    self.detail = Some(DetailMap::new(pos));
                }
            }
            None => {
                self.notice = Some(NO_LOCATION_NOTICE.to_string());
            }
        }
    }

    /// Whether the detail view is currently shown.
    pub fn detail_shown(&self) -> bool {
        self.detail.is_some()
    }

    /// The lines shown in the summary panel for the current selection.
    fn summary_lines(&self) -> Vec<String> {
        match self.selection {
            Some(pos) => vec![
                format!("Latitude: {}", format_coord(pos.lat)),
                format!("Longitude: {}", format_coord(pos.lon)),
            ],
            None => vec!["No location selected".to_string()],
        }
    }

    fn show_summary_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Selected Location");
        ui.separator();

        for line in self.summary_lines() {
            ui.label(line);
        }

        ui.add_space(8.0);
        if ui.button("Share Location").clicked() {
            self.share_location();
        }
    }

    fn show_notice(&mut self, ctx: &egui::Context) {
        let Some(message) = self.notice.clone() else {
            return;
        };

        let modal = egui::Modal::new(egui::Id::new("share_notice")).show(ctx, |ui| {
            ui.label(message);
            ui.add_space(8.0);
            if ui.button("OK").clicked() {
                self.notice = None;
            }
        });

        if modal.should_close() {
            self.notice = None;
        }
    }
}

impl eframe::App for PickerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::SidePanel::right("summary")
            .resizable(false)
            .exact_width(SUMMARY_PANEL_WIDTH)
            .show(ctx, |ui| {
                self.show_summary_panel(ui);
            });

        if self.detail.is_some() {
            egui::TopBottomPanel::bottom("detail")
                .resizable(false)
                .exact_height(DETAIL_PANEL_HEIGHT)
                .frame(egui::Frame::NONE)
                .show(ctx, |ui| {
                    if let Some(detail) = &mut self.detail {
                        detail.show(ui);
                    }
                });
        }

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                if let Some(adopted) = self.primary.show(ui) {
                    self.handle_location_change(adopted);
                }
            });

        self.show_notice(ctx);
    }
}
