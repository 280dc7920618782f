use eframe::egui;

use lube_dash::{DashboardConfig, Session};

use crate::ui::{panels, UiState};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct LubeDashApp {
    pub state: UiState,
}

impl LubeDashApp {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            state: UiState::new(Session::new(config)),
        }
    }
}

impl eframe::App for LubeDashApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // One archive entry per frame keeps the progress bar moving.
        if self.state.drive_upload() {
            ctx.request_repaint();
        }

        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: filters ----
        egui::SidePanel::left("filter_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: indicators, charts, rows ----
        egui::CentralPanel::default().show(ctx, |ui| {
            panels::dashboard(ui, &mut self.state);
        });
    }
}
