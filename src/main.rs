mod app;
mod color;
mod ui;

use app::LubeDashApp;
use eframe::egui;
use lube_dash::DashboardConfig;

fn main() -> eframe::Result {
    env_logger::init();

    let config = DashboardConfig::load().unwrap_or_else(|e| {
        log::error!("Invalid configuration, using defaults: {e}");
        DashboardConfig::default()
    });

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 860.0])
            .with_min_inner_size([720.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Painel Dinâmico – Vendas de Produtos Lubrificantes (ANP)",
        options,
        Box::new(|_cc| Ok(Box::new(LubeDashApp::new(config)))),
    )
}
