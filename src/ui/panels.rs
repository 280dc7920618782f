use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::{Column, TableBuilder};

use lube_dash::data::model::{Dimension, Value};

use super::{charts, Status, UiState};

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel. An empty selection means "all values".
pub fn side_panel(ui: &mut Ui, state: &mut UiState) {
    ui.heading("Filtros");
    ui.separator();

    if state.session.table().is_none() {
        ui.label("Nenhum arquivo carregado.");
        return;
    }

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for dim in Dimension::ALL {
                let mut values: Vec<Value> = state.session.available_values(dim).into_iter().collect();
                if dim == Dimension::Month {
                    values.sort_by(|a, b| a.month_key().cmp(&b.month_key()));
                }
                let n_selected = state
                    .session
                    .criteria()
                    .selected(dim)
                    .map_or(0, |s| s.len());
                let header_text = if n_selected == 0 {
                    format!("{}  (todos)", dim.label())
                } else {
                    format!("{}  ({n_selected}/{})", dim.label(), values.len())
                };

                egui::CollapsingHeader::new(RichText::new(header_text).strong())
                    .id_salt(dim.header())
                    .default_open(dim == Dimension::Year)
                    .show(ui, |ui: &mut Ui| {
                        if ui.small_button("Limpar").clicked() {
                            state.session.clear_dimension(dim);
                        }
                        for value in &values {
                            let mut checked = state.session.criteria().is_selected(dim, value);
                            if ui.checkbox(&mut checked, value.display_label()).changed() {
                                state.session.toggle_filter_value(dim, value);
                            }
                        }
                    });
            }
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut UiState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("Arquivo", |ui: &mut Ui| {
            if ui.button("Abrir arquivo .zip…").clicked() {
                open_archive_dialog(state);
                ui.close_menu();
            }
            let can_export = state.session.table().is_some();
            if ui
                .add_enabled(can_export, egui::Button::new("Exportar dados filtrados…"))
                .clicked()
            {
                export_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(progress) = state.session.upload_progress() {
            ui.label("Extraindo…");
            ui.add(
                egui::ProgressBar::new(progress as f32)
                    .show_percentage()
                    .desired_width(160.0),
            );
        } else if let Some(table) = state.session.table() {
            ui.label(format!(
                "{} linhas carregadas, {} visíveis",
                table.len(),
                state.session.visible_rows().len()
            ));
        }

        ui.separator();
        ui.hyperlink_to("Base de dados ANP", &state.session.config.dataset_url);

        match &state.status {
            Some(Status::Info(msg)) => {
                ui.label(RichText::new(msg).color(Color32::LIGHT_GREEN));
            }
            Some(Status::Error(msg)) => {
                ui.label(RichText::new(msg).color(Color32::RED));
            }
            None => {}
        }
    });
}

// ---------------------------------------------------------------------------
// Central panel – indicators, charts, rows
// ---------------------------------------------------------------------------

pub fn dashboard(ui: &mut Ui, state: &mut UiState) {
    if state.session.table().is_none() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Abra um arquivo .zip com os dados (Arquivo → Abrir…)");
        });
        return;
    }

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            ui.heading("Painel Dinâmico - Vendas de Produtos Lubrificantes (ANP)");
            ui.add_space(8.0);

            match state.session.summary() {
                Some(summary) => {
                    ui.strong("Indicadores");
                    indicator_strip(ui, summary);
                    ui.add_space(12.0);
                    ui.strong("Gráficos de Análise");
                    charts::destination_bar_chart(ui, summary);
                    charts::regional_pie_chart(ui, summary);
                    charts::time_series_chart(ui, summary);
                }
                None => {
                    ui.colored_label(
                        Color32::YELLOW,
                        "Nenhum dado encontrado para os filtros selecionados.",
                    );
                }
            }

            ui.add_space(12.0);
            ui.strong("Dados Filtrados");
            rows_table(ui, state);

            if ui.button("Exportar Dados Filtrados").clicked() {
                export_dialog(state);
            }
        });
}

fn indicator_strip(ui: &mut Ui, summary: &lube_dash::data::aggregate::Summary) {
    let indicators = &summary.indicators;
    ui.horizontal(|ui: &mut Ui| {
        ui.group(|ui: &mut Ui| {
            ui.vertical(|ui: &mut Ui| {
                ui.label("Volume Total");
                ui.heading(format!("{} litros", format_thousands(indicators.total_volume)));
            });
        });
        ui.group(|ui: &mut Ui| {
            ui.vertical(|ui: &mut Ui| {
                ui.label("Produto Mais Vendido");
                let label = indicators
                    .top_product
                    .as_ref()
                    .map(|t| t.label.display_label())
                    .unwrap_or_else(|| "-".to_string());
                ui.heading(label);
            });
        });
    });
}

/// Virtualised grid of the visible rows, in source column order.
fn rows_table(ui: &mut Ui, state: &UiState) {
    let Some(view) = state.session.view() else {
        return;
    };
    let table = view.table();
    let rows = view.rows();
    let n_cols = table.headers().len();

    ui.push_id("filtered_rows", |ui: &mut Ui| {
        TableBuilder::new(ui)
            .striped(true)
            .resizable(true)
            .max_scroll_height(320.0)
            .columns(Column::auto().at_least(60.0), n_cols)
            .header(20.0, |mut header| {
                for name in table.headers() {
                    header.col(|ui: &mut Ui| {
                        ui.strong(name);
                    });
                }
            })
            .body(|body| {
                body.rows(18.0, rows.len(), |mut row| {
                    let r = rows[row.index()];
                    for col in 0..n_cols {
                        row.col(|ui: &mut Ui| {
                            ui.label(table.cell_text(r, col));
                        });
                    }
                });
            });
    });
}

/// `1234567.891` → `1,234,567.89`
pub fn format_thousands(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((&fixed, "00"));
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{sign}{grouped}.{frac_part}")
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_archive_dialog(state: &mut UiState) {
    let file = rfd::FileDialog::new()
        .set_title("Abrir dados de lubrificantes")
        .add_filter("Arquivo zip", &["zip"])
        .pick_file();

    if let Some(path) = file {
        match state.session.begin_upload(&path) {
            Ok(()) => {
                state.status = Some(Status::Info(format!("Extraindo {}…", path.display())));
            }
            Err(e) => {
                log::error!("Failed to open archive: {e}");
                state.status = Some(Status::Error(format!("Erro: {e}")));
            }
        }
    }
}

pub fn export_dialog(state: &mut UiState) {
    let file = rfd::FileDialog::new()
        .set_title("Exportar dados filtrados")
        .set_file_name(state.session.config.export_file_name.clone())
        .add_filter("CSV", &["csv"])
        .save_file();

    if let Some(path) = file {
        match state.session.export_to_path(&path) {
            Ok(path) => {
                log::info!("Exported filtered rows to {}", path.display());
                state.status = Some(Status::Info("Dados exportados com sucesso!".to_string()));
            }
            Err(e) => {
                log::error!("Export failed: {e}");
                state.status = Some(Status::Error(format!("Erro: {e}")));
            }
        }
    }
}
