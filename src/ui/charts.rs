use std::collections::BTreeSet;
use std::f32::consts::TAU;

use eframe::egui::{vec2, Color32, Sense, Shape, Stroke, Ui};
use egui_plot::{Bar, BarChart, GridMark, Legend, Line, Plot, PlotPoints};

use lube_dash::data::aggregate::Summary;
use lube_dash::data::model::Value;

use crate::color::ColorMap;

const CHART_HEIGHT: f32 = 280.0;

// ---------------------------------------------------------------------------
// Volume by destination, grouped by year
// ---------------------------------------------------------------------------

/// Grouped bars: one cluster per destination code, one bar per year.
pub fn destination_bar_chart(ui: &mut Ui, summary: &Summary) {
    ui.label("Volume por UF de destino e ano");

    let destinations: Vec<Value> = summary
        .destination_volumes
        .iter()
        .map(|d| d.destination.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let years: Vec<Value> = summary
        .destination_volumes
        .iter()
        .map(|d| d.year.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let colors = ColorMap::new(years.iter());

    let group_width = 0.8;
    let bar_width = group_width / years.len().max(1) as f64;

    let charts: Vec<BarChart> = years
        .iter()
        .enumerate()
        .map(|(slot, year)| {
            let offset = -group_width / 2.0 + bar_width * (slot as f64 + 0.5);
            let bars: Vec<Bar> = summary
                .destination_volumes
                .iter()
                .filter(|d| &d.year == year)
                .filter_map(|d| {
                    let x = destinations.binary_search(&d.destination).ok()? as f64;
                    Some(
                        Bar::new(x + offset, d.volume)
                            .width(bar_width)
                            .name(d.destination.display_label()),
                    )
                })
                .collect();
            BarChart::new(bars)
                .name(year.display_label())
                .color(colors.color_for(year))
        })
        .collect();

    Plot::new("destination_bars")
        .legend(Legend::default())
        .height(CHART_HEIGHT)
        .y_axis_label("Volume (L)")
        .allow_scroll(false)
        .allow_drag(false)
        .x_axis_formatter(move |mark: GridMark, _range| {
            let idx = mark.value.round();
            if (mark.value - idx).abs() > 1e-6 || idx < 0.0 {
                return String::new();
            }
            destinations
                .get(idx as usize)
                .map(Value::display_label)
                .unwrap_or_default()
        })
        .show(ui, |plot_ui| {
            for chart in charts {
                plot_ui.bar_chart(chart);
            }
        });
}

// ---------------------------------------------------------------------------
// Regional share pie
// ---------------------------------------------------------------------------

/// Pie of volume share per destination geographic region, with a legend.
pub fn regional_pie_chart(ui: &mut Ui, summary: &Summary) {
    ui.label("Participação por região de destino");

    let shares = &summary.regional_shares;
    let colors = ColorMap::new(shares.iter().map(|s| &s.region));

    ui.horizontal(|ui: &mut Ui| {
        let (response, painter) = ui.allocate_painter(vec2(CHART_HEIGHT, CHART_HEIGHT), Sense::hover());
        let center = response.rect.center();
        let radius = response.rect.width().min(response.rect.height()) / 2.0 - 8.0;

        let mut start = -TAU / 4.0;
        for share in shares {
            let sweep = share.share as f32 * TAU;
            if sweep <= 0.0 {
                continue;
            }
            // Split into thin wedges so every polygon stays convex.
            let steps = ((sweep / 0.05).ceil() as usize).max(1);
            let color = colors.color_for(&share.region);
            for step in 0..steps {
                let a0 = start + sweep * step as f32 / steps as f32;
                let a1 = start + sweep * (step + 1) as f32 / steps as f32;
                let points = vec![
                    center,
                    center + radius * vec2(a0.cos(), a0.sin()),
                    center + radius * vec2(a1.cos(), a1.sin()),
                ];
                painter.add(Shape::convex_polygon(points, color, Stroke::NONE));
            }
            start += sweep;
        }
        painter.circle_stroke(center, radius, Stroke::new(1.0, Color32::DARK_GRAY));

        ui.vertical(|ui: &mut Ui| {
            for share in shares {
                ui.horizontal(|ui: &mut Ui| {
                    let (rect, _) = ui.allocate_exact_size(vec2(12.0, 12.0), Sense::hover());
                    ui.painter()
                        .rect_filled(rect, 2.0, colors.color_for(&share.region));
                    ui.label(format!(
                        "{}: {:.1}%",
                        share.region.display_label(),
                        share.share * 100.0
                    ));
                });
            }
        });
    });
}

// ---------------------------------------------------------------------------
// Monthly series, one line per year
// ---------------------------------------------------------------------------

pub fn time_series_chart(ui: &mut Ui, summary: &Summary) {
    ui.label("Evolução mensal do volume");

    let series = &summary.time_series;
    let years: BTreeSet<&Value> = series.iter().map(|p| &p.year).collect();
    let colors = ColorMap::new(years.iter().copied());

    // Unrecognised month labels go after December, in sorted order.
    let unknown: Vec<&Value> = series
        .iter()
        .map(|p| &p.month)
        .filter(|m| m.month_number().is_none())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let month_x = |month: &Value| -> f64 {
        match month.month_number() {
            Some(m) => m as f64,
            None => unknown.binary_search(&month).map_or(0.0, |i| 13.0 + i as f64),
        }
    };

    let lines: Vec<Line> = years
        .iter()
        .map(|&year| {
            let points: PlotPoints = series
                .iter()
                .filter(|p| &p.year == year)
                .map(|p| [month_x(&p.month), p.volume])
                .collect();
            Line::new(points)
                .name(year.display_label())
                .color(colors.color_for(year))
                .width(2.0)
        })
        .collect();

    Plot::new("monthly_series")
        .legend(Legend::default())
        .height(CHART_HEIGHT)
        .x_axis_label("Mês")
        .y_axis_label("Volume (L)")
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            for line in lines {
                plot_ui.line(line);
            }
        });
}
