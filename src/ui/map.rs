use eframe::egui::{self, Color32, RichText, Stroke, Ui};
use egui_plot::{Plot, PlotPoints, Polygon};

use crate::color::{Ramp, GREEN_BLUES, NO_DATA, REDS};
use crate::data::model::FilteredView;
use crate::map::{join, MapMetric};
use crate::state::AppState;

fn ramp_for(metric: MapMetric) -> Ramp {
    match metric {
        MapMetric::DeathsIntensity => REDS,
        MapMetric::VaccinationProgress => GREEN_BLUES,
    }
}

/// Choropleth of the current metric. Map failures stay inside this panel.
pub fn choropleth(ui: &mut Ui, state: &mut AppState, view: &FilteredView) {
    let metric = state.map_metric;
    ui.heading(format!("Global COVID-19 Map: {}", metric.title()));

    if let Some(err) = &state.map_error {
        ui.label(RichText::new(format!("Map unavailable: {err}")).color(Color32::RED));
        if ui.button("Retry").clicked() {
            state.retry_map();
        }
        return;
    }
    let Some(world) = &state.world else {
        ui.spinner();
        return;
    };

    let values = metric.compute(view);
    let layer = join(world, &values);
    let ramp = ramp_for(metric);
    let (lo, hi) = layer.range.unwrap_or((0.0, 0.0));

    let response = Plot::new("choropleth")
        .height(420.0)
        .data_aspect(1.0)
        .show_axes(false)
        .show_grid(false)
        .allow_scroll(false)
        .include_x(-180.0)
        .include_x(180.0)
        .include_y(-60.0)
        .include_y(85.0)
        .label_formatter(|_, _| String::new())
        .show(ui, |plot_ui| {
            for region in &layer.regions {
                let fill = match region.value {
                    Some(v) => ramp.shade(v, lo, hi),
                    None => NO_DATA,
                };
                for ring in region.shape.rings() {
                    let polygon = Polygon::new(PlotPoints::from(ring))
                        .fill_color(fill.gamma_multiply(0.85))
                        .stroke(Stroke::new(0.4, Color32::DARK_GRAY));
                    plot_ui.polygon(polygon);
                }
            }
            plot_ui.pointer_coordinate()
        });

    if let Some(p) = response.inner {
        let hovered = layer.regions.iter().find(|r| r.shape.contains(p.x, p.y));
        if let Some(region) = hovered {
            let value = region
                .value
                .map(|v| format!("{v:.2}"))
                .unwrap_or_else(|| "no data".to_string());
            response
                .response
                .on_hover_text(format!("{}: {value}", region.shape.name));
        }
    }

    ui.horizontal(|ui: &mut Ui| {
        ui.label(metric.legend());
        ui.label(format!("{lo:.1}"));
        let (rect, _) = ui.allocate_exact_size(egui::vec2(160.0, 12.0), egui::Sense::hover());
        let steps = 32;
        for i in 0..steps {
            let t = i as f64 / (steps - 1) as f64;
            let w = rect.width() / steps as f32;
            let cell = egui::Rect::from_min_size(
                egui::pos2(rect.left() + i as f32 * w, rect.top()),
                egui::vec2(w + 0.5, rect.height()),
            );
            ui.painter().rect_filled(cell, 0.0, ramp.at(t));
        }
        ui.label(format!("{hi:.1}"));
    });

    if !layer.unmatched.is_empty() {
        ui.label(
            RichText::new(format!(
                "Not on the map: {}",
                layer.unmatched.join(", ")
            ))
            .weak(),
        );
    }
}
