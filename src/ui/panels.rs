use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::DatePickerButton;

use crate::map::MapMetric;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    let Some(loaded) = &state.loaded else {
        ui.label("No dataset loaded.");
        return;
    };
    let locations = loaded.locations.clone();
    let span = loaded.date_span;

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            date_range(ui, state, span);
            ui.separator();

            // ---- Location multi-select ----
            let n_selected = state.criteria.as_ref().map_or(0, |c| c.locations.len());
            egui::CollapsingHeader::new(
                RichText::new(format!("Countries  ({n_selected}/{})", locations.len())).strong(),
            )
            .id_salt("locations")
            .default_open(true)
            .show(ui, |ui: &mut Ui| {
                ui.horizontal(|ui: &mut Ui| {
                    if ui.small_button("All").clicked() {
                        state.select_all_locations();
                    }
                    if ui.small_button("None").clicked() {
                        state.select_no_locations();
                    }
                });
                ui.add(
                    egui::TextEdit::singleline(&mut state.location_search)
                        .hint_text("Search…"),
                );

                let needle = state.location_search.to_lowercase();
                ScrollArea::vertical()
                    .id_salt("location_list")
                    .max_height(260.0)
                    .show(ui, |ui: &mut Ui| {
                        for loc in &locations {
                            if !needle.is_empty() && !loc.to_lowercase().contains(&needle) {
                                continue;
                            }
                            let mut checked = state.is_selected(loc);
                            let text = RichText::new(loc).color(state.color_map.color_for(loc));
                            if ui.checkbox(&mut checked, text).changed() {
                                state.toggle_location(loc);
                            }
                        }
                    });
            });
            ui.separator();

            // ---- Optional views ----
            ui.checkbox(&mut state.show_comparison, "Comparison charts");
            ui.checkbox(&mut state.show_map, "Show map");
            if state.show_map {
                ui.indent("map_metric", |ui: &mut Ui| {
                    for metric in MapMetric::ALL {
                        ui.radio_value(&mut state.map_metric, metric, metric.title());
                    }
                });
            }
        });
}

fn date_range(ui: &mut Ui, state: &mut AppState, span: Option<(chrono::NaiveDate, chrono::NaiveDate)>) {
    ui.strong("Date range");
    let Some(criteria) = &state.criteria else {
        return;
    };
    if span.is_none() {
        ui.label(RichText::new("No parseable dates in this dataset.").color(Color32::YELLOW));
        return;
    }

    let (mut start, mut end) = (criteria.start, criteria.end);
    let mut changed = false;
    egui::Grid::new("date_range").num_columns(2).show(ui, |ui: &mut Ui| {
        ui.label("From");
        changed |= ui
            .add(DatePickerButton::new(&mut start).id_salt("date_start"))
            .changed();
        ui.end_row();
        ui.label("To");
        changed |= ui
            .add(DatePickerButton::new(&mut end).id_salt("date_end"))
            .changed();
        ui.end_row();
    });
    if let Some((lo, hi)) = span {
        if ui.small_button("Full range").clicked() {
            (start, end) = (lo, hi);
            changed = true;
        }
    }
    if changed {
        state.set_date_range(start, end);
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui.button("Fetch OWID data").clicked() {
                state.open_remote();
                ui.close_menu();
            }
            if ui
                .add_enabled(state.can_reload(), egui::Button::new("Reload"))
                .clicked()
            {
                state.reload();
                ui.close_menu();
            }
            ui.separator();
            let exportable = state.view.as_ref().is_some_and(|v| !v.is_empty());
            if ui
                .add_enabled(exportable, egui::Button::new("Export filtered CSV…"))
                .clicked()
            {
                export_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(loaded) = &state.loaded {
            let (visible, countries) = state
                .view
                .as_ref()
                .map_or((0, 0), |v| (v.len(), v.locations().len()));
            ui.label(format!(
                "{}: {} rows loaded, {visible} visible across {countries} countries",
                loaded.label,
                loaded.dataset.len(),
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::LIGHT_GREEN));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open OWID COVID-19 data")
        .add_filter("Supported files", &["csv", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        state.open_path(&path);
    }
}

pub fn export_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Export filtered data")
        .set_file_name(state.config.export_file_name.as_str())
        .add_filter("CSV", &["csv"])
        .save_file();

    if let Some(path) = file {
        if let Err(e) = state.export_view(&path) {
            log::error!("Export failed: {e}");
            state.status_message = Some(format!("Export failed: {e}"));
        }
    }
}
