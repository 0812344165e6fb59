use eframe::egui::{self, Color32, RichText, ScrollArea};

use crate::data::model::ValueColumn;
use crate::state::{AppState, ViewStatus};
use crate::ui::{charts, map, panels, table};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct DashboardApp {
    pub state: AppState,
    /// Fetch the remote dataset on the first frame (set from config).
    autoload_pending: bool,
}

impl DashboardApp {
    pub fn new(state: AppState) -> Self {
        let autoload_pending = state.config.autoload_remote;
        Self {
            state,
            autoload_pending,
        }
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if std::mem::take(&mut self.autoload_pending) {
            self.state.open_remote();
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

        // ---- Central panel: table + charts ----
        egui::CentralPanel::default().show(ctx, |ui| {
            ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| dashboard(ui, &mut self.state));
        });
    }
}

fn dashboard(ui: &mut egui::Ui, state: &mut AppState) {
    ui.heading("COVID-19 Deaths and Vaccinations");

    let view = match state.status() {
        ViewStatus::LoadFailed(err) => {
            ui.label(RichText::new(err).color(Color32::RED));
            return;
        }
        ViewStatus::NoData => {
            ui.label("Open a CSV or Parquet file, or fetch the OWID dataset from the File menu.");
            return;
        }
        ViewStatus::Empty => {
            ui.label(RichText::new("No rows match your filters.").color(Color32::YELLOW));
            return;
        }
        ViewStatus::Ready(view) => view.clone(),
    };

    ui.label(RichText::new("Filtered data").strong());
    table::filtered_table(ui, &view, state.config.table_row_limit);
    ui.separator();

    ui.label(RichText::new("Daily new deaths (smoothed)").strong());
    charts::time_series(
        ui,
        "deaths_over_time",
        &view,
        ValueColumn::NewDeathsSmoothed,
        &state.color_map,
    );
    ui.separator();

    ui.label(RichText::new("People vaccinated per hundred").strong());
    charts::time_series(
        ui,
        "vaccinations_over_time",
        &view,
        ValueColumn::PeopleVaccinatedPerHundred,
        &state.color_map,
    );

    if state.show_comparison {
        ui.separator();
        ui.heading("Comparison");
        ui.label(RichText::new("Deaths vs vaccinations").strong());
        charts::scatter(ui, &view, &state.color_map);
        ui.label(RichText::new("Cumulative deaths by country").strong());
        charts::cumulative_deaths(ui, &view, &state.color_map);
        ui.label(RichText::new("Daily deaths heatmap").strong());
        charts::heatmap(ui, &view);
    }

    if state.show_map {
        ui.separator();
        state.ensure_world();
        map::choropleth(ui, state, &view);
    }
}
