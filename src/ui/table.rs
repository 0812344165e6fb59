use eframe::egui::Ui;
use egui_extras::{Column as TableColumn, TableBuilder};

use crate::data::model::{Column, FilteredView, Record};

fn cell_text(record: &Record, column: Column) -> String {
    let num = |v: Option<f64>| v.map(|v| format!("{v:.2}")).unwrap_or_default();
    match column {
        Column::Date => record.date.map(|d| d.to_string()).unwrap_or_default(),
        Column::Location => record.location.clone().unwrap_or_default(),
        Column::NewDeathsSmoothed => num(record.new_deaths_smoothed),
        Column::PeopleVaccinatedPerHundred => num(record.people_vaccinated_per_hundred),
    }
}

/// First `limit` rows of the view.
pub fn filtered_table(ui: &mut Ui, view: &FilteredView, limit: usize) {
    let rows: Vec<&Record> = view.records().take(limit).collect();

    ui.push_id("filtered_table", |ui: &mut Ui| {
        TableBuilder::new(ui)
            .striped(true)
            .max_scroll_height(320.0)
            .column(TableColumn::initial(100.0))
            .column(TableColumn::initial(180.0).resizable(true))
            .columns(TableColumn::remainder(), 2)
            .header(20.0, |mut header| {
                for col in Column::ALL {
                    header.col(|ui: &mut Ui| {
                        ui.strong(col.name());
                    });
                }
            })
            .body(|body| {
                body.rows(18.0, rows.len(), |mut row| {
                    let record = rows[row.index()];
                    for col in Column::ALL {
                        row.col(|ui: &mut Ui| {
                            ui.label(cell_text(record, col));
                        });
                    }
                });
            });
    });
}
