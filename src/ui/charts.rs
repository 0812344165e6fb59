use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use eframe::egui::{self, Align2, Color32, FontId, Sense, Stroke, Ui};
use egui_plot::{Bar, BarChart, Legend, Line, Plot, PlotPoints, Points};

use crate::color::{ColorMap, REDS};
use crate::data::aggregate::{aggregate, sorted_descending, Reducer};
use crate::data::model::{FilteredView, ValueColumn};

// ---------------------------------------------------------------------------
// Chart data: pure transforms of the filtered view
// ---------------------------------------------------------------------------

/// One line per location, points ordered by date, nulls skipped.
/// x is the date as days since the common era.
pub fn series_by_location(view: &FilteredView, column: ValueColumn) -> Vec<(String, Vec<[f64; 2]>)> {
    let mut series: BTreeMap<&str, Vec<(NaiveDate, f64)>> = BTreeMap::new();
    for r in view.records() {
        let (Some(loc), Some(date), Some(v)) = (r.location.as_deref(), r.date, column.get(r)) else {
            continue;
        };
        series.entry(loc).or_default().push((date, v));
    }
    series
        .into_iter()
        .map(|(loc, mut pts)| {
            pts.sort_by_key(|(d, _)| *d);
            let pts = pts.into_iter().map(|(d, v)| [date_to_x(d), v]).collect();
            (loc.to_string(), pts)
        })
        .collect()
}

/// Vaccinated-per-hundred (x) against new deaths (y), grouped by location.
pub fn scatter_by_location(view: &FilteredView) -> Vec<(String, Vec<[f64; 2]>)> {
    let mut groups: BTreeMap<&str, Vec<[f64; 2]>> = BTreeMap::new();
    for r in view.records() {
        let (Some(loc), Some(vax), Some(deaths)) = (
            r.location.as_deref(),
            r.people_vaccinated_per_hundred,
            r.new_deaths_smoothed,
        ) else {
            continue;
        };
        groups.entry(loc).or_default().push([vax, deaths]);
    }
    groups
        .into_iter()
        .map(|(loc, pts)| (loc.to_string(), pts))
        .collect()
}

/// Location × date grid of a value column; duplicate cells are averaged.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapGrid {
    pub locations: Vec<String>,
    pub dates: Vec<NaiveDate>,
    /// `cells[row][col]` for `locations[row]`, `dates[col]`.
    pub cells: Vec<Vec<Option<f64>>>,
    pub max: Option<f64>,
}

pub fn heatmap_grid(view: &FilteredView, column: ValueColumn) -> HeatmapGrid {
    let mut sums: BTreeMap<(&str, NaiveDate), (f64, usize)> = BTreeMap::new();
    for r in view.records() {
        let (Some(loc), Some(date), Some(v)) = (r.location.as_deref(), r.date, column.get(r)) else {
            continue;
        };
        let cell = sums.entry((loc, date)).or_insert((0.0, 0));
        cell.0 += v;
        cell.1 += 1;
    }

    let mut locations: Vec<String> = sums.keys().map(|(l, _)| l.to_string()).collect();
    locations.dedup();
    let mut dates: Vec<NaiveDate> = sums.keys().map(|(_, d)| *d).collect();
    dates.sort_unstable();
    dates.dedup();

    let mut cells = vec![vec![None; dates.len()]; locations.len()];
    let mut max: Option<f64> = None;
    for ((loc, date), (sum, n)) in sums {
        let (Ok(row), Ok(col)) = (
            locations.binary_search_by(|l| l.as_str().cmp(loc)),
            dates.binary_search(&date),
        ) else {
            continue;
        };
        let mean = sum / n as f64;
        cells[row][col] = Some(mean);
        max = Some(max.map_or(mean, |m| m.max(mean)));
    }

    HeatmapGrid {
        locations,
        dates,
        cells,
        max,
    }
}

pub fn date_to_x(date: NaiveDate) -> f64 {
    date.num_days_from_ce() as f64
}

pub fn x_to_date(x: f64) -> Option<NaiveDate> {
    if !x.is_finite() {
        return None;
    }
    NaiveDate::from_num_days_from_ce_opt(x.round() as i32)
}

fn date_axis_label(x: f64) -> String {
    x_to_date(x)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Chart widgets
// ---------------------------------------------------------------------------

const CHART_HEIGHT: f32 = 280.0;

/// Line chart of `column` over time, one line per location.
pub fn time_series(ui: &mut Ui, id: &str, view: &FilteredView, column: ValueColumn, colors: &ColorMap) {
    let series = series_by_location(view, column);
    Plot::new(id)
        .legend(Legend::default())
        .height(CHART_HEIGHT)
        .x_axis_label("Date")
        .y_axis_label(column.label())
        .x_axis_formatter(|mark, _range| date_axis_label(mark.value))
        .label_formatter(|name, value| {
            format!("{name}\n{}\n{:.2}", date_axis_label(value.x), value.y)
        })
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(false)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            for (loc, pts) in series {
                let line = Line::new(PlotPoints::from(pts))
                    .name(&loc)
                    .color(colors.color_for(&loc))
                    .width(1.5);
                plot_ui.line(line);
            }
        });
}

pub fn scatter(ui: &mut Ui, view: &FilteredView, colors: &ColorMap) {
    let groups = scatter_by_location(view);
    Plot::new("deaths_vs_vaccinations")
        .legend(Legend::default())
        .height(CHART_HEIGHT)
        .x_axis_label(ValueColumn::PeopleVaccinatedPerHundred.label())
        .y_axis_label(ValueColumn::NewDeathsSmoothed.label())
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            for (loc, pts) in groups {
                let points = Points::new(PlotPoints::from(pts))
                    .name(&loc)
                    .color(colors.color_for(&loc))
                    .radius(3.0);
                plot_ui.points(points);
            }
        });
}

/// Horizontal bars of summed deaths per location, largest on top.
pub fn cumulative_deaths(ui: &mut Ui, view: &FilteredView, colors: &ColorMap) {
    let totals = aggregate(view, ValueColumn::NewDeathsSmoothed, Reducer::Sum);
    let ranked = sorted_descending(&totals);
    let n = ranked.len();

    let names: Vec<String> = ranked.iter().rev().map(|(loc, _)| loc.to_string()).collect();
    let bars: Vec<Bar> = ranked
        .iter()
        .enumerate()
        .map(|(i, (loc, total))| {
            Bar::new((n - 1 - i) as f64, *total)
                .name(*loc)
                .fill(colors.color_for(loc))
        })
        .collect();

    Plot::new("cumulative_deaths")
        .height((n as f32 * 28.0).clamp(120.0, CHART_HEIGHT * 2.0))
        .x_axis_label("Total deaths (smoothed sum)")
        .y_axis_formatter(move |mark, _range| {
            let idx = mark.value.round();
            if (mark.value - idx).abs() > 1e-6 || idx < 0.0 {
                return String::new();
            }
            names.get(idx as usize).cloned().unwrap_or_default()
        })
        .allow_scroll(false)
        .allow_drag(false)
        .allow_zoom(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).horizontal().width(0.7));
        });
}

/// Deaths per location (rows) and date (columns), darker is higher.
pub fn heatmap(ui: &mut Ui, view: &FilteredView) {
    let grid = heatmap_grid(view, ValueColumn::NewDeathsSmoothed);
    let Some(max) = grid.max else {
        ui.label("No death figures in the selection.");
        return;
    };

    let label_width = 140.0;
    let row_height = 18.0;
    let width = ui.available_width().max(label_width + 50.0);
    let height = row_height * grid.locations.len() as f32;
    let (rect, response) = ui.allocate_exact_size(egui::vec2(width, height), Sense::hover());
    let painter = ui.painter_at(rect);

    let cell_width = (width - label_width) / grid.dates.len().max(1) as f32;
    let text_color = ui.visuals().text_color();

    for (row, loc) in grid.locations.iter().enumerate() {
        let top = rect.top() + row as f32 * row_height;
        painter.text(
            egui::pos2(rect.left() + label_width - 6.0, top + row_height / 2.0),
            Align2::RIGHT_CENTER,
            loc,
            FontId::proportional(12.0),
            text_color,
        );
        for (col, cell) in grid.cells[row].iter().enumerate() {
            let Some(v) = cell else {
                continue;
            };
            let left = rect.left() + label_width + col as f32 * cell_width;
            let cell_rect = egui::Rect::from_min_size(
                egui::pos2(left, top),
                egui::vec2(cell_width.max(1.0), row_height - 1.0),
            );
            painter.rect_filled(cell_rect, 0.0, REDS.shade(*v, 0.0, max));
        }
    }
    painter.rect_stroke(
        rect,
        0.0,
        Stroke::new(1.0, Color32::from_gray(120)),
        egui::StrokeKind::Inside,
    );

    if let Some(pos) = response.hover_pos() {
        let row = ((pos.y - rect.top()) / row_height) as usize;
        let x = pos.x - rect.left() - label_width;
        if x >= 0.0 {
            let col = (x / cell_width) as usize;
            if let (Some(loc), Some(date)) = (grid.locations.get(row), grid.dates.get(col)) {
                let value = grid.cells[row][col]
                    .map(|v| format!("{v:.2}"))
                    .unwrap_or_else(|| "no data".to_string());
                response.on_hover_text(format!("{loc}\n{date}\nDeaths: {value}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::data::filter::filter;
    use crate::data::model::{Dataset, FilterCriteria, Record};

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn rec(d: &str, loc: &str, deaths: Option<f64>, vax: Option<f64>) -> Record {
        Record {
            date: Some(day(d)),
            location: Some(loc.to_string()),
            new_deaths_smoothed: deaths,
            people_vaccinated_per_hundred: vax,
        }
    }

    fn view() -> FilteredView {
        let ds = Arc::new(Dataset::from_records(vec![
            rec("2021-01-03", "B", Some(3.0), Some(30.0)),
            rec("2021-01-01", "A", Some(1.0), None),
            rec("2021-01-02", "B", None, Some(20.0)),
            rec("2021-01-01", "B", Some(2.0), Some(10.0)),
            rec("2021-01-01", "B", Some(4.0), Some(12.0)),
        ]));
        filter(&ds, &FilterCriteria::everything(&ds).unwrap())
    }

    #[test]
    fn test_series_sorted_by_date_and_skip_nulls() {
        let series = series_by_location(&view(), ValueColumn::NewDeathsSmoothed);
        let names: Vec<&str> = series.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);

        let b = &series[1].1;
        let xs: Vec<Option<NaiveDate>> = b.iter().map(|p| x_to_date(p[0])).collect();
        assert_eq!(
            xs,
            vec![
                Some(day("2021-01-01")),
                Some(day("2021-01-01")),
                Some(day("2021-01-03"))
            ]
        );
        assert_eq!(b[2][1], 3.0);
    }

    #[test]
    fn test_scatter_needs_both_values() {
        let groups = scatter_by_location(&view());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].0, "B");
        assert_eq!(groups[0].1, vec![[30.0, 3.0], [10.0, 2.0], [12.0, 4.0]]);
    }

    #[test]
    fn test_heatmap_averages_duplicates() {
        let grid = heatmap_grid(&view(), ValueColumn::NewDeathsSmoothed);
        assert_eq!(grid.locations, vec!["A", "B"]);
        assert_eq!(grid.dates, vec![day("2021-01-01"), day("2021-01-03")]);
        assert_eq!(grid.cells[0], vec![Some(1.0), None]);
        assert_eq!(grid.cells[1], vec![Some(3.0), Some(3.0)]);
        assert_eq!(grid.max, Some(3.0));
    }

    #[test]
    fn test_date_x_round_trip() {
        let d = day("2022-07-15");
        assert_eq!(x_to_date(date_to_x(d)), Some(d));
        assert_eq!(x_to_date(f64::NAN), None);
        assert_eq!(date_axis_label(date_to_x(d)), "2022-07-15");
    }
}
