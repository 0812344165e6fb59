use std::io::Write;
use std::path::Path;

use super::model::{Column, FilteredView};

#[derive(thiserror::Error, Debug)]
pub enum ExportError {
    #[error("writing export: {0}")]
    Io(#[from] std::io::Error),
    #[error("encoding CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// Write the view as CSV: the four columns, no index, nulls as empty cells,
/// rows in view order.
pub fn write_csv<W: Write>(view: &FilteredView, writer: W) -> Result<(), ExportError> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(Column::ALL.iter().map(|c| c.name()))?;

    for r in view.records() {
        let date = r.date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default();
        let deaths = r.new_deaths_smoothed.map(|v| v.to_string()).unwrap_or_default();
        let vax = r
            .people_vaccinated_per_hundred
            .map(|v| v.to_string())
            .unwrap_or_default();
        out.write_record([
            date.as_str(),
            r.location.as_deref().unwrap_or_default(),
            deaths.as_str(),
            vax.as_str(),
        ])?;
    }

    out.flush()?;
    Ok(())
}

pub fn to_csv_bytes(view: &FilteredView) -> Result<Vec<u8>, ExportError> {
    let mut buf = Vec::new();
    write_csv(view, &mut buf)?;
    Ok(buf)
}

/// Export to a file, creating or truncating it.
pub fn export_to_path(view: &FilteredView, path: &Path) -> Result<(), ExportError> {
    std::fs::write(path, to_csv_bytes(view)?)?;
    log::info!("Exported {} rows to {}", view.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;

    use super::*;
    use crate::data::filter::filter;
    use crate::data::loader::parse_bytes;
    use crate::data::model::{Dataset, FilterCriteria};

    const SOURCE: &str = "\
location,date,extra,new_deaths_smoothed,people_vaccinated_per_hundred
Chile,2021-05-02,x,12.25,40
Chile,2021-05-01,y,,38.5
Peru,2021-05-01,z,30,
Chile,2021-05-03,w,,
";

    fn view() -> FilteredView {
        let ds = Arc::new(parse_bytes(None, SOURCE.as_bytes()).unwrap());
        let c = FilterCriteria::everything(&ds).unwrap();
        filter(&ds, &c)
    }

    #[test]
    fn test_export_layout_and_order() {
        let bytes = to_csv_bytes(&view()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(
            text,
            "date,location,new_deaths_smoothed,people_vaccinated_per_hundred\n\
             2021-05-02,Chile,12.25,40\n\
             2021-05-01,Chile,,38.5\n\
             2021-05-01,Peru,30,\n"
        );
    }

    #[test]
    fn test_export_reloads_to_same_rows() {
        let original = view();
        let bytes = to_csv_bytes(&original).unwrap();
        let reloaded = parse_bytes(None, &bytes).unwrap();
        let expected: Vec<_> = original.records().cloned().collect();
        assert_eq!(reloaded.records(), expected.as_slice());
    }

    #[test]
    fn test_empty_view_exports_header_only() {
        let ds = Arc::new(Dataset::from_records(Vec::new()));
        let day = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        let empty = filter(&ds, &FilterCriteria::new(["A"], day, day));
        let text = String::from_utf8(to_csv_bytes(&empty).unwrap()).unwrap();
        assert_eq!(text, "date,location,new_deaths_smoothed,people_vaccinated_per_hundred\n");
    }

    #[test]
    fn test_export_to_path_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filtered_covid_data.csv");
        export_to_path(&view(), &path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written.lines().count(), 4);
    }
}
