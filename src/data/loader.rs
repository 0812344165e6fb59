use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type};
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ProjectionMask;

use super::error::LoadError;
use super::model::{Column, Dataset, Record};
use super::source::DataSource;
use crate::fetch::Fetcher;

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load and project a dataset from `source`.
///
/// Only the four [`Column`]s are read; any other source column is skipped
/// while parsing. A source that lacks one of them, or names one twice, is
/// rejected.
pub fn load(source: &DataSource, fetcher: &dyn Fetcher) -> Result<Dataset, LoadError> {
    let dataset = match source {
        DataSource::Upload { name, bytes } => parse_bytes(Some(name.as_str()), bytes)?,
        DataSource::Remote { url } => {
            let body = fetcher.fetch(url)?;
            parse_bytes(Some(url.as_str()), &body)?
        }
    };
    log::info!(
        "Loaded {} rows ({} locations) from {}",
        dataset.len(),
        dataset.locations().len(),
        source.label()
    );
    Ok(dataset)
}

/// Loader boundary: never fails. On error the returned dataset is
/// [`Dataset::invalid`] and the error is handed back for display.
pub fn load_or_invalid(source: &DataSource, fetcher: &dyn Fetcher) -> (Dataset, Option<LoadError>) {
    match load(source, fetcher) {
        Ok(dataset) => (dataset, None),
        Err(e) => {
            log::error!("Failed to load {}: {e}", source.label());
            (Dataset::invalid(), Some(e))
        }
    }
}

/// Parse an in-memory CSV or Parquet body. `name` is only used to pick
/// the format by extension; the Parquet magic bytes are checked too.
pub fn parse_bytes(name: Option<&str>, bytes: &[u8]) -> Result<Dataset, LoadError> {
    if bytes.is_empty() {
        return Err(LoadError::EmptySource);
    }
    let ext = name
        .and_then(|n| n.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    if matches!(ext.as_str(), "parquet" | "pq") || bytes.starts_with(b"PAR1") {
        parse_parquet(Bytes::copy_from_slice(bytes))
    } else {
        parse_csv(bytes)
    }
}

// ---------------------------------------------------------------------------
// Column projection
// ---------------------------------------------------------------------------

/// Position of each required column in the source header, indexed in
/// [`Column::ALL`] order.
fn locate_columns<'a>(headers: impl IntoIterator<Item = &'a str>) -> Result<[usize; 4], LoadError> {
    let mut found: [Option<usize>; 4] = [None; 4];
    for (idx, header) in headers.into_iter().enumerate() {
        let header = header.trim().trim_start_matches('\u{feff}');
        let Some(col) = Column::from_name(header) else {
            continue;
        };
        let slot = &mut found[col as usize];
        if slot.is_some() {
            return Err(LoadError::DuplicateColumn(col.name().to_string()));
        }
        *slot = Some(idx);
    }

    let missing: Vec<String> = Column::ALL
        .iter()
        .filter(|c| found[**c as usize].is_none())
        .map(|c| c.name().to_string())
        .collect();
    if !missing.is_empty() {
        return Err(LoadError::MissingColumns(missing));
    }

    let mut positions = [0; 4];
    for (pos, slot) in positions.iter_mut().zip(found) {
        *pos = slot.unwrap_or_default();
    }
    Ok(positions)
}

// ---------------------------------------------------------------------------
// Cell parsers
// ---------------------------------------------------------------------------

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parse a calendar date; anything unrecognised becomes `None`.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y/%m/%d") {
        return Some(d);
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}

/// Parse a numeric cell. Blank and NaN markers are null; anything else
/// that is not a number is an error.
fn parse_number(s: &str, row: usize, col: Column) -> Result<Option<f64>, LoadError> {
    let s = s.trim();
    if s.is_empty() || matches!(s, "nan" | "NaN" | "NA" | "null") {
        return Ok(None);
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_nan() => Ok(None),
        Ok(v) => Ok(Some(v)),
        Err(_) => Err(LoadError::InvalidNumber {
            row,
            column: col.name().to_string(),
            value: s.to_string(),
        }),
    }
}

fn parse_location(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row, comma-delimited, any column order. Rows are read
/// into one reused byte buffer and only the projected fields are decoded.
fn parse_csv(bytes: &[u8]) -> Result<Dataset, LoadError> {
    let mut reader = csv::ReaderBuilder::new().from_reader(bytes);

    let headers = reader.byte_headers()?.clone();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(LoadError::EmptySource);
    }
    let decoded: Vec<String> = headers
        .iter()
        .map(|h| String::from_utf8_lossy(h).into_owned())
        .collect();
    let [date_idx, loc_idx, deaths_idx, vax_idx] =
        locate_columns(decoded.iter().map(String::as_str))?;

    let mut records = Vec::new();
    let mut row = csv::ByteRecord::new();
    while reader.read_byte_record(&mut row)? {
        let row_no = records.len() + 1;
        let field = |idx: usize| String::from_utf8_lossy(row.get(idx).unwrap_or_default());

        records.push(Record {
            date: parse_date(&field(date_idx)),
            location: parse_location(&field(loc_idx)),
            new_deaths_smoothed: parse_number(&field(deaths_idx), row_no, Column::NewDeathsSmoothed)?,
            people_vaccinated_per_hundred: parse_number(
                &field(vax_idx),
                row_no,
                Column::PeopleVaccinatedPerHundred,
            )?,
        });
    }

    Ok(Dataset::from_records(records))
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet body. A root-column projection mask restricts decoding
/// to the four required columns.
///
/// Accepted column types:
/// - `date`: Utf8 / LargeUtf8, Date32 / Date64, Timestamp
/// - `location`: Utf8 / LargeUtf8 / Utf8View / Dictionary of strings
/// - value columns: any numeric type, or strings holding numbers
fn parse_parquet(bytes: Bytes) -> Result<Dataset, LoadError> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(bytes)?;
    let positions = locate_columns(builder.schema().fields().iter().map(|f| f.name().as_str()))?;
    let mask = ProjectionMask::roots(builder.parquet_schema(), positions);
    let reader = builder.with_projection(mask).build()?;

    let mut records = Vec::new();
    for batch in reader {
        let batch = batch?;
        let base = records.len();

        let dates = date_strings(batch_column(&batch, Column::Date)?)?;
        let locations = location_strings(batch_column(&batch, Column::Location)?)?;
        let deaths = numeric_values(
            batch_column(&batch, Column::NewDeathsSmoothed)?,
            Column::NewDeathsSmoothed,
            base,
        )?;
        let vax = numeric_values(
            batch_column(&batch, Column::PeopleVaccinatedPerHundred)?,
            Column::PeopleVaccinatedPerHundred,
            base,
        )?;

        for row in 0..batch.num_rows() {
            records.push(Record {
                date: dates[row].as_deref().and_then(parse_date),
                location: locations[row].as_deref().and_then(parse_location),
                new_deaths_smoothed: deaths[row],
                people_vaccinated_per_hundred: vax[row],
            });
        }
    }

    Ok(Dataset::from_records(records))
}

// -- Arrow helpers --

fn batch_column(batch: &RecordBatch, col: Column) -> Result<&ArrayRef, LoadError> {
    batch
        .column_by_name(col.name())
        .ok_or_else(|| LoadError::MissingColumns(vec![col.name().to_string()]))
}

fn unsupported(col: Column, data_type: &DataType) -> LoadError {
    LoadError::UnsupportedType {
        column: col.name().to_string(),
        data_type: data_type.to_string(),
    }
}

/// Cast `array` to Utf8 and collect its cells.
fn utf8_cells(array: &ArrayRef, col: Column) -> Result<Vec<Option<String>>, LoadError> {
    let utf8 = cast(array, &DataType::Utf8)?;
    let strings = utf8
        .as_string_opt::<i32>()
        .ok_or_else(|| unsupported(col, array.data_type()))?;
    Ok(strings.iter().map(|v| v.map(str::to_string)).collect())
}

fn date_strings(array: &ArrayRef) -> Result<Vec<Option<String>>, LoadError> {
    match array.data_type() {
        DataType::Utf8
        | DataType::LargeUtf8
        | DataType::Utf8View
        | DataType::Date32
        | DataType::Date64
        | DataType::Timestamp(_, _) => utf8_cells(array, Column::Date),
        DataType::Null => Ok(vec![None; array.len()]),
        other => Err(unsupported(Column::Date, other)),
    }
}

fn location_strings(array: &ArrayRef) -> Result<Vec<Option<String>>, LoadError> {
    match array.data_type() {
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View | DataType::Dictionary(_, _) => {
            utf8_cells(array, Column::Location)
        }
        DataType::Null => Ok(vec![None; array.len()]),
        other => Err(unsupported(Column::Location, other)),
    }
}

/// Numeric columns are cast to Float64; string columns go through the
/// same cell parser as CSV. `base` offsets row numbers in error messages.
fn numeric_values(array: &ArrayRef, col: Column, base: usize) -> Result<Vec<Option<f64>>, LoadError> {
    let data_type = array.data_type();
    if data_type.is_numeric() || *data_type == DataType::Null {
        let floats = cast(array, &DataType::Float64)?;
        let floats = floats
            .as_primitive_opt::<Float64Type>()
            .ok_or_else(|| unsupported(col, data_type))?;
        return Ok(floats
            .iter()
            .map(|v| v.filter(|f| !f.is_nan()))
            .collect());
    }
    match data_type {
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => utf8_cells(array, col)?
            .iter()
            .enumerate()
            .map(|(i, cell)| match cell {
                Some(s) => parse_number(s, base + i + 1, col),
                None => Ok(None),
            })
            .collect(),
        other => Err(unsupported(col, other)),
    }
}
