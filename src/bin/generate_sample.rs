use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Days, NaiveDate};
use parquet::arrow::ArrowWriter;

/// (location, iso_code, continent, population in millions, vaccination start offset in days)
const COUNTRIES: &[(&str, &str, &str, f64, u64)] = &[
    ("United States", "USA", "North America", 331.0, 290),
    ("India", "IND", "Asia", 1380.0, 320),
    ("Brazil", "BRA", "South America", 212.0, 330),
    ("United Kingdom", "GBR", "Europe", 67.0, 280),
    ("Germany", "DEU", "Europe", 83.0, 300),
    ("South Africa", "ZAF", "Africa", 59.0, 350),
    ("Japan", "JPN", "Asia", 126.0, 350),
    ("Chile", "CHL", "South America", 19.0, 310),
    ("Cote d'Ivoire", "CIV", "Africa", 26.0, 380),
    ("Kosovo", "OWID_KOS", "Europe", 1.8, 400),
];

const DAYS: u64 = 3 * 365;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// Three waves of deaths per million, scaled by population.
fn deaths(day: f64, population: f64, rng: &mut SimpleRng) -> f64 {
    let waves = [(120.0, 30.0, 3.0), (420.0, 45.0, 5.0), (700.0, 35.0, 2.0)];
    let per_million: f64 = waves
        .iter()
        .map(|&(mu, sigma, amp)| amp * (-(day - mu).powi(2) / (2.0 * sigma * sigma)).exp())
        .sum();
    (per_million * population * (1.0 + rng.gauss(0.0, 0.08))).max(0.0)
}

/// Logistic uptake curve, `None` before the rollout starts.
fn vaccinated(day: u64, start: u64) -> Option<f64> {
    let t = day.checked_sub(start)? as f64;
    Some(85.0 / (1.0 + (-(t - 120.0) / 30.0).exp()))
}

struct Row {
    iso_code: String,
    continent: String,
    location: String,
    date: String,
    total_cases: Option<f64>,
    new_deaths_smoothed: Option<f64>,
    people_vaccinated_per_hundred: Option<f64>,
}

fn generate(rng: &mut SimpleRng) -> Result<Vec<Row>> {
    let first = NaiveDate::from_ymd_opt(2020, 3, 1).context("invalid start date")?;
    let mut rows = Vec::new();

    for &(location, iso, continent, population, vax_start) in COUNTRIES {
        let mut total_cases = 0.0;
        for day in 0..DAYS {
            let date = first
                .checked_add_days(Days::new(day))
                .context("date out of range")?;
            let d = deaths(day as f64, population, rng);
            total_cases += d * 60.0;

            // Reporting gaps, as in the real feed.
            let reported = rng.next_f64() > 0.03;
            rows.push(Row {
                iso_code: iso.to_string(),
                continent: continent.to_string(),
                location: location.to_string(),
                date: date.format("%Y-%m-%d").to_string(),
                total_cases: Some(total_cases.round()),
                new_deaths_smoothed: reported.then_some((d * 1000.0).round() / 1000.0),
                people_vaccinated_per_hundred: vaccinated(day, vax_start)
                    .filter(|_| day % 7 == 0 || rng.next_f64() > 0.5)
                    .map(|v| (v * 100.0).round() / 100.0),
            });
        }
    }

    // An aggregate region row and a row with a malformed date.
    rows.push(Row {
        iso_code: "OWID_WRL".into(),
        continent: String::new(),
        location: "World".into(),
        date: "2021-06-01".into(),
        total_cases: None,
        new_deaths_smoothed: Some(10512.4),
        people_vaccinated_per_hundred: Some(21.3),
    });
    rows.push(Row {
        iso_code: "CHL".into(),
        continent: "South America".into(),
        location: "Chile".into(),
        date: "not-a-date".into(),
        total_cases: None,
        new_deaths_smoothed: Some(1.0),
        people_vaccinated_per_hundred: None,
    });
    Ok(rows)
}

fn cell(v: Option<f64>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

fn write_csv(rows: &[Row], path: &str) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("creating {path}"))?;
    writer.write_record([
        "iso_code",
        "continent",
        "location",
        "date",
        "total_cases",
        "new_deaths_smoothed",
        "people_vaccinated_per_hundred",
    ])?;
    for r in rows {
        writer.write_record([
            r.iso_code.as_str(),
            r.continent.as_str(),
            r.location.as_str(),
            r.date.as_str(),
            cell(r.total_cases).as_str(),
            cell(r.new_deaths_smoothed).as_str(),
            cell(r.people_vaccinated_per_hundred).as_str(),
        ])?;
    }
    writer.flush().with_context(|| format!("writing {path}"))?;
    Ok(())
}

fn write_parquet(rows: &[Row], path: &str) -> Result<()> {
    let strings = |f: fn(&Row) -> &str| StringArray::from(rows.iter().map(f).collect::<Vec<_>>());
    let floats = |f: fn(&Row) -> Option<f64>| Float64Array::from(rows.iter().map(f).collect::<Vec<_>>());

    let schema = Arc::new(Schema::new(vec![
        Field::new("iso_code", DataType::Utf8, false),
        Field::new("continent", DataType::Utf8, false),
        Field::new("location", DataType::Utf8, false),
        Field::new("date", DataType::Utf8, false),
        Field::new("total_cases", DataType::Float64, true),
        Field::new("new_deaths_smoothed", DataType::Float64, true),
        Field::new("people_vaccinated_per_hundred", DataType::Float64, true),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(strings(|r| r.iso_code.as_str())),
            Arc::new(strings(|r| r.continent.as_str())),
            Arc::new(strings(|r| r.location.as_str())),
            Arc::new(strings(|r| r.date.as_str())),
            Arc::new(floats(|r| r.total_cases)),
            Arc::new(floats(|r| r.new_deaths_smoothed)),
            Arc::new(floats(|r| r.people_vaccinated_per_hundred)),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path).with_context(|| format!("creating {path}"))?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let rows = generate(&mut rng)?;

    write_csv(&rows, "sample_owid.csv")?;
    write_parquet(&rows, "sample_owid.parquet")?;

    println!(
        "Wrote {} rows for {} locations to sample_owid.csv and sample_owid.parquet",
        rows.len(),
        COUNTRIES.len() + 1
    );
    Ok(())
}
