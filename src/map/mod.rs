/// Choropleth support: world outlines, name reconciliation and the join
/// of a per-location aggregation onto country shapes.
pub mod alias;
pub mod shapes;

use std::collections::{BTreeMap, HashMap};

use crate::data::aggregate::{aggregate, Reducer};
use crate::data::model::{FilteredView, ValueColumn};
use crate::fetch::{FetchError, Fetcher};
use shapes::{CountryShape, WorldShapes};

#[derive(thiserror::Error, Debug)]
pub enum MapDataError {
    #[error("could not download country outlines: {0}")]
    Fetch(#[from] FetchError),
    #[error("country outlines are not valid GeoJSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("country outlines contain no usable features")]
    NoFeatures,
}

/// Which metric shades the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapMetric {
    DeathsIntensity,
    VaccinationProgress,
}

impl MapMetric {
    pub const ALL: [MapMetric; 2] = [MapMetric::DeathsIntensity, MapMetric::VaccinationProgress];

    pub fn title(self) -> &'static str {
        match self {
            MapMetric::DeathsIntensity => "Deaths Intensity",
            MapMetric::VaccinationProgress => "Vaccination Progress",
        }
    }

    pub fn legend(self) -> &'static str {
        match self {
            MapMetric::DeathsIntensity => "Average New Deaths (Smoothed)",
            MapMetric::VaccinationProgress => "People Vaccinated per 100",
        }
    }

    /// Column and reducer feeding this metric.
    pub fn aggregation(self) -> (ValueColumn, Reducer) {
        match self {
            MapMetric::DeathsIntensity => (ValueColumn::NewDeathsSmoothed, Reducer::Mean),
            MapMetric::VaccinationProgress => (ValueColumn::PeopleVaccinatedPerHundred, Reducer::Max),
        }
    }

    pub fn compute(self, view: &FilteredView) -> BTreeMap<String, f64> {
        let (column, reducer) = self.aggregation();
        aggregate(view, column, reducer)
    }
}

/// A country shape with its metric value, if the dataset has one.
#[derive(Debug, Clone)]
pub struct Region<'a> {
    pub shape: &'a CountryShape,
    pub value: Option<f64>,
}

/// Aggregated values joined onto the world shapes.
#[derive(Debug, Clone)]
pub struct ChoroplethLayer<'a> {
    pub regions: Vec<Region<'a>>,
    /// Value range over matched regions.
    pub range: Option<(f64, f64)>,
    /// Dataset locations with no matching outline (continents, "World", ...).
    pub unmatched: Vec<String>,
}

/// Join `values` (keyed by dataset location) onto `world` via the alias table.
pub fn join<'a>(world: &'a WorldShapes, values: &BTreeMap<String, f64>) -> ChoroplethLayer<'a> {
    let by_geo_name: HashMap<&str, (&str, f64)> = values
        .iter()
        .map(|(loc, v)| (alias::geo_name(loc), (loc.as_str(), *v)))
        .collect();

    let mut matched: Vec<&str> = Vec::new();
    let regions: Vec<Region<'a>> = world
        .countries
        .iter()
        .map(|shape| {
            let value = by_geo_name.get(shape.name.as_str()).map(|(loc, v)| {
                matched.push(*loc);
                *v
            });
            Region { shape, value }
        })
        .collect();

    let range = regions
        .iter()
        .filter_map(|r| r.value)
        .fold(None, |acc: Option<(f64, f64)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        });

    let unmatched = values
        .keys()
        .filter(|loc| !matched.contains(&loc.as_str()))
        .cloned()
        .collect();

    ChoroplethLayer {
        regions,
        range,
        unmatched,
    }
}

/// Download and parse the world outlines.
pub fn fetch_world(fetcher: &dyn Fetcher, url: &str) -> Result<WorldShapes, MapDataError> {
    let body = fetcher.fetch(url)?;
    let world = shapes::parse_world(&body)?;
    log::info!("Loaded {} country outlines", world.countries.len());
    Ok(world)
}
