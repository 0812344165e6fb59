use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::color::ColorMap;
use crate::config::DashboardConfig;
use crate::data::cache::Memo;
use crate::data::error::LoadError;
use crate::data::export::{export_to_path, ExportError};
use crate::data::filter::filter;
use crate::data::loader::load_or_invalid;
use crate::data::model::{Dataset, FilterCriteria, FilteredView};
use crate::data::source::{DataSource, SourceKey};
use crate::fetch::Fetcher;
use crate::map::shapes::WorldShapes;
use crate::map::{fetch_world, MapMetric};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// What the central panel should show this frame.
#[derive(Debug)]
pub enum ViewStatus<'a> {
    /// Nothing loaded yet.
    NoData,
    /// The last load failed; downstream views are skipped.
    LoadFailed(&'a str),
    /// Loaded, but the filters select no rows.
    Empty,
    Ready(&'a FilteredView),
}

/// A loaded, valid dataset together with its source fingerprint.
pub struct Loaded {
    pub key: SourceKey,
    pub label: String,
    pub dataset: Arc<Dataset>,
    /// Sorted distinct locations.
    pub locations: Vec<String>,
    pub date_span: Option<(NaiveDate, NaiveDate)>,
}

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: DashboardConfig,
    fetcher: Box<dyn Fetcher>,

    load_cache: Memo<SourceKey, Arc<Dataset>>,
    filter_cache: Memo<(SourceKey, FilterCriteria), FilteredView>,

    /// Current valid dataset (None until a load succeeds).
    pub loaded: Option<Loaded>,
    /// Source of the last load attempt, kept for "Reload".
    last_source: Option<DataSource>,

    /// Current selection; set whenever a dataset is loaded.
    pub criteria: Option<FilterCriteria>,
    /// Rows passing the current criteria (cached).
    pub view: Option<FilteredView>,

    /// Location colours for every chart.
    pub color_map: ColorMap,

    /// Optional chart group (scatter, bar, heatmap).
    pub show_comparison: bool,
    pub show_map: bool,
    pub map_metric: MapMetric,
    pub world: Option<WorldShapes>,
    pub map_error: Option<String>,

    /// Blocking load error shown instead of every view.
    pub load_error: Option<String>,
    /// Non-blocking status line (exports etc.).
    pub status_message: Option<String>,

    /// Text typed into the location search box.
    pub location_search: String,
}

impl AppState {
    pub fn new(config: DashboardConfig, fetcher: Box<dyn Fetcher>) -> Self {
        let filter_cache = Memo::bounded(config.filter_cache_size);
        Self {
            config,
            fetcher,
            load_cache: Memo::unbounded(),
            filter_cache,
            loaded: None,
            last_source: None,
            criteria: None,
            view: None,
            color_map: ColorMap::default(),
            show_comparison: true,
            show_map: false,
            map_metric: MapMetric::DeathsIntensity,
            world: None,
            map_error: None,
            load_error: None,
            status_message: None,
            location_search: String::new(),
        }
    }

    pub fn status(&self) -> ViewStatus<'_> {
        if let Some(err) = &self.load_error {
            return ViewStatus::LoadFailed(err);
        }
        match (&self.loaded, &self.view) {
            (None, _) => ViewStatus::NoData,
            (Some(_), Some(view)) if !view.is_empty() => ViewStatus::Ready(view),
            (Some(_), _) => ViewStatus::Empty,
        }
    }

    // -- loading --

    /// Load `source`, reusing the cached dataset if this source was
    /// loaded before.
    pub fn open_source(&mut self, source: DataSource) {
        let key = source.key();
        let dataset = match self.load_cache.get(&key) {
            Some(ds) => {
                log::debug!("Load cache hit for {} ({key})", source.label());
                Some(ds)
            }
            None => match load_or_invalid(&source, self.fetcher.as_ref()) {
                (ds, None) => {
                    let ds = Arc::new(ds);
                    self.load_cache.insert(key, Arc::clone(&ds));
                    Some(ds)
                }
                (_, Some(err)) => {
                    let hint = match &err {
                        LoadError::Fetch(e) if e.is_retriable() => " Try File > Reload.",
                        _ => "",
                    };
                    self.load_error =
                        Some(format!("Could not load {}: {err}.{hint}", source.label()));
                    self.loaded = None;
                    self.criteria = None;
                    self.view = None;
                    None
                }
            },
        };

        let label = source.label().to_string();
        self.last_source = Some(source);
        if let Some(ds) = dataset {
            self.set_dataset(key, label, ds);
        }
    }

    pub fn open_remote(&mut self) {
        let url = self.config.remote_url.clone();
        self.open_source(DataSource::remote(url));
    }

    pub fn open_path(&mut self, path: &Path) {
        match DataSource::from_path(path) {
            Ok(source) => self.open_source(source),
            Err(e) => {
                log::error!("Failed to read {}: {e}", path.display());
                self.load_error = Some(e.to_string());
                self.loaded = None;
                self.view = None;
            }
        }
    }

    /// Drop the cached copy of the last source and load it again.
    pub fn reload(&mut self) {
        let Some(source) = self.last_source.take() else {
            return;
        };
        let key = source.key();
        self.load_cache.invalidate(&key);
        self.filter_cache.retain(|(k, _)| *k != key);
        log::debug!(
            "Reloading {key}, {} cached views kept for other sources",
            self.filter_cache.len()
        );
        self.open_source(source);
    }

    pub fn can_reload(&self) -> bool {
        self.last_source.is_some()
    }

    /// Ingest a validated dataset, initialise criteria and colours.
    fn set_dataset(&mut self, key: SourceKey, label: String, dataset: Arc<Dataset>) {
        if dataset.is_empty() {
            log::warn!("{label} has a header but no rows");
        }
        let locations: Vec<String> = dataset.locations().into_iter().collect();
        let date_span = dataset.date_span();

        let selected: BTreeSet<String> = self
            .config
            .default_locations
            .iter()
            .filter(|loc| locations.binary_search(*loc).is_ok())
            .cloned()
            .collect();
        let (start, end) = date_span.unwrap_or_else(|| {
            let today = chrono::Local::now().date_naive();
            (today, today)
        });

        self.color_map = ColorMap::new(&locations);
        self.criteria = Some(FilterCriteria::new(selected, start, end));
        self.loaded = Some(Loaded {
            key,
            label,
            dataset,
            locations,
            date_span,
        });
        self.load_error = None;
        self.status_message = None;
        self.refilter();
    }

    // -- filtering --

    /// Recompute `view` from the current criteria (cached per source and
    /// criteria).
    pub fn refilter(&mut self) {
        let (Some(loaded), Some(criteria)) = (&self.loaded, &self.criteria) else {
            self.view = None;
            return;
        };
        let cache_key = (loaded.key, criteria.clone());
        let dataset = &loaded.dataset;
        self.view = Some(
            self.filter_cache
                .get_or_insert_with(&cache_key, || filter(dataset, criteria)),
        );
    }

    pub fn is_selected(&self, location: &str) -> bool {
        self.criteria
            .as_ref()
            .is_some_and(|c| c.locations.contains(location))
    }

    /// Toggle a single location in the selection.
    pub fn toggle_location(&mut self, location: &str) {
        let Some(criteria) = &mut self.criteria else {
            return;
        };
        if !criteria.locations.remove(location) {
            criteria.locations.insert(location.to_string());
        }
        self.refilter();
    }

    pub fn select_all_locations(&mut self) {
        if let (Some(loaded), Some(criteria)) = (&self.loaded, &mut self.criteria) {
            criteria.locations = loaded.locations.iter().cloned().collect();
        }
        self.refilter();
    }

    pub fn select_no_locations(&mut self) {
        if let Some(criteria) = &mut self.criteria {
            criteria.locations.clear();
        }
        self.refilter();
    }

    /// Set the date interval, clamped to the dataset's span.
    pub fn set_date_range(&mut self, start: NaiveDate, end: NaiveDate) {
        let span = self.loaded.as_ref().and_then(|l| l.date_span);
        let Some(criteria) = &mut self.criteria else {
            return;
        };
        let (start, end) = match span {
            Some((lo, hi)) => (start.clamp(lo, hi), end.clamp(lo, hi)),
            None => (start, end),
        };
        if criteria.start == start && criteria.end == end {
            return;
        }
        criteria.start = start;
        criteria.end = end;
        self.refilter();
    }

    // -- map --

    /// Fetch the world outlines once, when the map is first shown.
    pub fn ensure_world(&mut self) {
        if !self.show_map || self.world.is_some() || self.map_error.is_some() {
            return;
        }
        match fetch_world(self.fetcher.as_ref(), &self.config.geojson_url) {
            Ok(world) => self.world = Some(world),
            Err(e) => {
                log::error!("Map unavailable: {e}");
                self.map_error = Some(e.to_string());
            }
        }
    }

    /// Clear a map error so the next frame fetches again.
    pub fn retry_map(&mut self) {
        self.map_error = None;
    }

    // -- export --

    pub fn export_view(&mut self, path: &Path) -> Result<(), ExportError> {
        let Some(view) = self.view.as_ref().filter(|v| !v.is_empty()) else {
            return Ok(());
        };
        export_to_path(view, path)?;
        self.status_message = Some(format!("Exported {} rows to {}", view.len(), path.display()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::fetch::tests::StubFetcher;

    const URL: &str = "https://example.test/owid.csv";
    const GEO_URL: &str = "https://example.test/world.json";

    const CSV: &str = "\
date,location,new_deaths_smoothed,people_vaccinated_per_hundred,continent
2021-01-01,India,5,1,Asia
2021-01-02,India,6,2,Asia
2021-01-01,Chile,1,3,South America
2021-01-03,Chile,,4,South America
2021-01-02,Peru,2,,South America
";

    const WORLD: &str = r#"{"type":"FeatureCollection","features":[
        {"properties":{"name":"India"},
         "geometry":{"type":"Polygon","coordinates":[[[68,7],[97,7],[90,35],[68,7]]]}}]}"#;

    fn config() -> DashboardConfig {
        DashboardConfig {
            remote_url: URL.to_string(),
            geojson_url: GEO_URL.to_string(),
            default_locations: vec!["India".into(), "Chile".into(), "Atlantis".into()],
            filter_cache_size: 4,
            ..DashboardConfig::default()
        }
    }

    fn state_with(stub: StubFetcher) -> AppState {
        AppState::new(config(), Box::new(stub))
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_remote_load_initialises_selection_and_view() {
        let mut state = state_with(StubFetcher::with(URL, CSV.as_bytes()));
        state.open_remote();

        let loaded = state.loaded.as_ref().unwrap();
        assert_eq!(loaded.locations, vec!["Chile", "India", "Peru"]);
        assert_eq!(loaded.date_span, Some((day("2021-01-01"), day("2021-01-03"))));

        let criteria = state.criteria.as_ref().unwrap();
        let selected: Vec<&str> = criteria.locations.iter().map(String::as_str).collect();
        assert_eq!(selected, vec!["Chile", "India"]);

        match state.status() {
            ViewStatus::Ready(view) => assert_eq!(view.indices(), &[0, 1, 2, 3]),
            other => panic!("unexpected status {other:?}"),
        }
    }

    #[test]
    fn test_same_source_is_fetched_once_until_reload() {
        let stub = StubFetcher::with(URL, CSV.as_bytes());
        let calls = Rc::clone(&stub.calls);
        let mut state = state_with(stub);

        state.open_remote();
        state.open_remote();
        assert_eq!(calls.get(), 1);

        state.reload();
        assert_eq!(calls.get(), 2);
        assert!(state.loaded.is_some());
    }

    /// Serves `bodies` in turn, repeating the last one.
    struct SequenceFetcher {
        bodies: Vec<&'static str>,
        calls: Cell<usize>,
    }

    impl Fetcher for SequenceFetcher {
        fn fetch(&self, _url: &str) -> Result<Vec<u8>, crate::fetch::FetchError> {
            let n = self.calls.get();
            self.calls.set(n + 1);
            let body = self.bodies[n.min(self.bodies.len() - 1)];
            Ok(body.as_bytes().to_vec())
        }
    }

    #[test]
    fn test_reload_refilters_against_new_data() {
        let fetcher = SequenceFetcher {
            bodies: vec![
                "date,location,new_deaths_smoothed,people_vaccinated_per_hundred\n2021-01-01,India,5,1\n",
                "date,location,new_deaths_smoothed,people_vaccinated_per_hundred\n2021-01-01,India,99,1\n",
            ],
            calls: Cell::new(0),
        };
        let mut state = AppState::new(config(), Box::new(fetcher));
        let deaths = |state: &AppState| {
            let view = state.view.as_ref().unwrap();
            view.records().next().and_then(|r| r.new_deaths_smoothed)
        };

        state.open_remote();
        assert_eq!(deaths(&state), Some(5.0));

        state.reload();
        let loaded = state.loaded.as_ref().unwrap();
        assert_eq!(loaded.dataset.records()[0].new_deaths_smoothed, Some(99.0));
        assert_eq!(deaths(&state), Some(99.0));
    }

    #[test]
    fn test_reload_keeps_views_of_other_sources() {
        let mut state = state_with(StubFetcher::with(URL, CSV.as_bytes()));
        state.open_source(DataSource::upload("good.csv", CSV.as_bytes().to_vec()));
        state.open_remote();
        assert_eq!(state.filter_cache.len(), 2);

        state.reload();
        assert_eq!(state.filter_cache.len(), 2);
        assert!(matches!(state.status(), ViewStatus::Ready(_)));
    }

    #[test]
    fn test_comparison_charts_shown_by_default() {
        let state = state_with(StubFetcher::default());
        assert!(state.show_comparison);
        assert!(!state.show_map);
    }

    #[test]
    fn test_failed_load_blocks_views_and_is_not_cached() {
        let stub = StubFetcher::default();
        let calls = Rc::clone(&stub.calls);
        let mut state = state_with(stub);

        state.open_remote();
        assert!(matches!(state.status(), ViewStatus::LoadFailed(_)));
        assert!(state.view.is_none());

        state.open_remote();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_upload_missing_column_reports_error() {
        let mut state = state_with(StubFetcher::default());
        state.open_source(DataSource::upload("bad.csv", b"date,new_deaths_smoothed\n".to_vec()));
        match state.status() {
            ViewStatus::LoadFailed(msg) => assert!(msg.contains("location"), "{msg}"),
            other => panic!("unexpected status {other:?}"),
        }
    }

    #[test]
    fn test_successful_load_clears_previous_error() {
        let mut state = state_with(StubFetcher::default());
        state.open_source(DataSource::upload("bad.csv", b"x\n1\n".to_vec()));
        assert!(state.load_error.is_some());
        state.open_source(DataSource::upload("good.csv", CSV.as_bytes().to_vec()));
        assert!(state.load_error.is_none());
        assert!(matches!(state.status(), ViewStatus::Ready(_)));
    }

    #[test]
    fn test_selection_changes_refilter() {
        let mut state = state_with(StubFetcher::default());
        state.open_source(DataSource::upload("good.csv", CSV.as_bytes().to_vec()));

        state.select_no_locations();
        assert!(matches!(state.status(), ViewStatus::Empty));

        state.toggle_location("Peru");
        assert!(state.is_selected("Peru"));
        assert_eq!(state.view.as_ref().unwrap().indices(), &[4]);

        state.select_all_locations();
        assert_eq!(state.view.as_ref().unwrap().len(), 5);

        state.set_date_range(day("2021-01-02"), day("2021-01-02"));
        assert_eq!(state.view.as_ref().unwrap().indices(), &[1, 4]);
    }

    #[test]
    fn test_date_range_clamped_to_span() {
        let mut state = state_with(StubFetcher::default());
        state.open_source(DataSource::upload("good.csv", CSV.as_bytes().to_vec()));
        state.set_date_range(day("2019-01-01"), day("2030-01-01"));
        let c = state.criteria.as_ref().unwrap();
        assert_eq!((c.start, c.end), (day("2021-01-01"), day("2021-01-03")));
    }

    #[test]
    fn test_map_fetched_once_and_error_is_local() {
        let mut state = state_with(StubFetcher::with(GEO_URL, WORLD.as_bytes()));
        state.open_source(DataSource::upload("good.csv", CSV.as_bytes().to_vec()));

        state.ensure_world();
        assert!(state.world.is_none(), "map hidden, nothing fetched");

        state.show_map = true;
        state.ensure_world();
        assert_eq!(state.world.as_ref().unwrap().countries.len(), 1);

        let mut broken = state_with(StubFetcher::default());
        broken.open_source(DataSource::upload("good.csv", CSV.as_bytes().to_vec()));
        broken.show_map = true;
        broken.ensure_world();
        assert!(broken.map_error.is_some());
        assert!(matches!(broken.status(), ViewStatus::Ready(_)));
    }

    #[test]
    fn test_export_view_writes_file() {
        let mut state = state_with(StubFetcher::default());
        state.open_source(DataSource::upload("good.csv", CSV.as_bytes().to_vec()));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        state.export_view(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 5);
        assert!(state.status_message.is_some());
    }
}
