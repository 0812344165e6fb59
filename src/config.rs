use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Environment variable naming a JSON config file.
pub const CONFIG_ENV: &str = "OWID_DASHBOARD_CONFIG";
/// Config file picked up from the working directory when the variable is unset.
pub const DEFAULT_CONFIG_FILE: &str = "owid-dashboard.json";

pub const OWID_CSV_URL: &str =
    "https://raw.githubusercontent.com/owid/covid-19-data/master/public/data/owid-covid-data.csv";
pub const WORLD_GEOJSON_URL: &str =
    "https://raw.githubusercontent.com/python-visualization/folium/main/examples/data/world-countries.json";

/// Runtime settings. Every field has a default, so a config file only
/// needs the keys it overrides.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DashboardConfig {
    pub remote_url: String,
    pub geojson_url: String,
    pub fetch_timeout_secs: u64,
    pub default_locations: Vec<String>,
    pub table_row_limit: usize,
    pub filter_cache_size: usize,
    pub export_file_name: String,
    /// Fetch the remote dataset on startup.
    pub autoload_remote: bool,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            remote_url: OWID_CSV_URL.to_string(),
            geojson_url: WORLD_GEOJSON_URL.to_string(),
            fetch_timeout_secs: 60,
            default_locations: ["United States", "India", "Brazil", "United Kingdom"]
                .map(String::from)
                .to_vec(),
            table_row_limit: 200,
            filter_cache_size: 32,
            export_file_name: "filtered_covid_data.csv".to_string(),
            autoload_remote: false,
        }
    }
}

impl DashboardConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs.max(1))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Resolve the config location: `$OWID_DASHBOARD_CONFIG`, else
    /// `owid-dashboard.json` if it exists, else none.
    pub fn locate() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        let local = PathBuf::from(DEFAULT_CONFIG_FILE);
        local.exists().then_some(local)
    }

    /// Load the located config, falling back to defaults on any problem.
    pub fn load_or_default() -> Self {
        let Some(path) = Self::locate() else {
            log::debug!("No config file, using defaults");
            return Self::default();
        };
        match Self::from_file(&path) {
            Ok(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            Err(e) => {
                log::warn!("Ignoring config: {e:#}");
                Self::default()
            }
        }
    }
}
