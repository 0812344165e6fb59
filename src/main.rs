mod app;
mod color;
mod config;
mod data;
mod fetch;
mod map;
mod state;
mod ui;

use app::DashboardApp;
use config::DashboardConfig;
use eframe::egui;
use fetch::HttpFetcher;
use state::AppState;

fn main() -> eframe::Result {
    env_logger::init();

    let config = DashboardConfig::load_or_default();
    let fetcher = match HttpFetcher::new(config.fetch_timeout()) {
        Ok(f) => f,
        Err(e) => {
            log::error!("Could not set up HTTP client: {e}");
            std::process::exit(1);
        }
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 860.0])
            .with_min_inner_size([640.0, 420.0]),
        ..Default::default()
    };

    eframe::run_native(
        "OWID COVID-19 Dashboard",
        options,
        Box::new(move |_cc| {
            let state = AppState::new(config, Box::new(fetcher));
            Ok(Box::new(DashboardApp::new(state)))
        }),
    )
}
