mod app;
mod config;
mod data;
mod error;
mod geometry;
mod gesture;
mod model;
mod pagination;
mod session;
mod storage;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use eframe::egui;

use crate::app::EyesApp;
use crate::config::AppConfig;
use crate::data::{DataService, HttpTransport, StubSubmitter};
use crate::session::Session;

/// Directory name under the user's config dir.
pub const APP_DIR: &str = "eyes-annotate";

// ── Main ────────────────────────────────────────────────────────────────────

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 2 {
        eprintln!("Usage: eyes-annotate [config.json]");
        std::process::exit(1);
    }
    let config_path = args.get(1).map(PathBuf::from);

    let (config, config_message) = AppConfig::resolve(config_path.as_deref());
    env_logger::Builder::new()
        .filter_level(config.log_level.to_level_filter())
        .parse_default_env()
        .init();
    if let Some(message) = config_message {
        log::info!("{message}");
    }

    let transport = HttpTransport::new(Duration::from_secs(config.request_timeout_secs));
    let data = DataService::new(
        Arc::new(transport),
        Box::new(StubSubmitter),
        config.endpoints.clone(),
    );
    let session = Session::new(data, storage::open_default_store(), config.page_count);

    let title = "eyes-annotate";
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_title(title),
        ..Default::default()
    };

    if let Err(e) = eframe::run_native(
        title,
        options,
        Box::new(move |_cc| Ok(Box::new(EyesApp::new(session)))),
    ) {
        log::error!("Application error: {e}");
        std::process::exit(1);
    }
}
