//! GUI implementation with egui/eframe
//!
//! This module provides the desktop user interface for Murmur using the eframe framework.

mod app;
pub mod components;
mod state;
mod theme;
mod typewriter;

pub use app::MurmurApp;
pub use state::{AppState, Route, Services, SettingsForm};
pub use theme::Theme;
pub use typewriter::Typewriter;

use crate::integration::IntegrationConfig;

/// Run the Murmur application
pub fn run(config: IntegrationConfig, services: Services) -> eframe::Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1000.0, 720.0])
            .with_min_inner_size([640.0, 420.0])
            .with_title("Murmur"),
        ..Default::default()
    };

    eframe::run_native(
        "Murmur",
        options,
        Box::new(move |cc| {
            let state = AppState::new(&config, services)?;
            Ok(Box::new(MurmurApp::new(cc, state)))
        }),
    )
}
