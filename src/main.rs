//! BioVis-RS - Main Entry Point
//!
//! Desktop recorder for EMG/ECG biosignals: connects to the acquisition
//! device, streams samples to a live waveform and spools them to a saveable
//! recording file.

use biovis_rs::{
    config::AppConfig, device::simulated_link_factory, frontend::BioVisApp,
    session::AcquisitionSession,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> eframe::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,biovis_rs=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting BioVis-RS");

    let config = AppConfig::load_or_default();

    let (session, events_rx) =
        AcquisitionSession::new(config.acquisition.clone(), simulated_link_factory());

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([900.0, 600.0])
            .with_min_inner_size([640.0, 420.0])
            .with_title("BioVis-RS"),
        ..Default::default()
    };

    eframe::run_native(
        "BioVis-RS",
        native_options,
        Box::new(|cc| Ok(Box::new(BioVisApp::new(cc, config, session, events_rx)))),
    )
}
