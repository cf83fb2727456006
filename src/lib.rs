//! # BioVis-RS: Biosignal Acquisition Recorder
//!
//! A desktop recorder for EMG and ECG biosignals acquired over a Bluetooth
//! serial link. A single background reader thread pulls sample frames off the
//! device, spools them to an on-disk recording and feeds a live waveform;
//! the UI thread owns all session state transitions.
//!
//! ## Architecture
//!
//! - **Session**: The connect → acquire → stop state machine and its single
//!   background reader thread
//! - **Device**: The [`device::DeviceLink`] trait over the hardware, with a
//!   built-in signal simulator
//! - **Recording**: The streaming on-disk sink and the in-memory signal
//!   buffer behind the waveform
//! - **Frontend**: An eframe/egui single-window UI
//! - **Communication**: Crossbeam channels for marshaling background
//!   outcomes back to the UI thread
//!
//! ## Configuration
//!
//! Persistent settings (last device address, sampling rate, recording type,
//! acquisition tunables) are stored as TOML in the platform config directory
//! under `dev.biovis.biovis-rs`.
//!
//! ## Example
//!
//! ```ignore
//! use biovis_rs::{
//!     config::AppConfig,
//!     device::simulated_link_factory,
//!     frontend::BioVisApp,
//!     session::AcquisitionSession,
//! };
//!
//! fn main() -> eframe::Result<()> {
//!     let config = AppConfig::load_or_default();
//!     let (session, events_rx) =
//!         AcquisitionSession::new(config.acquisition.clone(), simulated_link_factory());
//!
//!     let native_options = eframe::NativeOptions::default();
//!     eframe::run_native(
//!         "BioVis-RS",
//!         native_options,
//!         Box::new(|cc| Ok(Box::new(BioVisApp::new(cc, config, session, events_rx)))),
//!     )
//! }
//! ```

pub mod config;
pub mod device;
pub mod error;
pub mod frontend;
pub mod recording;
pub mod session;
pub mod types;

// Re-export commonly used types
pub use config::{AcquisitionSettings, AppConfig};
pub use device::{DeviceLink, LinkFactory};
pub use error::{BioVisError, Result};
pub use frontend::BioVisApp;
pub use session::{AcquisitionSession, SessionEvent, StopReason};
pub use types::{Frame, RecordingType, SampleRecord, SamplingRate, SessionState};
