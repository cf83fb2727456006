//! Frontend module for BioVis-RS
//!
//! A single-window egui frontend: a control strip along the top, the live
//! waveform in the center and a scrolling session log at the bottom. All
//! session mutation happens here on the UI thread; background outcomes are
//! drained from the session event channel at the top of every frame and fed
//! back through [`AcquisitionSession::apply`] before anything is rendered.

pub mod controls;
pub mod waveform;

pub use controls::ControlSet;

use crate::config::AppConfig;
use crate::error::Result;
use crate::recording::SignalBuffer;
use crate::session::{AcquisitionSession, SessionEvent, StopReason};
use crate::types::{RecordingType, SamplingRate};
use crossbeam_channel::Receiver;
use std::sync::{Arc, Mutex, MutexGuard};

/// Upper bound on retained log lines; the oldest lines are discarded first
const MAX_LOG_LINES: usize = 2000;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// The main application
pub struct BioVisApp {
    config: AppConfig,
    session: AcquisitionSession,
    events_rx: Receiver<SessionEvent>,
    buffer: Arc<Mutex<SignalBuffer>>,

    address_input: String,
    sampling_rate: SamplingRate,
    recording_type: RecordingType,

    log: Vec<String>,
    log_follows_tail: bool,
}

impl BioVisApp {
    /// Create the application around an already-constructed session
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        config: AppConfig,
        session: AcquisitionSession,
        events_rx: Receiver<SessionEvent>,
    ) -> Self {
        let buffer = session.buffer();
        let mut app = Self {
            address_input: config.device_address.clone(),
            sampling_rate: config.sampling_rate,
            recording_type: config.recording_type,
            config,
            session,
            events_rx,
            buffer,
            log: Vec::new(),
            log_follows_tail: true,
        };
        app.log_line("Ready. Enter the device MAC address and connect.".to_string());
        app
    }

    fn log_line(&mut self, line: String) {
        self.log.push(line);
        if self.log.len() > MAX_LOG_LINES {
            let excess = self.log.len() - MAX_LOG_LINES;
            self.log.drain(..excess);
        }
        self.log_follows_tail = true;
    }

    /// Drain the session channel, applying outcomes before rendering
    ///
    /// Returns whether any event arrived this frame.
    fn process_session_events(&mut self) -> bool {
        let mut had_events = false;
        while let Ok(event) = self.events_rx.try_recv() {
            had_events = true;
            self.session.apply(&event);
            self.log_event(&event);
        }
        had_events
    }

    fn log_event(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::StateChanged(_) => {}
            SessionEvent::Connected => self.log_line("Connected!".to_string()),
            SessionEvent::ConnectionFailed(msg) => {
                self.log_line(format!("Connection error: {}", msg));
            }
            SessionEvent::AcquisitionStarted(kind) => {
                self.log_line(format!(
                    "Acquisition started on channel {} ({})",
                    kind.channel_name(),
                    kind.label()
                ));
            }
            SessionEvent::Samples(records) => {
                let kind = self.recording_type;
                for record in records {
                    self.log_line(format!(
                        "t=+{:.3}s | {}: {}",
                        record.elapsed_secs,
                        kind.label(),
                        record.value
                    ));
                }
            }
            SessionEvent::ReaderFinished(reason) => {
                let line = match reason {
                    StopReason::Requested => "Acquisition stopped.".to_string(),
                    StopReason::DurationCap => {
                        "Acquisition stopped: session duration cap reached.".to_string()
                    }
                    StopReason::DeviceFault(msg) => {
                        format!("Acquisition stopped: device fault: {}", msg)
                    }
                    StopReason::IoFault(msg) => {
                        format!("Acquisition stopped: recording fault: {}", msg)
                    }
                };
                self.log_line(line);
            }
            SessionEvent::Error(msg) => self.log_line(msg.clone()),
        }
    }

    fn on_connect(&mut self) {
        let address = self.address_input.clone();
        let rate = self.sampling_rate;
        self.log_line(format!("Connecting to {} at {}...", address.trim(), rate));
        if let Err(e) = self.session.connect(&address, rate) {
            self.log_line(e.to_string());
        }
    }

    fn on_start(&mut self) {
        if let Err(e) = self.session.start(self.recording_type) {
            self.log_line(e.to_string());
        }
    }

    fn on_stop(&mut self) {
        self.session.stop();
    }

    fn on_new_recording(&mut self) {
        self.session.new_recording();
        self.log_line("New recording ready".to_string());
    }

    fn on_save(&mut self) {
        let default_name = format!(
            "biosignal_recording-{}.txt",
            chrono::Local::now().format("%Y%m%d-%H%M%S")
        );
        let Some(dest) = rfd::FileDialog::new()
            .add_filter("Recording", &["txt"])
            .set_file_name(default_name)
            .save_file()
        else {
            return;
        };
        match self.export_to(&dest) {
            Ok(()) => self.log_line(format!("Recording saved to {}", dest.display())),
            Err(e) => self.log_line(format!("Error saving recording: {}", e)),
        }
    }

    fn export_to(&self, dest: &std::path::Path) -> Result<()> {
        self.session.export_recording(dest)
    }

    fn remember_selections(&mut self) {
        self.config.device_address = self.address_input.trim().to_string();
        self.config.sampling_rate = self.sampling_rate;
        self.config.recording_type = self.recording_type;
    }

    fn control_strip(&mut self, ui: &mut egui::Ui) {
        let controls = ControlSet::for_state(self.session.state(), self.session.has_recording());

        ui.horizontal(|ui| {
            ui.label("MAC address:");
            ui.add_enabled(
                controls.connect,
                egui::TextEdit::singleline(&mut self.address_input)
                    .hint_text("XX:XX:XX:XX:XX:XX")
                    .desired_width(160.0),
            );

            ui.add_enabled_ui(controls.connect, |ui| {
                egui::ComboBox::from_label("Rate")
                    .selected_text(self.sampling_rate.to_string())
                    .show_ui(ui, |ui| {
                        for rate in SamplingRate::ALL {
                            ui.selectable_value(&mut self.sampling_rate, rate, rate.to_string());
                        }
                    });
            });

            ui.add_enabled_ui(!self.session.is_running(), |ui| {
                egui::ComboBox::from_label("Signal")
                    .selected_text(self.recording_type.label())
                    .show_ui(ui, |ui| {
                        for kind in RecordingType::ALL {
                            ui.selectable_value(&mut self.recording_type, kind, kind.label());
                        }
                    });
            });
        });

        ui.horizontal(|ui| {
            if ui
                .add_enabled(controls.connect, egui::Button::new("Connect"))
                .clicked()
            {
                self.on_connect();
            }
            if ui
                .add_enabled(controls.start, egui::Button::new("Start"))
                .clicked()
            {
                self.on_start();
            }
            if ui
                .add_enabled(controls.stop, egui::Button::new("Stop"))
                .clicked()
            {
                self.on_stop();
            }
            if ui
                .add_enabled(controls.save, egui::Button::new("Save..."))
                .clicked()
            {
                self.on_save();
            }
            if ui
                .add_enabled(controls.new_recording, egui::Button::new("New"))
                .clicked()
            {
                self.on_new_recording();
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let state = self.session.state();
                let color = match state {
                    crate::types::SessionState::Disconnected => egui::Color32::GRAY,
                    crate::types::SessionState::Connecting => egui::Color32::YELLOW,
                    crate::types::SessionState::Connected => egui::Color32::GREEN,
                    crate::types::SessionState::Acquiring => egui::Color32::RED,
                    crate::types::SessionState::Stopped => egui::Color32::LIGHT_BLUE,
                };
                ui.colored_label(color, state.display_name());
                if state == crate::types::SessionState::Connecting {
                    ui.spinner();
                }
            });
        });
    }

    fn log_panel(&mut self, ui: &mut egui::Ui) {
        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .stick_to_bottom(self.log_follows_tail)
            .show(ui, |ui| {
                for line in &self.log {
                    ui.monospace(line);
                }
            });
        self.log_follows_tail = false;
    }
}

impl eframe::App for BioVisApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let had_events = self.process_session_events();

        if self.session.is_running() || had_events {
            ctx.request_repaint();
        }

        egui::TopBottomPanel::top("controls").show(ctx, |ui| {
            ui.add_space(4.0);
            self.control_strip(ui);
            ui.add_space(4.0);
        });

        egui::TopBottomPanel::bottom("session_log")
            .resizable(true)
            .default_height(140.0)
            .show(ctx, |ui| {
                self.log_panel(ui);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            let buffer = lock(&self.buffer);
            waveform::draw(ui, &buffer);
        });
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.session.shutdown();
        self.remember_selections();
        if let Err(e) = self.config.save() {
            tracing::warn!("Failed to save config: {}", e);
        }
    }
}
