//! Core data types shared between the session, the device link and the frontend
//!
//! # Main Types
//!
//! - [`SessionState`] - The acquisition session state machine states
//! - [`SamplingRate`] - The fixed set of supported device sampling rates
//! - [`RecordingType`] - Which biosignal is recorded (maps to an analog channel)
//! - [`Frame`] - One decoded multi-channel reading from the device
//! - [`SampleRecord`] - One timestamped sample produced during acquisition

use serde::{Deserialize, Serialize};

/// Maximum value producible by the device ADC (10-bit resolution)
pub const ADC_MAX: u16 = 1023;

/// States of the acquisition session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// No device link open
    Disconnected,
    /// A device open is in flight on a background thread
    Connecting,
    /// Link open, no acquisition running
    Connected,
    /// Background reader active, samples flowing
    Acquiring,
    /// Acquisition finished, recording finalized and saveable
    Stopped,
}

impl SessionState {
    /// Display name for status bars and logs
    pub fn display_name(&self) -> &'static str {
        match self {
            SessionState::Disconnected => "Disconnected",
            SessionState::Connecting => "Connecting",
            SessionState::Connected => "Connected",
            SessionState::Acquiring => "Acquiring",
            SessionState::Stopped => "Stopped",
        }
    }

    /// Whether a background reader may exist in this state
    pub fn is_acquiring(&self) -> bool {
        matches!(self, SessionState::Acquiring)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Supported device sampling rates
///
/// The device only accepts a fixed set of rates, so this is an enum rather
/// than a free integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SamplingRate {
    /// 10 samples per second
    Hz10,
    /// 100 samples per second
    Hz100,
    /// 1000 samples per second
    Hz1000,
}

impl SamplingRate {
    /// All selectable rates, in UI order
    pub const ALL: [SamplingRate; 3] =
        [SamplingRate::Hz10, SamplingRate::Hz100, SamplingRate::Hz1000];

    /// The rate in Hz as passed to the device link
    pub fn hz(&self) -> u32 {
        match self {
            SamplingRate::Hz10 => 10,
            SamplingRate::Hz100 => 100,
            SamplingRate::Hz1000 => 1000,
        }
    }

    /// Parse a rate in Hz back into the enum
    pub fn from_hz(hz: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|r| r.hz() == hz)
    }
}

impl Default for SamplingRate {
    fn default() -> Self {
        SamplingRate::Hz100
    }
}

impl std::fmt::Display for SamplingRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} Hz", self.hz())
    }
}

/// The kind of biosignal being recorded
///
/// Each recording type maps to a fixed analog channel on the device front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordingType {
    /// Electromyography, acquired on channel A1 (index 0)
    Emg,
    /// Electrocardiography, acquired on channel A2 (index 1)
    Ecg,
}

impl RecordingType {
    /// All selectable recording types, in UI order
    pub const ALL: [RecordingType; 2] = [RecordingType::Emg, RecordingType::Ecg];

    /// The analog channel index sampled for this recording type
    pub fn channel(&self) -> u8 {
        match self {
            RecordingType::Emg => 0,
            RecordingType::Ecg => 1,
        }
    }

    /// Short label used in the type selector and logs
    pub fn label(&self) -> &'static str {
        match self {
            RecordingType::Emg => "EMG",
            RecordingType::Ecg => "ECG",
        }
    }

    /// Human-readable channel name (channels are 1-based on the hardware)
    pub fn channel_name(&self) -> String {
        format!("A{}", self.channel() + 1)
    }
}

impl Default for RecordingType {
    fn default() -> Self {
        RecordingType::Emg
    }
}

impl std::fmt::Display for RecordingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One decoded reading delivered by the device link
///
/// Contains one value per channel requested in `start_sampling`, in request
/// order. Values are bounded by the hardware ADC resolution (`0..=ADC_MAX`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Device-side sequence number, wraps at the protocol width
    pub seq: u16,
    /// Analog readings, one per requested channel
    pub analog: Vec<u16>,
}

impl Frame {
    /// Create a frame from a sequence number and channel readings
    pub fn new(seq: u16, analog: Vec<u16>) -> Self {
        Self { seq, analog }
    }

    /// Reading at `index` within the requested channel set
    pub fn channel(&self, index: usize) -> Option<u16> {
        self.analog.get(index).copied()
    }
}

/// One sample as produced by the acquisition session
///
/// Forwarded to the recording sink (value only), the signal buffer (value),
/// and the log surface (both fields).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleRecord {
    /// Seconds elapsed since acquisition start
    pub elapsed_secs: f64,
    /// Raw ADC value of the selected channel
    pub value: u16,
}

impl SampleRecord {
    /// Create a sample record
    pub fn new(elapsed_secs: f64, value: u16) -> Self {
        Self { elapsed_secs, value }
    }
}
