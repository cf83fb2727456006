//! Acquisition session state machine
//!
//! This module contains the core of the application: a small state machine
//! that drives the device link, the recording sink and the signal buffer
//! through one connect → acquire → stop episode, and owns the single
//! background reader thread.
//!
//! # Concurrency discipline
//!
//! - All state transitions happen on the foreground (UI) thread. Work that
//!   must happen off-thread (device open, batch reads) reports back through
//!   a crossbeam channel; the foreground thread applies the outcome via
//!   [`AcquisitionSession::apply`] before any state changes.
//! - At most one background reader exists per acquiring episode. The
//!   cancellation flag is an `AtomicBool`; it is the only datum shared
//!   without a lock.
//! - [`AcquisitionSession::stop`] is a blocking join: it does not return
//!   until the reader has fully exited, so a subsequent `start` can never
//!   race a stale reader against the same device link. Reader-exit latency
//!   is bounded by one blocking batch read.
//! - The reader appends to the sink and the buffer in strict arrival order;
//!   the per-sample log surface is batched over the event channel and may be
//!   rate-limited, but never reordered.

use crate::config::AcquisitionSettings;
use crate::device::{DeviceLink, LinkFactory};
use crate::error::{BioVisError, Result};
use crate::recording::{SampleSink, SignalBuffer};
use crate::types::{RecordingType, SampleRecord, SamplingRate, SessionState};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Capacity of the session event channel
const EVENT_QUEUE_CAPACITY: usize = 4096;

/// Device link shared between the foreground thread and the reader
type SharedLink = Arc<Mutex<Box<dyn DeviceLink>>>;

/// Lock a mutex, recovering the guard if a panicking thread poisoned it
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Why the background reader exited
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// A foreground `stop` set the cancellation flag
    Requested,
    /// The session duration cap elapsed
    DurationCap,
    /// A device read failed
    DeviceFault(String),
    /// Writing to the recording sink failed; the recording is incomplete
    IoFault(String),
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::Requested => write!(f, "stop requested"),
            StopReason::DurationCap => write!(f, "session duration cap reached"),
            StopReason::DeviceFault(msg) => write!(f, "device fault: {}", msg),
            StopReason::IoFault(msg) => write!(f, "recording fault: {}", msg),
        }
    }
}

/// Events published by the session to the log/observer surface
///
/// Events that carry a state outcome (`Connected`, `ConnectionFailed`,
/// `ReaderFinished`) must be fed back into
/// [`AcquisitionSession::apply`] on the foreground thread; the rest are
/// informational.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The session entered a new state
    StateChanged(SessionState),
    /// Background device open succeeded
    Connected,
    /// Background device open failed
    ConnectionFailed(String),
    /// Acquisition started on the given recording type's channel
    AcquisitionStarted(RecordingType),
    /// A batch of samples, in arrival order
    Samples(Vec<SampleRecord>),
    /// The background reader exited
    ReaderFinished(StopReason),
    /// A reported, non-fatal failure
    Error(String),
}

/// The acquisition session: one connect → acquire → stop episode at a time
pub struct AcquisitionSession {
    state: SessionState,
    link: SharedLink,
    factory: LinkFactory,
    buffer: Arc<Mutex<SignalBuffer>>,
    sink: Option<Arc<Mutex<SampleSink>>>,
    events_tx: Sender<SessionEvent>,
    cancel: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
    device_address: Option<String>,
    sampling_rate: Option<SamplingRate>,
    recording_type: Option<RecordingType>,
    duration_cap: Duration,
    block_size: usize,
}

impl AcquisitionSession {
    /// Create a session whose initial link comes from `factory`
    pub fn new(settings: AcquisitionSettings, factory: LinkFactory) -> (Self, Receiver<SessionEvent>) {
        let link = factory();
        Self::with_link(settings, link, factory)
    }

    /// Create a session around an explicit initial link
    ///
    /// Used by tests to inject mock links; `factory` still supplies the
    /// replacement link for `new_recording`.
    pub fn with_link(
        settings: AcquisitionSettings,
        link: Box<dyn DeviceLink>,
        factory: LinkFactory,
    ) -> (Self, Receiver<SessionEvent>) {
        let (events_tx, events_rx) = bounded(EVENT_QUEUE_CAPACITY);
        let session = Self {
            state: SessionState::Disconnected,
            link: Arc::new(Mutex::new(link)),
            factory,
            buffer: Arc::new(Mutex::new(SignalBuffer::new())),
            sink: None,
            events_tx,
            cancel: Arc::new(AtomicBool::new(false)),
            reader: None,
            device_address: None,
            sampling_rate: None,
            recording_type: None,
            duration_cap: settings.max_duration(),
            block_size: settings.read_block_size.max(1),
        };
        (session, events_rx)
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether a background reader is currently producing samples
    pub fn is_running(&self) -> bool {
        self.state.is_acquiring()
    }

    /// The signal buffer consumed by the waveform rendering
    pub fn buffer(&self) -> Arc<Mutex<SignalBuffer>> {
        Arc::clone(&self.buffer)
    }

    /// Sampling rate fixed at connect time, if any
    pub fn sampling_rate(&self) -> Option<SamplingRate> {
        self.sampling_rate
    }

    /// Override the session duration cap (defaults from the config)
    pub fn set_duration_cap(&mut self, cap: Duration) {
        self.duration_cap = cap;
    }

    /// Whether a finalized, exportable recording exists
    pub fn has_recording(&self) -> bool {
        self.sink
            .as_ref()
            .map(|s| lock(s).is_finalized())
            .unwrap_or(false)
    }

    /// Copy the finalized recording to `dest`, overwriting any existing file
    pub fn export_recording(&self, dest: &Path) -> Result<()> {
        let sink = self.sink.as_ref().ok_or_else(|| {
            BioVisError::Recording("no recording available to save".to_string())
        })?;
        lock(sink).export(dest)
    }

    /// Begin connecting to the device at `address` with `rate`
    ///
    /// Input is validated before any device interaction; on success the
    /// session enters `Connecting` and the open runs on a short-lived
    /// background thread whose outcome arrives as [`SessionEvent::Connected`]
    /// or [`SessionEvent::ConnectionFailed`].
    pub fn connect(&mut self, address: &str, rate: SamplingRate) -> Result<()> {
        if self.state != SessionState::Disconnected {
            return Err(BioVisError::InvalidInput(format!(
                "Cannot connect while {}.",
                self.state
            )));
        }
        let address = address.trim();
        if address.is_empty() {
            return Err(BioVisError::InvalidInput(
                "Please enter the MAC address.".to_string(),
            ));
        }

        self.device_address = Some(address.to_string());
        self.sampling_rate = Some(rate);
        self.set_state(SessionState::Connecting);

        let link = Arc::clone(&self.link);
        let events = self.events_tx.clone();
        let address = address.to_string();
        let hz = rate.hz();
        std::thread::spawn(move || {
            let result = lock(&link).open(&address, hz);
            let event = match result {
                Ok(()) => {
                    tracing::info!("Connected to {} at {} Hz", address, hz);
                    SessionEvent::Connected
                }
                Err(e) => {
                    tracing::error!("Connection to {} failed: {}", address, e);
                    SessionEvent::ConnectionFailed(e.to_string())
                }
            };
            let _ = events.send(event);
        });

        Ok(())
    }

    /// Start acquiring on the channel selected by `kind`
    ///
    /// Requires `Connected`. Allocates the recording sink, writes the
    /// sampling-rate header, starts device sampling and spawns exactly one
    /// background reader; the session is `Acquiring` when this returns.
    pub fn start(&mut self, kind: RecordingType) -> Result<()> {
        match self.state {
            SessionState::Connected => {}
            SessionState::Acquiring => {
                return Err(BioVisError::InvalidInput(
                    "Acquisition is already running.".to_string(),
                ));
            }
            _ => {
                return Err(BioVisError::InvalidInput(
                    "Start requires a connected device.".to_string(),
                ));
            }
        }
        // stop() joins before clearing Acquiring, so no reader can survive
        // into this call
        debug_assert!(self.reader.is_none());

        let rate = self.sampling_rate.ok_or_else(|| {
            BioVisError::InvalidInput("No sampling rate configured.".to_string())
        })?;

        let sink = Arc::new(Mutex::new(SampleSink::create(rate.hz())?));
        let channel = kind.channel();
        lock(&self.link).start_sampling(&[channel])?;

        self.sink = Some(Arc::clone(&sink));
        self.recording_type = Some(kind);
        self.cancel.store(false, Ordering::SeqCst);

        let ctx = ReaderContext {
            link: Arc::clone(&self.link),
            sink,
            buffer: Arc::clone(&self.buffer),
            events: self.events_tx.clone(),
            cancel: Arc::clone(&self.cancel),
            block_size: self.block_size,
            duration_cap: self.duration_cap,
            started_at: Instant::now(),
        };
        self.reader = Some(std::thread::spawn(move || run_reader(ctx)));

        tracing::info!("Acquisition started on channel {}", kind.channel_name());
        self.set_state(SessionState::Acquiring);
        self.emit(SessionEvent::AcquisitionStarted(kind));
        Ok(())
    }

    /// Stop the acquisition
    ///
    /// Sets the cancellation flag and **blocks until the reader thread has
    /// exited**, then stops device sampling and finalizes the recording.
    /// Idempotent: a no-op outside `Acquiring`. Device stop failures are
    /// reported but never leave the session stuck acquiring.
    pub fn stop(&mut self) {
        if self.state != SessionState::Acquiring {
            return;
        }
        self.cancel.store(true, Ordering::SeqCst);
        if let Some(handle) = self.reader.take() {
            // Join semantics: no reader is active once stop() returns
            if handle.join().is_err() {
                tracing::error!("Reader thread panicked");
                self.emit(SessionEvent::Error("Reader thread panicked".to_string()));
            }
        }
        self.halt_device_sampling();
        self.finalize_sink();
        self.set_state(SessionState::Stopped);
    }

    /// Apply a marshaled event outcome on the foreground thread
    ///
    /// Must be called for every event drained from the session channel
    /// before acting on the session; informational events are ignored.
    pub fn apply(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::Connected => {
                if self.state == SessionState::Connecting {
                    self.set_state(SessionState::Connected);
                }
            }
            SessionEvent::ConnectionFailed(_) => {
                if self.state == SessionState::Connecting {
                    self.device_address = None;
                    self.sampling_rate = None;
                    self.set_state(SessionState::Disconnected);
                }
            }
            SessionEvent::ReaderFinished(_) => self.finish_autonomous_stop(),
            _ => {}
        }
    }

    /// Reconcile session state after the reader stopped on its own
    /// (duration cap or read failure)
    fn finish_autonomous_stop(&mut self) {
        let Some(handle) = self.reader.take() else {
            // A foreground stop() already joined and cleaned up
            return;
        };
        if handle.join().is_err() {
            tracing::error!("Reader thread panicked");
            self.emit(SessionEvent::Error("Reader thread panicked".to_string()));
        }
        self.halt_device_sampling();
        self.finalize_sink();
        self.set_state(SessionState::Stopped);
    }

    /// Reset for a fresh recording
    ///
    /// Forces a stop if still acquiring, closes and replaces the device
    /// link, clears the signal buffer and drops the recording handle. The
    /// session is `Disconnected` afterwards and must go through a fresh
    /// `connect`.
    pub fn new_recording(&mut self) {
        self.stop();
        self.close_device();
        // The old handle is fully closed before the replacement exists
        *lock(&self.link) = (self.factory)();
        lock(&self.buffer).clear();
        self.sink = None;
        self.device_address = None;
        self.sampling_rate = None;
        self.recording_type = None;
        self.cancel.store(false, Ordering::SeqCst);
        self.set_state(SessionState::Disconnected);
        tracing::info!("Session reset for a new recording");
    }

    /// Terminal cleanup at application shutdown: force stop, close the link
    pub fn shutdown(&mut self) {
        self.stop();
        self.close_device();
        tracing::info!("Session shut down");
    }

    fn halt_device_sampling(&mut self) {
        if let Err(e) = lock(&self.link).stop_sampling() {
            tracing::warn!("Failed to stop device sampling: {}", e);
            self.emit(SessionEvent::Error(format!(
                "Error stopping acquisition: {}",
                e
            )));
        }
    }

    /// Finalize the sink; idempotent after the reader's own finalize
    fn finalize_sink(&mut self) {
        if let Some(sink) = &self.sink {
            if let Err(e) = lock(sink).finalize() {
                tracing::warn!("Failed to finalize recording: {}", e);
                self.emit(SessionEvent::Error(format!(
                    "Error finalizing recording: {}",
                    e
                )));
            }
        }
    }

    fn close_device(&mut self) {
        let mut link = lock(&self.link);
        if !link.is_open() {
            return;
        }
        if let Err(e) = link.close() {
            tracing::warn!("Failed to close device: {}", e);
            drop(link);
            self.emit(SessionEvent::Error(format!("Error closing device: {}", e)));
        }
    }

    fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            tracing::debug!("Session state: {} -> {}", self.state, state);
            self.state = state;
            self.emit(SessionEvent::StateChanged(state));
        }
    }

    /// Informational events never block the foreground thread; under
    /// backpressure they are dropped, not reordered
    fn emit(&self, event: SessionEvent) {
        let _ = self.events_tx.try_send(event);
    }
}

impl Drop for AcquisitionSession {
    fn drop(&mut self) {
        // A live reader must never outlast the session
        self.cancel.store(true, Ordering::SeqCst);
        if let Some(handle) = self.reader.take() {
            let _ = handle.join();
        }
    }
}

/// Everything the background reader needs, moved into its thread
struct ReaderContext {
    link: SharedLink,
    sink: Arc<Mutex<SampleSink>>,
    buffer: Arc<Mutex<SignalBuffer>>,
    events: Sender<SessionEvent>,
    cancel: Arc<AtomicBool>,
    block_size: usize,
    duration_cap: Duration,
    started_at: Instant,
}

/// Background reader entry point
///
/// Runs the batch-read loop, then performs the guaranteed cleanup sequence:
/// finalize the sink (whatever the exit reason) and report the exit so the
/// foreground thread can reconcile.
fn run_reader(ctx: ReaderContext) {
    let reason = read_loop(&ctx);

    // Guaranteed-cleanup path: the recording file gets its trailing newline
    // and flush exactly once, even after a mid-stream failure
    if let Err(e) = lock(&ctx.sink).finalize() {
        tracing::warn!("Failed to finalize recording: {}", e);
        let _ = ctx
            .events
            .send(SessionEvent::Error(format!("Error finalizing recording: {}", e)));
    }

    tracing::info!("Acquisition stopped ({})", reason);
    let _ = ctx.events.send(SessionEvent::ReaderFinished(reason));
}

/// The batch-read loop; returns why it exited
fn read_loop(ctx: &ReaderContext) -> StopReason {
    loop {
        // The flag is checked between batch reads only; a blocking read in
        // flight finishes delivering its batch first
        if ctx.cancel.load(Ordering::SeqCst) {
            return StopReason::Requested;
        }
        if ctx.started_at.elapsed() >= ctx.duration_cap {
            return StopReason::DurationCap;
        }

        let frames = match lock(&ctx.link).read_batch(ctx.block_size) {
            Ok(frames) => frames,
            Err(e) => {
                // Surface once and exit; never spin silently on a dead link
                tracing::error!("Device read failed: {}", e);
                let _ = ctx
                    .events
                    .send(SessionEvent::Error(format!("Error during acquisition: {}", e)));
                return StopReason::DeviceFault(e.to_string());
            }
        };

        let mut records = Vec::with_capacity(frames.len());
        {
            let mut sink = lock(&ctx.sink);
            let mut buffer = lock(&ctx.buffer);
            for frame in &frames {
                // The link was started with exactly the selected channel, so
                // its reading is first in the frame
                let Some(value) = frame.channel(0) else {
                    let msg = format!("frame {} missing selected channel", frame.seq);
                    tracing::error!("{}", msg);
                    let _ = ctx
                        .events
                        .send(SessionEvent::Error(format!("Error during acquisition: {}", msg)));
                    return StopReason::DeviceFault(msg);
                };
                if let Err(e) = sink.append(value) {
                    tracing::error!("Recording write failed: {}", e);
                    let _ = ctx
                        .events
                        .send(SessionEvent::Error(format!("Error during acquisition: {}", e)));
                    return StopReason::IoFault(e.to_string());
                }
                buffer.push(value);
                records.push(SampleRecord::new(
                    ctx.started_at.elapsed().as_secs_f64(),
                    value,
                ));
            }
        }

        // Log surface is best-effort and batched; sink and buffer above are
        // the ordered, lossless consumers
        if !records.is_empty() {
            let _ = ctx.events.try_send(SessionEvent::Samples(records));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{simulated_link_factory, MockDeviceLink};
    use crate::types::Frame;

    fn test_settings() -> AcquisitionSettings {
        AcquisitionSettings {
            max_duration_secs: 120,
            read_block_size: 5,
        }
    }

    fn session_with(mock: MockDeviceLink) -> (AcquisitionSession, Receiver<SessionEvent>) {
        AcquisitionSession::with_link(test_settings(), Box::new(mock), simulated_link_factory())
    }

    /// Drain events until one matches, applying each to the session
    fn wait_for<F>(
        session: &mut AcquisitionSession,
        rx: &Receiver<SessionEvent>,
        mut pred: F,
    ) -> SessionEvent
    where
        F: FnMut(&SessionEvent) -> bool,
    {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let remaining = deadline
                .checked_duration_since(Instant::now())
                .expect("timed out waiting for session event");
            let event = rx.recv_timeout(remaining).expect("event channel closed");
            session.apply(&event);
            if pred(&event) {
                return event;
            }
        }
    }

    fn connect_ok(session: &mut AcquisitionSession, rx: &Receiver<SessionEvent>) {
        session
            .connect("98:D3:91:FD:69:49", SamplingRate::Hz100)
            .unwrap();
        wait_for(session, rx, |e| matches!(e, SessionEvent::Connected));
        assert_eq!(session.state(), SessionState::Connected);
    }

    /// Mock that connects and then delivers `batches` in order, idling with
    /// empty batches afterwards
    fn scripted_mock(batches: Vec<Vec<Frame>>) -> MockDeviceLink {
        let mut mock = MockDeviceLink::new();
        mock.expect_open().returning(|_, _| Ok(()));
        mock.expect_start_sampling().returning(|_| Ok(()));
        let queue = Mutex::new(std::collections::VecDeque::from(batches));
        mock.expect_read_batch().returning(move |_| {
            let next = lock(&queue).pop_front();
            match next {
                Some(batch) => Ok(batch),
                None => {
                    std::thread::sleep(Duration::from_millis(2));
                    Ok(Vec::new())
                }
            }
        });
        mock.expect_stop_sampling().returning(|| Ok(()));
        mock.expect_close().returning(|| Ok(()));
        mock.expect_is_open().return_const(true);
        mock
    }

    #[test]
    fn test_connect_rejects_empty_address() {
        let (mut session, _rx) = session_with(MockDeviceLink::new());
        let err = session.connect("", SamplingRate::Hz100).unwrap_err();
        assert_eq!(err.to_string(), "Please enter the MAC address.");
        assert_eq!(session.state(), SessionState::Disconnected);
    }

    #[test]
    fn test_connect_failure_returns_to_disconnected() {
        let mut mock = MockDeviceLink::new();
        mock.expect_open()
            .withf(|addr, hz| addr == "AA:BB:CC:DD:EE:FF" && *hz == 100)
            .times(1)
            .returning(|_, _| Err(BioVisError::Connection("Connection failed".to_string())));

        let (mut session, rx) = session_with(mock);
        session
            .connect("AA:BB:CC:DD:EE:FF", SamplingRate::Hz100)
            .unwrap();
        assert_eq!(session.state(), SessionState::Connecting);

        let event = wait_for(&mut session, &rx, |e| {
            matches!(e, SessionEvent::ConnectionFailed(_))
        });
        if let SessionEvent::ConnectionFailed(msg) = event {
            assert!(msg.contains("Connection failed"));
        }
        assert_eq!(session.state(), SessionState::Disconnected);
    }

    #[test]
    fn test_connect_success_reaches_connected() {
        let mut mock = MockDeviceLink::new();
        mock.expect_open().times(1).returning(|_, _| Ok(()));
        mock.expect_is_open().return_const(true);
        mock.expect_close().returning(|| Ok(()));

        let (mut session, rx) = session_with(mock);
        connect_ok(&mut session, &rx);
    }

    #[test]
    fn test_start_requires_connected() {
        let (mut session, _rx) = session_with(MockDeviceLink::new());
        let err = session.start(RecordingType::Emg).unwrap_err();
        assert!(matches!(err, BioVisError::InvalidInput(_)));
        assert_eq!(session.state(), SessionState::Disconnected);
    }

    #[test]
    fn test_start_emg_samples_channel_zero() {
        let mut mock = MockDeviceLink::new();
        mock.expect_open().returning(|_, _| Ok(()));
        mock.expect_start_sampling()
            .withf(|channels| channels == [0])
            .times(1)
            .returning(|_| Ok(()));
        mock.expect_read_batch().returning(|_| {
            std::thread::sleep(Duration::from_millis(2));
            Ok(Vec::new())
        });
        mock.expect_stop_sampling().times(1).returning(|| Ok(()));
        mock.expect_is_open().return_const(true);
        mock.expect_close().returning(|| Ok(()));

        let (mut session, rx) = session_with(mock);
        connect_ok(&mut session, &rx);

        session.start(RecordingType::Emg).unwrap();
        assert!(session.is_running());
        assert_eq!(session.state(), SessionState::Acquiring);

        session.stop();
        assert!(!session.is_running());
        assert_eq!(session.state(), SessionState::Stopped);
    }

    #[test]
    fn test_second_start_is_rejected() {
        let mock = scripted_mock(Vec::new());
        let (mut session, rx) = session_with(mock);
        connect_ok(&mut session, &rx);

        session.start(RecordingType::Emg).unwrap();
        let err = session.start(RecordingType::Emg).unwrap_err();
        assert!(matches!(err, BioVisError::InvalidInput(_)));
        session.stop();
    }

    #[test]
    fn test_samples_flow_to_sink_and_buffer_in_order() {
        let frames = vec![
            Frame::new(0, vec![10]),
            Frame::new(1, vec![20]),
            Frame::new(2, vec![30]),
        ];
        let mock = scripted_mock(vec![frames]);
        let (mut session, rx) = session_with(mock);
        connect_ok(&mut session, &rx);

        session.start(RecordingType::Emg).unwrap();

        // Wait until all three samples arrived, then stop
        let deadline = Instant::now() + Duration::from_secs(5);
        while lock(&session.buffer()).len() < 3 {
            assert!(Instant::now() < deadline, "samples never arrived");
            std::thread::sleep(Duration::from_millis(2));
        }
        session.stop();

        assert_eq!(lock(&session.buffer()).snapshot(), vec![10, 20, 30]);
        assert!(session.has_recording());

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("recording.txt");
        session.export_recording(&dest).unwrap();
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "100\n10,20,30\n");
    }

    #[test]
    fn test_stop_then_start_never_runs_two_readers() {
        // Both the initial link and the reset replacement come from mocks so
        // the whole restart path runs against the mock contract
        let factory: crate::device::LinkFactory =
            Box::new(|| Box::new(scripted_mock(Vec::new())));
        let (mut session, rx) = AcquisitionSession::new(test_settings(), factory);

        connect_ok(&mut session, &rx);
        session.start(RecordingType::Emg).unwrap();
        session.stop();
        // stop() joined the reader, so reopening through the reset path can
        // never race a stale reader against the link
        assert_eq!(session.state(), SessionState::Stopped);

        session.new_recording();
        assert_eq!(session.state(), SessionState::Disconnected);
        connect_ok(&mut session, &rx);
        session.start(RecordingType::Emg).unwrap();
        session.stop();
        assert_eq!(session.state(), SessionState::Stopped);
    }

    #[test]
    fn test_duration_cap_stops_autonomously() {
        let mock = scripted_mock(vec![vec![Frame::new(0, vec![100])]]);
        let (mut session, rx) = session_with(mock);
        session.set_duration_cap(Duration::from_millis(50));
        connect_ok(&mut session, &rx);

        session.start(RecordingType::Emg).unwrap();
        let event = wait_for(&mut session, &rx, |e| {
            matches!(e, SessionEvent::ReaderFinished(_))
        });
        assert!(matches!(
            event,
            SessionEvent::ReaderFinished(StopReason::DurationCap)
        ));

        // No explicit stop() call: the session reconciled itself
        assert_eq!(session.state(), SessionState::Stopped);
        assert!(session.has_recording());

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("capped.txt");
        session.export_recording(&dest).unwrap();
        assert!(std::fs::read_to_string(&dest).unwrap().ends_with('\n'));
    }

    #[test]
    fn test_read_failure_surfaces_once_and_stops() {
        let mut mock = MockDeviceLink::new();
        mock.expect_open().returning(|_, _| Ok(()));
        mock.expect_start_sampling().returning(|_| Ok(()));
        mock.expect_read_batch()
            .times(1)
            .returning(|_| Err(BioVisError::Device("link dropped".to_string())));
        mock.expect_stop_sampling().returning(|| Ok(()));
        mock.expect_is_open().return_const(true);
        mock.expect_close().returning(|| Ok(()));

        let (mut session, rx) = session_with(mock);
        connect_ok(&mut session, &rx);
        session.start(RecordingType::Emg).unwrap();

        let event = wait_for(&mut session, &rx, |e| {
            matches!(e, SessionEvent::ReaderFinished(_))
        });
        assert!(matches!(
            event,
            SessionEvent::ReaderFinished(StopReason::DeviceFault(_))
        ));
        assert_eq!(session.state(), SessionState::Stopped);
        // The recording is still well-formed
        assert!(session.has_recording());
    }

    #[test]
    fn test_stop_failure_still_reaches_stopped() {
        let mut mock = MockDeviceLink::new();
        mock.expect_open().returning(|_, _| Ok(()));
        mock.expect_start_sampling().returning(|_| Ok(()));
        mock.expect_read_batch().returning(|_| {
            std::thread::sleep(Duration::from_millis(2));
            Ok(Vec::new())
        });
        mock.expect_stop_sampling()
            .returning(|| Err(BioVisError::Device("stop refused".to_string())));
        mock.expect_is_open().return_const(true);
        mock.expect_close().returning(|| Ok(()));

        let (mut session, rx) = session_with(mock);
        connect_ok(&mut session, &rx);
        session.start(RecordingType::Emg).unwrap();
        session.stop();

        // Cleanup completes despite the device-level failure
        assert_eq!(session.state(), SessionState::Stopped);
        assert!(session.has_recording());
    }

    #[test]
    fn test_new_recording_resets_everything() {
        let frames = vec![Frame::new(0, vec![77])];
        let mock = scripted_mock(vec![frames]);
        let (mut session, rx) = session_with(mock);
        connect_ok(&mut session, &rx);
        session.start(RecordingType::Ecg).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while lock(&session.buffer()).is_empty() {
            assert!(Instant::now() < deadline, "samples never arrived");
            std::thread::sleep(Duration::from_millis(2));
        }

        session.new_recording();

        assert_eq!(session.state(), SessionState::Disconnected);
        assert!(!session.is_running());
        assert!(lock(&session.buffer()).is_empty());
        assert!(!session.has_recording());
        assert!(session.sampling_rate().is_none());
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mock = scripted_mock(Vec::new());
        let (mut session, rx) = session_with(mock);
        connect_ok(&mut session, &rx);
        session.start(RecordingType::Emg).unwrap();
        session.stop();
        session.stop();
        session.stop();
        assert_eq!(session.state(), SessionState::Stopped);
    }
}
