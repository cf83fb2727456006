//! Shared test infrastructure for integration tests

#![allow(dead_code)] // Test utilities may not all be used in every test file

use biovis_rs::device::{DeviceLink, LinkFactory};
use biovis_rs::error::{BioVisError, Result};
use biovis_rs::session::{AcquisitionSession, SessionEvent};
use biovis_rs::types::Frame;
use crossbeam_channel::Receiver;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// A device link driven by a pre-recorded script
///
/// Connects unless `fail_open` is set, then serves `batches` in order and
/// idles with empty batches once the script is exhausted.
pub struct ScriptedLink {
    batches: VecDeque<Vec<Frame>>,
    fail_open: Option<String>,
    open: bool,
    sampling: bool,
}

impl ScriptedLink {
    pub fn new(batches: Vec<Vec<Frame>>) -> Self {
        Self {
            batches: VecDeque::from(batches),
            fail_open: None,
            open: false,
            sampling: false,
        }
    }

    pub fn failing_open(message: &str) -> Self {
        Self {
            batches: VecDeque::new(),
            fail_open: Some(message.to_string()),
            open: false,
            sampling: false,
        }
    }
}

impl DeviceLink for ScriptedLink {
    fn open(&mut self, _address: &str, _rate_hz: u32) -> Result<()> {
        if let Some(message) = &self.fail_open {
            return Err(BioVisError::Connection(message.clone()));
        }
        self.open = true;
        Ok(())
    }

    fn start_sampling(&mut self, _channels: &[u8]) -> Result<()> {
        self.sampling = true;
        Ok(())
    }

    fn read_batch(&mut self, _n: usize) -> Result<Vec<Frame>> {
        match self.batches.pop_front() {
            Some(batch) => Ok(batch),
            None => {
                std::thread::sleep(Duration::from_millis(2));
                Ok(Vec::new())
            }
        }
    }

    fn stop_sampling(&mut self) -> Result<()> {
        self.sampling = false;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.open = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

/// Factory producing scripted links that serve no samples
pub fn idle_link_factory() -> LinkFactory {
    Box::new(|| Box::new(ScriptedLink::new(Vec::new())))
}

/// Build frames carrying one single-channel reading each
pub fn frames(values: &[u16]) -> Vec<Frame> {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| Frame::new(i as u16, vec![v]))
        .collect()
}

/// Drain events until one matches `pred`, applying each to the session
///
/// Panics after five seconds without a match.
pub fn wait_for<F>(
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
