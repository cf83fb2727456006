//! Simulated device link
//!
//! Generates synthetic EMG/ECG waveforms so the application can run without
//! acquisition hardware. The link honors the full [`DeviceLink`] contract:
//! operations fail when called out of order, `read_batch` blocks for the
//! time the real device would need to fill the requested batch, and frames
//! carry one reading per requested channel in request order.

use super::DeviceLink;
use crate::error::{BioVisError, Result};
use crate::types::{Frame, ADC_MAX};
use std::time::{Duration, Instant};

/// ADC midpoint used as the signal baseline
const BASELINE: f64 = 512.0;

/// Simple pseudo-random number generator (no external dependency)
fn rand_simple() -> f64 {
    use std::cell::Cell;
    thread_local! {
        static SEED: Cell<u64> = const { Cell::new(0x5eed_b10_51611a1) };
    }
    SEED.with(|seed| {
        let mut s = seed.get();
        s ^= s << 13;
        s ^= s >> 7;
        s ^= s << 17;
        seed.set(s);
        (s as f64) / (u64::MAX as f64)
    })
}

/// A device link backed by synthetic waveform generators
pub struct SimulatedLink {
    /// Sampling rate configured at open, `None` while closed
    rate_hz: Option<u32>,
    /// Channels configured at start, `None` while idle
    channels: Option<Vec<u8>>,
    /// Device-side sequence counter
    seq: u16,
    /// Sample clock: samples produced since sampling started
    produced: u64,
    /// When sampling started, for read pacing
    started_at: Option<Instant>,
}

impl SimulatedLink {
    /// Create a closed simulated link
    pub fn new() -> Self {
        Self {
            rate_hz: None,
            channels: None,
            seq: 0,
            produced: 0,
            started_at: None,
        }
    }

    /// Synthetic EMG: baseline noise with periodic contraction bursts
    fn emg_sample(&self, t: f64) -> u16 {
        let burst = if (t % 4.0) < 1.2 { 180.0 } else { 18.0 };
        let noise = (rand_simple() - 0.5) * 2.0 * burst;
        clamp_adc(BASELINE + noise)
    }

    /// Synthetic ECG: flat baseline with a sharp QRS-like spike each beat
    fn ecg_sample(&self, t: f64) -> u16 {
        let phase = t % 0.8; // ~75 bpm
        let spike = if phase < 0.04 {
            420.0 * (1.0 - phase / 0.04)
        } else if phase < 0.08 {
            -140.0 * (1.0 - (phase - 0.04) / 0.04)
        } else {
            0.0
        };
        let noise = (rand_simple() - 0.5) * 8.0;
        clamp_adc(BASELINE + spike + noise)
    }

    fn sample_for_channel(&self, channel: u8, t: f64) -> u16 {
        match channel {
            0 => self.emg_sample(t),
            _ => self.ecg_sample(t),
        }
    }
}

fn clamp_adc(value: f64) -> u16 {
    value.round().clamp(0.0, ADC_MAX as f64) as u16
}

impl Default for SimulatedLink {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceLink for SimulatedLink {
    fn open(&mut self, address: &str, rate_hz: u32) -> Result<()> {
        if self.rate_hz.is_some() {
            return Err(BioVisError::Connection("link already open".into()));
        }
        if address.trim().is_empty() {
            return Err(BioVisError::Connection("empty device address".into()));
        }
        tracing::debug!("Simulated link open: {} at {} Hz", address, rate_hz);
        self.rate_hz = Some(rate_hz);
        Ok(())
    }

    fn start_sampling(&mut self, channels: &[u8]) -> Result<()> {
        if self.rate_hz.is_none() {
            return Err(BioVisError::Device("start_sampling before open".into()));
        }
        if channels.is_empty() {
            return Err(BioVisError::Device("empty channel set".into()));
        }
        self.channels = Some(channels.to_vec());
        self.seq = 0;
        self.produced = 0;
        self.started_at = Some(Instant::now());
        Ok(())
    }

    fn read_batch(&mut self, n: usize) -> Result<Vec<Frame>> {
        let rate = self
            .rate_hz
            .ok_or_else(|| BioVisError::Device("read_batch before open".into()))?;
        let channels = self
            .channels
            .clone()
            .ok_or_else(|| BioVisError::Device("read_batch before start_sampling".into()))?;
        let started = self
            .started_at
            .ok_or_else(|| BioVisError::Device("read_batch before start_sampling".into()))?;

        // Pace reads to the sample clock: block until n more samples are due.
        let due = Duration::from_secs_f64((self.produced + n as u64) as f64 / rate as f64);
        let elapsed = started.elapsed();
        if due > elapsed {
            std::thread::sleep(due - elapsed);
        }

        let mut frames = Vec::with_capacity(n);
        for _ in 0..n {
            let t = self.produced as f64 / rate as f64;
            let analog = channels
                .iter()
                .map(|&ch| self.sample_for_channel(ch, t))
                .collect();
            frames.push(Frame::new(self.seq, analog));
            self.seq = self.seq.wrapping_add(1);
            self.produced += 1;
        }
        Ok(frames)
    }

    fn stop_sampling(&mut self) -> Result<()> {
        if self.channels.take().is_none() {
            return Err(BioVisError::Device("stop_sampling while idle".into()));
        }
        self.started_at = None;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.rate_hz.take().is_none() {
            return Err(BioVisError::Device("close while already closed".into()));
        }
        self.channels = None;
        self.started_at = None;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.rate_hz.is_some()
    }
}
