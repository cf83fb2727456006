//! Device link seam for the acquisition hardware
//!
//! The low-level driver (byte framing, checksums, frame decoding) lives
//! outside this crate; everything above it talks to the hardware through the
//! [`DeviceLink`] trait. This keeps the session testable with mock links and
//! lets the application run against the [`SimulatedLink`] when no hardware is
//! present.
//!
//! # Contract
//!
//! - Every operation is fallible and maps driver failures into
//!   [`BioVisError::Connection`] / [`BioVisError::Device`].
//! - `read_batch` is blocking and returns *up to* `n` frames. Frames contain
//!   one reading per channel requested in `start_sampling`, in request order.
//! - There is no cancellation inside a blocking read; callers check their
//!   stop flag between batches and tolerate one batch of exit latency.

pub mod sim;

pub use sim::SimulatedLink;

use crate::error::Result;
use crate::types::Frame;

/// Connection to a physiological-signal acquisition device
///
/// Implementations must be `Send`: the session moves the link behind an
/// `Arc<Mutex<_>>` shared between the UI thread and the background reader.
#[cfg_attr(test, mockall::automock)]
pub trait DeviceLink: Send {
    /// Open a connection to the device at `address`, configured for
    /// `rate_hz` samples per second
    fn open(&mut self, address: &str, rate_hz: u32) -> Result<()>;

    /// Begin continuous sampling on the given analog channel set
    fn start_sampling(&mut self, channels: &[u8]) -> Result<()>;

    /// Blocking read of up to `n` frames from the sample stream
    fn read_batch(&mut self, n: usize) -> Result<Vec<Frame>>;

    /// Stop continuous sampling, leaving the connection open
    fn stop_sampling(&mut self) -> Result<()>;

    /// Close the connection; the link is unusable afterwards
    fn close(&mut self) -> Result<()>;

    /// Whether an open connection currently exists
    fn is_open(&self) -> bool;
}

/// Factory producing fresh device links
///
/// "New recording" discards the old link and constructs a new one through
/// this factory, guaranteeing the old handle is fully closed before the
/// replacement exists.
pub type LinkFactory = Box<dyn Fn() -> Box<dyn DeviceLink> + Send>;

/// Factory for the built-in simulated link
pub fn simulated_link_factory() -> LinkFactory {
    Box::new(|| Box::new(SimulatedLink::new()))
}
