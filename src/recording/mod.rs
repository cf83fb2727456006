//! Recording pipeline: the spooled sample sink and the in-memory signal buffer
//!
//! - [`SampleSink`] - append-only recording file with a streaming write
//!   protocol and copy-to-destination export
//! - [`SignalBuffer`] - unbounded per-session sample store feeding the
//!   waveform rendering

pub mod buffer;
pub mod sink;

pub use buffer::SignalBuffer;
pub use sink::SampleSink;
