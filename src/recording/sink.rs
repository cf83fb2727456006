//! Append-only recording sink with a streaming write protocol
//!
//! The recording artifact is a two-line text file:
//!
//! ```text
//! <sampling_rate_hz>\n
//! <v1>,<v2>,...,<vN>\n
//! ```
//!
//! Samples are spooled to a temp file as they arrive so an abrupt stop or
//! device error never leaves a half-written destination file; exporting is a
//! plain copy of the finalized spool to the user-chosen path.

use crate::error::{BioVisError, Result};
use std::io::{BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Streaming writer for one recording
///
/// Values are comma-joined on a single line with no trailing comma. The
/// trailing newline and flush happen exactly once, in [`SampleSink::finalize`],
/// which is safe to call repeatedly and after a prior failure.
pub struct SampleSink {
    writer: BufWriter<NamedTempFile>,
    /// Whether at least one value has been written (controls comma placement)
    wrote_value: bool,
    finalized: bool,
}

impl SampleSink {
    /// Create a new spooled recording and write the sampling-rate header
    pub fn create(sampling_rate_hz: u32) -> Result<Self> {
        let spool = NamedTempFile::new()?;
        let mut writer = BufWriter::new(spool);
        writeln!(writer, "{}", sampling_rate_hz)?;
        Ok(Self {
            writer,
            wrote_value: false,
            finalized: false,
        })
    }

    /// Append one sample value in arrival order
    pub fn append(&mut self, value: u16) -> Result<()> {
        if self.finalized {
            return Err(BioVisError::Recording(
                "append after finalize".to_string(),
            ));
        }
        if self.wrote_value {
            write!(self.writer, ",{}", value)?;
        } else {
            write!(self.writer, "{}", value)?;
            self.wrote_value = true;
        }
        Ok(())
    }

    /// Terminate the data line and flush the spool
    ///
    /// Idempotent: only the first call writes the trailing newline; later
    /// calls return `Ok(())` without touching the file, even if the first
    /// attempt failed part-way.
    pub fn finalize(&mut self) -> Result<()> {
        if self.finalized {
            return Ok(());
        }
        self.finalized = true;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Whether the recording has been finalized and is exportable
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Path of the spooled recording file
    pub fn path(&self) -> &Path {
        self.writer.get_ref().path()
    }

    /// Copy the finalized recording to `dest`, overwriting any existing file
    pub fn export(&self, dest: &Path) -> Result<()> {
        if !self.finalized {
            return Err(BioVisError::Recording(
                "export before finalize".to_string(),
            ));
        }
        std::fs::copy(self.path(), dest)?;
        Ok(())
    }
}
