//! Error handling for the BioVis-RS application
//!
//! This module defines custom error types and a Result alias for use
//! throughout the application.

use thiserror::Error;

/// Main error type for BioVis-RS operations
#[derive(Error, Debug)]
pub enum BioVisError {
    /// Input rejected before any device interaction (empty address, no channel)
    #[error("{0}")]
    InvalidInput(String),

    /// Errors while opening a connection to the acquisition device
    #[error("Connection error: {0}")]
    Connection(String),

    /// Errors from the device link after a connection exists
    /// (start/read/stop/close failures)
    #[error("Device error: {0}")]
    Device(String),

    /// IO errors (recording file create/write/flush/copy)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors related to the recording sink protocol
    #[error("Recording error: {0}")]
    Recording(String),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),
}

impl BioVisError {
    /// True for errors that originate in the device link rather than the host
    pub fn is_device_side(&self) -> bool {
        matches!(self, BioVisError::Connection(_) | BioVisError::Device(_))
    }
}

/// Result type alias for BioVis-RS operations
pub type Result<T> = std::result::Result<T, BioVisError>;
