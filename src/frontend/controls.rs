//! Control enablement as a pure function of session state
//!
//! The session emits state transitions; this module maps a state to the set
//! of enabled controls, keeping the state machine independent of any
//! rendering toolkit.

use crate::types::SessionState;

/// Which user-facing controls are enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlSet {
    pub connect: bool,
    pub start: bool,
    pub stop: bool,
    pub save: bool,
    pub new_recording: bool,
}

impl ControlSet {
    /// Derive the enabled controls for a session state
    ///
    /// `has_recording` gates the save control: only a finalized recording
    /// is exportable.
    pub fn for_state(state: SessionState, has_recording: bool) -> Self {
        match state {
            SessionState::Disconnected => Self {
                connect: true,
                start: false,
                stop: false,
                save: false,
                new_recording: true,
            },
            SessionState::Connecting => Self {
                connect: false,
                start: false,
                stop: false,
                save: false,
                new_recording: false,
            },
            SessionState::Connected => Self {
                connect: false,
                start: true,
                stop: false,
                save: false,
                new_recording: true,
            },
            SessionState::Acquiring => Self {
                connect: false,
                start: false,
                stop: true,
                save: false,
                new_recording: true,
            },
            SessionState::Stopped => Self {
                connect: false,
                start: false,
                stop: false,
                save: has_recording,
                new_recording: true,
            },
        }
    }
}
