use tracing::{debug, trace};

use super::frame::Frame;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ScanState {
    /// Nothing in flight, next frame goes straight to the detector
    #[default]
    Idle,
    /// One frame with the detector
    Detecting,
    /// Paused on a hit until resumed
    Found(String),
}

/// What the caller does after a detection completes.
#[derive(Debug)]
pub enum Transition {
    /// Report the text and stay paused
    Found(String),
    /// Send the parked frame to the detector
    Submit(Frame),
    /// Nothing to do until the next frame
    Idle,
}

// Frame gate
//------------------------------------------------------------------------------

/// Backpressure state machine for the live frame path.
///
/// Keeps at most one detection in flight and at most one frame parked behind
/// it. A newer frame replaces the parked one, so only the latest frame is ever
/// analysed next. Frames that are not submitted are dropped, which releases
/// them.
#[derive(Debug, Default)]
pub struct FrameGate {
    state: ScanState,
    pending: Option<Frame>,
}

impl FrameGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Returns the frame when it should be submitted right away.
    pub fn offer(&mut self, frame: Frame) -> Option<Frame> {
        match self.state {
            ScanState::Idle => {
                self.state = ScanState::Detecting;
                Some(frame)
            }
            ScanState::Detecting => {
                if self.pending.replace(frame).is_some() {
                    trace!("Dropped stale parked frame");
                }
                None
            }
            ScanState::Found(_) => None,
        }
    }

    /// Closes the in-flight detection. `None` covers both "nothing found" and
    /// detector failure.
    pub fn complete(&mut self, outcome: Option<String>) -> Transition {
        debug_assert_eq!(self.state, ScanState::Detecting, "No detection in flight");

        match outcome {
            Some(text) => {
                self.pending = None;
                self.state = ScanState::Found(text.clone());
                Transition::Found(text)
            }
            None => match self.pending.take() {
                Some(frame) => {
                    self.state = ScanState::Detecting;
                    Transition::Submit(frame)
                }
                None => {
                    self.state = ScanState::Idle;
                    Transition::Idle
                }
            },
        }
    }

    /// Leaves the paused state. Returns whether the gate was paused.
    pub fn resume(&mut self) -> bool {
        if matches!(self.state, ScanState::Found(_)) {
            debug!("Resuming scan");
            self.state = ScanState::Idle;
            true
        } else {
            false
        }
    }

    /// Drops any parked frame.
    pub fn clear_pending(&mut self) {
        self.pending = None;
    }
}
