/// Once-per-frame guard.
///
/// Hosts may fire the frame trigger more than once for the same frame; only
/// the first call with a given index is let through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameGate {
    last_frame: Option<u64>,
}

impl FrameGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true and records `frame` if it differs from the last recorded
    /// frame; returns false otherwise.
    pub fn should_run(&mut self, frame: u64) -> bool {
        if self.last_frame == Some(frame) {
            return false;
        }
        self.last_frame = Some(frame);
        true
    }

    pub fn last_frame(&self) -> Option<u64> {
        self.last_frame
    }
}
