use std::collections::HashSet;

use crate::{CborError, ErrorCode};

/// Identity set over the containers an encode traversal is currently inside.
///
/// Entries are added on container entry and removed on exit, so the set only
/// ever holds the live path. An owned value tree cannot alias itself, but
/// extension encoders re-enter the encoder and may push a container they are
/// already inside; entering an address twice fails with `LoopDetected`.
#[derive(Debug, Default)]
pub struct LoopDetector {
    live: HashSet<usize>,
}

impl LoopDetector {
    /// Construct an empty detector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all tracked containers.
    ///
    /// Resetting mid-encode forgets the live path; intended for reusing a
    /// detector across top-level encode calls.
    pub fn reset(&mut self) {
        self.live.clear();
    }

    pub(crate) fn enter(&mut self, addr: usize, offset: usize) -> Result<(), CborError> {
        if self.live.insert(addr) {
            Ok(())
        } else {
            Err(CborError::new(ErrorCode::LoopDetected, offset))
        }
    }

    pub(crate) fn leave(&mut self, addr: usize) {
        self.live.remove(&addr);
    }
}
