//! Detection of the moment indexing finishes.

/// Remembers the running count seen by the previous poll of one target.
#[derive(Debug, Clone, Default)]
pub struct RunningCountTracker {
    last: Option<u32>,
}

impl RunningCountTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the count from the latest global snapshot.
    ///
    /// Returns true when the count dropped from a positive value to zero
    /// since the previous snapshot.
    pub fn observe(&mut self, running_count: u32) -> bool {
        let finished = matches!(self.last, Some(previous) if previous > 0) && running_count == 0;
        self.last = Some(running_count);
        finished
    }

    /// Count seen by the last observed snapshot.
    pub fn last(&self) -> Option<u32> {
        self.last
    }
}
