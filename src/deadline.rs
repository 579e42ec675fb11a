use std::time::{Duration, Instant};

/// A wall-clock budget shared by several blocking operations.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    pub(crate) fn after(budget: Duration) -> Self {
        Self {
            // an unrepresentable instant means "no limit"
            at: Instant::now().checked_add(budget),
        }
    }

    /// Time left, or `None` once the budget is spent.
    pub(crate) fn remaining(&self) -> Option<Duration> {
        match self.at {
            Some(at) => {
                let left = at.saturating_duration_since(Instant::now());
                (!left.is_zero()).then_some(left)
            }
            None => Some(Duration::MAX),
        }
    }
}
