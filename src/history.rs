use crate::{
    error::Error,
    feedback::{FrameVerdict, OverallState},
};
use std::collections::VecDeque;

pub(crate) const DEFAULT_CAPACITY: usize = 10;
pub(crate) const DEFAULT_BAD_LIMIT: usize = 5;

/// Sliding window of recent frame verdicts.
///
/// The overall state is bad once more than `bad_limit` of the retained
/// verdicts are bad. Frames without a verdict never enter the window.
#[derive(Debug, Clone)]
pub(crate) struct PostureHistory {
    window: VecDeque<FrameVerdict>,
    capacity: usize,
    bad_limit: usize,
}

impl Default for PostureHistory {
    fn default() -> Self {
        Self {
            window: VecDeque::with_capacity(DEFAULT_CAPACITY + 1),
            capacity: DEFAULT_CAPACITY,
            bad_limit: DEFAULT_BAD_LIMIT,
        }
    }
}

impl PostureHistory {
    pub(crate) fn with_limits(capacity: usize, bad_limit: usize) -> Result<Self, Error> {
        if capacity == 0 || bad_limit >= capacity {
            return Err(Error::InvalidHistoryLimits {
                capacity,
                bad_limit,
            });
        }
        Ok(Self {
            window: VecDeque::with_capacity(capacity + 1),
            capacity,
            bad_limit,
        })
    }

    /// Append a verdict, evicting the oldest past capacity, and return the new state.
    pub(crate) fn record(&mut self, verdict: FrameVerdict) -> OverallState {
        self.window.push_back(verdict);
        if self.window.len() > self.capacity {
            self.window.pop_front();
        }
        self.state()
    }

    pub(crate) fn state(&self) -> OverallState {
        if self.bad_count() > self.bad_limit {
            OverallState::Bad
        } else {
            OverallState::Good
        }
    }

    pub(crate) fn bad_count(&self) -> usize {
        self.window
            .iter()
            .filter(|&&verdict| verdict == FrameVerdict::Bad)
            .count()
    }

    pub(crate) fn len(&self) -> usize {
        self.window.len()
    }

    #[cfg(test)]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }
}
