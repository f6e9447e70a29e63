//! Undo/redo of the paint layer by whole-buffer snapshots.
//!
//! Each entry is a full copy of the paint layer taken just before a
//! mutating operation. The undo stack is bounded: when it is full the
//! oldest snapshot is dropped without notice, so edits older than
//! `capacity` steps can no longer be undone. Memory use is therefore at
//! most `capacity` paint layers for undo plus whatever redo holds.
//!
//! Recording a new snapshot always empties the redo stack.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::buffer::PixelBuffer;
use crate::types::ColorbookError;

/// History sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of undo snapshots kept.
    pub capacity: usize,
}

impl HistoryConfig {
    pub const DEFAULT_CAPACITY: usize = 20;
    pub const MAX_CAPACITY: usize = 500;

    /// Check every field against its documented range.
    ///
    /// # Errors
    ///
    /// Returns [`ColorbookError::InvalidConfig`] if `capacity` exceeds
    /// [`Self::MAX_CAPACITY`].
    pub fn validate(&self) -> Result<(), ColorbookError> {
        if self.capacity > Self::MAX_CAPACITY {
            return Err(ColorbookError::InvalidConfig(format!(
                "history capacity must be at most {}, got {}",
                Self::MAX_CAPACITY,
                self.capacity
            )));
        }
        Ok(())
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: Self::DEFAULT_CAPACITY,
        }
    }
}

/// Result of an undo or redo request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryOutcome {
    /// A snapshot was swapped in.
    Restored,
    /// Nothing to restore; the layer is untouched.
    Empty,
}

/// Bounded undo stack plus redo stack.
#[derive(Debug, Clone, Default)]
pub struct History {
    undo: VecDeque<PixelBuffer>,
    redo: Vec<PixelBuffer>,
    capacity: usize,
}

impl History {
    #[must_use]
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            undo: VecDeque::with_capacity(config.capacity.min(HistoryConfig::MAX_CAPACITY)),
            redo: Vec::new(),
            capacity: config.capacity,
        }
    }

    /// Record the state before a mutation and invalidate redo.
    ///
    /// Returns `true` if the oldest snapshot had to be evicted.
    pub fn push(&mut self, snapshot: PixelBuffer) -> bool {
        self.redo.clear();
        self.push_undo(snapshot)
    }

    /// Swap the most recent snapshot into `current`, saving `current`
    /// for redo.
    pub fn undo(&mut self, current: &mut PixelBuffer) -> HistoryOutcome {
        let Some(snapshot) = self.undo.pop_back() else {
            return HistoryOutcome::Empty;
        };
        self.redo.push(std::mem::replace(current, snapshot));
        HistoryOutcome::Restored
    }

    /// Reverse the last undo, saving `current` for undo again.
    pub fn redo(&mut self, current: &mut PixelBuffer) -> HistoryOutcome {
        let Some(snapshot) = self.redo.pop() else {
            return HistoryOutcome::Empty;
        };
        let previous = std::mem::replace(current, snapshot);
        self.push_undo(previous);
        HistoryOutcome::Restored
    }

    /// Change the undo bound, dropping the oldest snapshots if needed.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        let excess = self.undo.len().saturating_sub(capacity);
        self.undo.drain(..excess);
    }

    /// Drop all snapshots (e.g. when a new page is loaded).
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }

    fn push_undo(&mut self, snapshot: PixelBuffer) -> bool {
        if self.capacity == 0 {
            return true;
        }
        let mut evicted = false;
        while self.undo.len() >= self.capacity {
            self.undo.pop_front();
            evicted = true;
        }
        self.undo.push_back(snapshot);
        if evicted {
            log::debug!("history full ({}), oldest snapshot dropped", self.capacity);
        }
        evicted
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::Rgba;

    fn layer(v: u8) -> PixelBuffer {
        PixelBuffer::filled(2, 2, Rgba::rgb(v, v, v))
    }

    #[test]
    fn empty_history_is_a_noop() {
        let mut h = History::new(HistoryConfig::default());
        let mut current = layer(1);
        assert_eq!(h.undo(&mut current), HistoryOutcome::Empty);
        assert_eq!(h.redo(&mut current), HistoryOutcome::Empty);
        assert_eq!(current, layer(1));
    }

    #[test]
    fn undo_then_redo_round_trips() {
        let mut h = History::new(HistoryConfig::default());
        let mut current = layer(0);
        for v in 1..=3 {
            h.push(current.clone());
            current = layer(v);
        }
        for v in (0..3).rev() {
            assert_eq!(h.undo(&mut current), HistoryOutcome::Restored);
            assert_eq!(current, layer(v));
        }
        assert!(!h.can_undo());
        for v in 1..=3 {
            assert_eq!(h.redo(&mut current), HistoryOutcome::Restored);
            assert_eq!(current, layer(v));
        }
        assert!(!h.can_redo());
        assert_eq!(h.undo_depth(), 3);
    }

    #[test]
    fn push_clears_redo() {
        let mut h = History::new(HistoryConfig::default());
        let mut current = layer(0);
        h.push(current.clone());
        current = layer(1);
        h.undo(&mut current);
        assert!(h.can_redo());
        h.push(current.clone());
        assert!(!h.can_redo());
        assert_eq!(h.redo(&mut current), HistoryOutcome::Empty);
    }

    #[test]
    fn capacity_evicts_oldest() {
        let mut h = History::new(HistoryConfig { capacity: 2 });
        assert!(!h.push(layer(0)));
        assert!(!h.push(layer(1)));
        assert!(h.push(layer(2)));
        assert_eq!(h.undo_depth(), 2);
        let mut current = layer(3);
        h.undo(&mut current);
        h.undo(&mut current);
        assert_eq!(current, layer(1), "layer(0) should have been evicted");
        assert_eq!(h.undo(&mut current), HistoryOutcome::Empty);
    }

    #[test]
    fn shrinking_capacity_keeps_newest() {
        let mut h = History::new(HistoryConfig::default());
        for v in 0..5 {
            h.push(layer(v));
        }
        h.set_capacity(2);
        let mut current = layer(9);
        h.undo(&mut current);
        assert_eq!(current, layer(4));
        h.undo(&mut current);
        assert_eq!(current, layer(3));
        assert!(!h.can_undo());
    }

    #[test]
    fn zero_capacity_disables_undo() {
        let mut h = History::new(HistoryConfig { capacity: 0 });
        h.push(layer(0));
        assert!(!h.can_undo());
    }

    #[test]
    fn clear_drops_both_stacks() {
        let mut h = History::new(HistoryConfig::default());
        let mut current = layer(1);
        h.push(layer(0));
        h.push(layer(0));
        h.undo(&mut current);
        h.clear();
        assert!(!h.can_undo() && !h.can_redo());
    }

    #[test]
    fn oversized_capacity_is_invalid() {
        let config = HistoryConfig { capacity: 501 };
        assert!(matches!(config.validate(), Err(ColorbookError::InvalidConfig(_))));
    }
}
