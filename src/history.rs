// ============================================================================
// FILTER HISTORY: applied filters plus an undo/redo cursor
// ============================================================================

use crate::error::{EditError, Result, Transition};
use crate::ops::Filter;

/// Linear filter history.
///
/// `entries[..applied]` is the active chain; anything after it is the redo
/// tail. The cursor (index of the last applied filter) is `applied - 1`, or
/// `None` when nothing is applied.
#[derive(Clone, Debug, Default)]
pub struct FilterHistory {
    entries: Vec<Filter>,
    applied: usize,
    version: u64,
}

impl FilterHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a filter after the cursor. Any redo tail is dropped.
    pub fn push(&mut self, filter: Filter) {
        self.entries.truncate(self.applied);
        self.entries.push(filter);
        self.applied = self.entries.len();
        self.version += 1;
    }

    /// Step the cursor back one filter.
    pub fn undo(&mut self) -> Result<Filter> {
        let filter = *self.undo_target().ok_or_else(|| self.rejected(Transition::Undo))?;
        self.applied -= 1;
        self.version += 1;
        Ok(filter)
    }

    /// Step the cursor forward one filter.
    pub fn redo(&mut self) -> Result<Filter> {
        let filter = *self.redo_target().ok_or_else(|| self.rejected(Transition::Redo))?;
        self.applied += 1;
        self.version += 1;
        Ok(filter)
    }

    /// Filter that `undo` would drop.
    pub fn undo_target(&self) -> Option<&Filter> {
        self.applied.checked_sub(1).and_then(|i| self.entries.get(i))
    }

    /// Filter that `redo` would re-apply.
    pub fn redo_target(&self) -> Option<&Filter> {
        self.entries.get(self.applied)
    }

    pub fn can_undo(&self) -> bool {
        self.applied > 0
    }

    pub fn can_redo(&self) -> bool {
        self.applied < self.entries.len()
    }

    /// Index of the last applied filter.
    pub fn cursor(&self) -> Option<usize> {
        self.applied.checked_sub(1)
    }

    /// Filters up to and including the cursor, in application order.
    pub fn active(&self) -> &[Filter] {
        &self.entries[..self.applied]
    }

    /// Every recorded filter, including the redo tail.
    pub fn entries(&self) -> &[Filter] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn undo_count(&self) -> usize {
        self.applied
    }

    pub fn redo_count(&self) -> usize {
        self.entries.len() - self.applied
    }

    /// Bumped by every mutation; results computed for an older version are stale.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Active chain descriptions, most recent first.
    pub fn undo_history(&self) -> Vec<String> {
        self.active().iter().rev().map(|f| f.description()).collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.applied = 0;
        self.version += 1;
    }

    pub(crate) fn rejected(&self, action: Transition) -> EditError {
        EditError::InvalidTransition {
            action,
            cursor: self.cursor(),
            len: self.entries.len(),
        }
    }
}
