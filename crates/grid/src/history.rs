/// Undo/Redo history for grid mutations

use careshift_core::CellKey;
use careshift_engine::{CellColor, ShiftRecord};

/// A cell as it was before a mutation.
#[derive(Clone, Debug, PartialEq)]
pub struct CellSnapshot {
    pub key: CellKey,
    pub lines: [String; 4],
    pub background: CellColor,
    /// `None` when the cell was empty
    pub record: Option<ShiftRecord>,
}

/// All snapshots of one user action.
#[derive(Clone, Debug, PartialEq)]
pub struct UndoGroup {
    pub label: &'static str,
    pub entries: Vec<CellSnapshot>,
}

impl UndoGroup {
    pub fn new(label: &'static str, entries: Vec<CellSnapshot>) -> Self {
        Self { label, entries }
    }
}

pub struct History {
    undo_stack: Vec<UndoGroup>,
    redo_stack: Vec<UndoGroup>,
    max_entries: usize,
}

impl History {
    pub fn new() -> Self {
        Self::with_limit(100)
    }

    pub fn with_limit(max_entries: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_entries: max_entries.max(1),
        }
    }

    /// Record a new user action. Clears the redo stack.
    pub fn push(&mut self, group: UndoGroup) {
        if group.entries.is_empty() {
            return;
        }
        self.redo_stack.clear();
        self.push_undo_keep_redo(group);
    }

    /// Push onto the undo stack without touching redo (used by redo itself).
    pub fn push_undo_keep_redo(&mut self, group: UndoGroup) {
        self.undo_stack.push(group);

        // Limit history size
        if self.undo_stack.len() > self.max_entries {
            self.undo_stack.remove(0);
        }
    }

    pub fn pop_undo(&mut self) -> Option<UndoGroup> {
        self.undo_stack.pop()
    }

    pub fn push_redo(&mut self, group: UndoGroup) {
        self.redo_stack.push(group);
    }

    pub fn pop_redo(&mut self) -> Option<UndoGroup> {
        self.redo_stack.pop()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}
