//! Drag-move of shifts between cells.

use careshift_core::CellKey;

use crate::error::GridError;
use crate::grid::{CellWrite, ShiftGrid};
use crate::outbox::PersistTiming;

impl ShiftGrid {
    /// Drop the shift at `from` onto `to`.
    ///
    /// An occupied target swaps the two records; an empty one receives the
    /// record and `from` is cleared. Document ids travel with the records.
    /// Any open edit is committed first. Returns false when nothing moved.
    pub fn drag_drop(&mut self, from: &CellKey, to: &CellKey) -> Result<bool, GridError> {
        for key in [from, to] {
            if !self.layout.contains(key) {
                return Err(GridError::OutOfGrid(key.clone()));
            }
        }
        self.commit_open_edit();
        if from == to {
            return Ok(false);
        }
        let Some(source) = self.book.get(from).cloned() else {
            return Ok(false);
        };

        let mut moved = source;
        moved.key = to.clone();
        let writes = match self.book.get(to).cloned() {
            Some(mut displaced) => {
                displaced.key = from.clone();
                vec![CellWrite::Upsert(moved), CellWrite::Upsert(displaced)]
            }
            None => vec![CellWrite::Clear(from.clone()), CellWrite::Upsert(moved)],
        };
        log::debug!("move {} -> {}", from, to);
        self.apply_group("Move", writes, PersistTiming::Debounced);

        let line = self.selection.line();
        self.selection.select(to.line(line));
        Ok(true)
    }
}
