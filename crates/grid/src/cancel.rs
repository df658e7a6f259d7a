//! Cancel marks on shifts.

use careshift_core::CellKey;
use careshift_engine::CancelStatus;

use crate::grid::{CellWrite, ShiftGrid};
use crate::outbox::PersistTiming;

impl ShiftGrid {
    /// Mark shifts canceled (`KeepTime` / `RemoveTime`) or restore them
    /// (`None`). Empty cells and records already in `status` are skipped.
    pub fn set_cancel_status(&mut self, cells: &[CellKey], status: CancelStatus) -> bool {
        self.commit_open_edit();
        let stamp = match status {
            CancelStatus::None => None,
            CancelStatus::KeepTime | CancelStatus::RemoveTime => Some(self.clock.wall()),
        };
        let writes = cells
            .iter()
            .filter_map(|key| self.book.get(key))
            .filter(|record| record.cancel_status != status)
            .map(|record| {
                let mut record = record.clone();
                record.cancel_status = status;
                record.canceled_at = stamp;
                CellWrite::Upsert(record)
            })
            .collect();
        self.apply_group("Cancel", writes, PersistTiming::Immediate)
    }

    /// `set_cancel_status` over every selected cell.
    pub fn cancel_selection(&mut self, status: CancelStatus) -> bool {
        let cells = self.selection.cells();
        self.set_cancel_status(&cells, status)
    }
}
