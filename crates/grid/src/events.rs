//! Notifications emitted by the grid.

use careshift_core::{CellKey, YearMonth};
use careshift_engine::ShiftRecord;

#[derive(Debug, Clone, PartialEq)]
pub enum GridEvent {
    /// Fired after every optimistic local mutation.
    ShiftsUpdated {
        /// Records written by the mutation, as now stored
        shifts: Vec<ShiftRecord>,
        /// Cells left empty by the mutation
        cleared: Vec<CellKey>,
        /// Persisted on the debounced path
        debounce: bool,
    },
    /// A remote snapshot changed local cells.
    RemoteApplied { month: YearMonth, changed: Vec<CellKey> },
    /// A remote snapshot arrived mid-edit and was held back.
    SnapshotDeferred { month: YearMonth },
    /// Some writes of a persist job failed after retries. Local state is kept.
    PersistFailed { month: YearMonth, failed: Vec<String>, message: String },
    PayrollSaveFailed { staff_id: String, field: String, message: String },
}

/// Callback type for receiving grid events.
pub type EventCallback = Box<dyn FnMut(&GridEvent) + Send>;

/// Simple event collector for testing.
#[derive(Debug, Default)]
pub struct EventCollector {
    events: Vec<GridEvent>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn push(&mut self, event: GridEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[GridEvent] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Filter to only ShiftsUpdated events, as `(written, cleared, debounce)`.
    pub fn shifts_updated(&self) -> Vec<(&[ShiftRecord], &[CellKey], bool)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                GridEvent::ShiftsUpdated { shifts, cleared, debounce } => {
                    Some((shifts.as_slice(), cleared.as_slice(), *debounce))
                }
                _ => None,
            })
            .collect()
    }

    pub fn persist_failures(&self) -> Vec<&GridEvent> {
        self.events
            .iter()
            .filter(|e| matches!(e, GridEvent::PersistFailed { .. } | GridEvent::PayrollSaveFailed { .. }))
            .collect()
    }
}
