//! Read-only projection of a cell for rendering.

use crate::codec;
use crate::color::CellColor;
use crate::overlay::OverlayState;
use crate::record::{CancelStatus, ShiftRecord};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CellDisplay {
    pub lines: [String; 4],
    pub background: CellColor,
    pub has_warning: bool,
}

impl CellDisplay {
    /// Build from the record occupying a cell (if any) and the cell's overlay flags.
    pub fn project(record: Option<&ShiftRecord>, overlay: OverlayState) -> Self {
        let record = record.filter(|r| !r.deleted);
        Self {
            lines: record.map(|r| codec::encode(&r.fields)).unwrap_or_default(),
            background: background_for(record, overlay),
            has_warning: has_warning(record, overlay),
        }
    }

    pub fn line(&self, index: u8) -> &str {
        self.lines.get(index as usize).map_or("", String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(String::is_empty)
    }
}

/// Cancellation > scheduled day off > service color > day-off request > default.
pub fn background_for(record: Option<&ShiftRecord>, overlay: OverlayState) -> CellColor {
    let record = record.filter(|r| !r.deleted);
    match record.map(|r| r.cancel_status) {
        Some(CancelStatus::KeepTime) => return CellColor::CANCELED_KEEP_TIME,
        Some(CancelStatus::RemoveTime) => return CellColor::CANCELED_REMOVE_TIME,
        _ => {}
    }
    if overlay.scheduled_day_off {
        return CellColor::SCHEDULED_DAY_OFF;
    }
    if let Some(color) = record.and_then(|r| r.fields.service_type.color()) {
        return color;
    }
    if overlay.day_off_requested {
        return CellColor::DAY_OFF_REQUEST;
    }
    CellColor::DEFAULT
}

pub fn has_warning(record: Option<&ShiftRecord>, overlay: OverlayState) -> bool {
    let Some(record) = record.filter(|r| r.is_active()) else {
        return false;
    };
    if overlay.suppresses_duration() {
        return true;
    }
    !record.fields.client_name.is_empty() && record.fields.start_time.is_none()
}
