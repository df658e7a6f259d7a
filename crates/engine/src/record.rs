use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use careshift_core::CellKey;

use crate::pay::PayBreakdown;
use crate::service::ServiceType;
use crate::time::TimeRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelStatus {
    #[default]
    None,
    /// Canceled, hours still paid
    KeepTime,
    /// Canceled, hours dropped from pay
    RemoveTime,
}

/// The structured content of a cell: what the four display lines encode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftFields {
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub client_name: String,
    pub service_type: ServiceType,
    /// Hours
    pub duration: Option<f64>,
    pub area: String,
}

impl ShiftFields {
    /// Complete range, only when both ends are known.
    pub fn time_range(&self) -> Option<TimeRange> {
        Some(TimeRange::new(self.start_time?, self.end_time?))
    }
}

/// One shift in the schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct ShiftRecord {
    /// Store document id; stable across moves
    pub id: String,
    pub key: CellKey,
    pub fields: ShiftFields,
    pub cancel_status: CancelStatus,
    pub canceled_at: Option<DateTime<Utc>>,
    /// Written by the pay calculator after every mutation
    pub pay: PayBreakdown,
    /// The store has seen this record (loaded remotely or save acknowledged)
    pub persisted: bool,
    pub deleted: bool,
    /// Logical sequence of the local mutation that last wrote this record
    pub updated_seq: u64,
}

impl ShiftRecord {
    /// Fresh, never-persisted record with a new document id.
    pub fn new(key: CellKey, fields: ShiftFields) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), key, fields)
    }

    pub fn with_id(id: impl Into<String>, key: CellKey, fields: ShiftFields) -> Self {
        Self {
            id: id.into(),
            key,
            fields,
            cancel_status: CancelStatus::None,
            canceled_at: None,
            pay: PayBreakdown::default(),
            persisted: false,
            deleted: false,
            updated_seq: 0,
        }
    }

    pub fn is_canceled(&self) -> bool {
        self.cancel_status != CancelStatus::None
    }

    /// Live and not canceled.
    pub fn is_active(&self) -> bool {
        !self.deleted && !self.is_canceled()
    }

    /// Clear cancellation (paste and fresh edits always produce active shifts).
    pub fn reactivate(&mut self) {
        self.cancel_status = CancelStatus::None;
        self.canceled_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::parse_clock;
    use chrono::NaiveDate;

    #[test]
    fn test_new_records_get_distinct_ids() {
        let key = CellKey::new("H1", NaiveDate::from_ymd_opt(2026, 4, 5).unwrap(), 0);
        let a = ShiftRecord::new(key.clone(), ShiftFields::default());
        let b = ShiftRecord::new(key, ShiftFields::default());
        assert_ne!(a.id, b.id);
        assert!(!a.persisted);
        assert!(a.is_active());
    }

    #[test]
    fn test_time_range_needs_both_ends() {
        let mut fields = ShiftFields { start_time: parse_clock("09:00"), ..Default::default() };
        assert!(fields.time_range().is_none());
        fields.end_time = parse_clock("10:30");
        assert_eq!(fields.time_range().map(|r| r.hours()), Some(1.5));
    }
}
