//! careshift store documents: v1 wire format
//!
//! These are the JSON shapes the shift store keeps: one document per shift,
//! one snapshot per month, and composite-keyed overlay entries. Field names
//! are camelCase. Clock times travel as `HH:MM` strings and dates as
//! `YYYY-MM-DD`.
//!
//! # Usage
//!
//! ```ignore
//! use careshift_protocol::ShiftDoc;
//!
//! let doc = ShiftDoc::from(&record);
//! let json = serde_json::to_string(&doc)?;
//!
//! let back: ShiftDoc = serde_json::from_str(&json)?;
//! let record = back.into_record()?;
//! ```

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use careshift_core::{CellKey, StaffId, YearMonth, ROWS_PER_DAY};
use careshift_engine::time::{format_clock, parse_clock};
use careshift_engine::{
    CancelStatus, OverlayKey, OverlayKind, PayBreakdown, ServiceType, ShiftFields, ShiftRecord,
};

/// Current document format version. Increment for breaking changes.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolError {
    /// A clock field is not `H:MM` / `HH:MM`
    BadTime { id: String, value: String },
    /// Row index outside the day's slots
    BadRow { id: String, row: u8 },
    /// Overlay key is not `staff-date[-row]`
    BadOverlayKey(String),
    Json(String),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadTime { id, value } => write!(f, "shift '{id}': cannot parse time '{value}'"),
            Self::BadRow { id, row } => write!(f, "shift '{id}': row index {row} out of range"),
            Self::BadOverlayKey(key) => write!(f, "bad overlay key '{key}'"),
            Self::Json(msg) => write!(f, "JSON error: {msg}"),
        }
    }
}

impl std::error::Error for ProtocolError {}

impl From<serde_json::Error> for ProtocolError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e.to_string())
    }
}

// =============================================================================
// Shifts
// =============================================================================

/// One shift document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftDoc {
    pub id: String,
    pub staff_id: String,
    pub date: NaiveDate,
    pub row_index: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default)]
    pub client_name: String,
    #[serde(default)]
    pub service_type: ServiceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default)]
    pub area: String,
    #[serde(default)]
    pub cancel_status: CancelStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canceled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub regular_hours: f64,
    #[serde(default)]
    pub night_hours: f64,
    #[serde(default)]
    pub regular_pay: f64,
    #[serde(default)]
    pub night_pay: f64,
    #[serde(default)]
    pub total_pay: f64,
    #[serde(default)]
    pub deleted: bool,
    /// Logical sequence of the writing client's mutation
    #[serde(default)]
    pub updated_at: u64,
}

impl From<&ShiftRecord> for ShiftDoc {
    fn from(r: &ShiftRecord) -> Self {
        Self {
            id: r.id.clone(),
            staff_id: r.key.staff.to_string(),
            date: r.key.date,
            row_index: r.key.row,
            start_time: r.fields.start_time.map(format_clock),
            end_time: r.fields.end_time.map(format_clock),
            client_name: r.fields.client_name.clone(),
            service_type: r.fields.service_type,
            duration: r.fields.duration,
            area: r.fields.area.clone(),
            cancel_status: r.cancel_status,
            canceled_at: r.canceled_at,
            regular_hours: r.pay.regular_hours,
            night_hours: r.pay.night_hours,
            regular_pay: r.pay.regular_pay,
            night_pay: r.pay.night_pay,
            total_pay: r.pay.total_pay,
            deleted: r.deleted,
            updated_at: r.updated_seq,
        }
    }
}

impl ShiftDoc {
    pub fn month(&self) -> YearMonth {
        YearMonth::of(self.date)
    }

    /// Convert to an engine record. Anything read from the store counts as
    /// persisted.
    pub fn into_record(self) -> Result<ShiftRecord, ProtocolError> {
        if self.row_index >= ROWS_PER_DAY {
            return Err(ProtocolError::BadRow { id: self.id, row: self.row_index });
        }
        let start_time = parse_time(&self.id, self.start_time.as_deref())?;
        let end_time = parse_time(&self.id, self.end_time.as_deref())?;
        let key = CellKey::new(StaffId::new(self.staff_id), self.date, self.row_index);
        let fields = ShiftFields {
            start_time,
            end_time,
            client_name: self.client_name,
            service_type: self.service_type,
            duration: self.duration,
            area: self.area,
        };
        let mut record = ShiftRecord::with_id(self.id, key, fields);
        record.cancel_status = self.cancel_status;
        record.canceled_at = self.canceled_at;
        record.pay = PayBreakdown {
            regular_hours: self.regular_hours,
            night_hours: self.night_hours,
            regular_pay: self.regular_pay,
            night_pay: self.night_pay,
            total_pay: self.total_pay,
        };
        record.deleted = self.deleted;
        record.updated_seq = self.updated_at;
        record.persisted = true;
        Ok(record)
    }
}

fn parse_time(id: &str, value: Option<&str>) -> Result<Option<chrono::NaiveTime>, ProtocolError> {
    match value {
        None | Some("") => Ok(None),
        Some(v) => parse_clock(v)
            .map(Some)
            .ok_or_else(|| ProtocolError::BadTime { id: id.to_string(), value: v.to_string() }),
    }
}

/// Every shift document of one month, tombstones included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthSnapshot {
    #[serde(default = "default_format_version")]
    pub version: u32,
    pub month: YearMonth,
    pub shifts: Vec<ShiftDoc>,
}

fn default_format_version() -> u32 {
    FORMAT_VERSION
}

impl MonthSnapshot {
    pub fn new(month: YearMonth, shifts: Vec<ShiftDoc>) -> Self {
        Self { version: FORMAT_VERSION, month, shifts }
    }

    /// Convert every document. Malformed documents are returned separately
    /// so one bad row does not hide the month.
    pub fn into_records(self) -> (Vec<ShiftRecord>, Vec<ProtocolError>) {
        let mut records = Vec::with_capacity(self.shifts.len());
        let mut errors = Vec::new();
        for doc in self.shifts {
            match doc.into_record() {
                Ok(r) => records.push(r),
                Err(e) => errors.push(e),
            }
        }
        (records, errors)
    }
}

// =============================================================================
// Overlays
// =============================================================================

/// One overlay entry, keyed by its composite string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayDoc {
    pub key: String,
    #[serde(default)]
    pub note: String,
}

impl OverlayDoc {
    pub fn new(key: &OverlayKey, note: impl Into<String>) -> Self {
        Self { key: key.to_composite(), note: note.into() }
    }

    pub fn overlay_key(&self) -> Result<OverlayKey, ProtocolError> {
        OverlayKey::from_composite(&self.key).ok_or_else(|| ProtocolError::BadOverlayKey(self.key.clone()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlaySnapshot {
    pub kind: OverlayKind,
    pub month: YearMonth,
    pub entries: Vec<OverlayDoc>,
}

// =============================================================================
// Payroll fields
// =============================================================================

/// A per-staff monthly payroll adjustment (transport allowance, bonus, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollFieldDoc {
    pub month: YearMonth,
    pub staff_id: String,
    pub field: String,
    pub value: f64,
}
