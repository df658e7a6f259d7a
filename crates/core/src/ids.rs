//! Cell identity.
//!
//! A `CellKey` uniquely identifies one time-slot cell of one staff member on
//! one calendar date. `CellLine` narrows it to one of the four text lines.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Fixed number of intra-day time slots per staff member.
pub const ROWS_PER_DAY: u8 = 5;
/// Lines per cell: time range, client + service, duration, area.
pub const LINES_PER_CELL: u8 = 4;

/// Staff member identifier (opaque, as issued by the store).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaffId(String);

impl StaffId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StaffId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StaffId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for StaffId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Unique identifier for a cell in the schedule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellKey {
    pub staff: StaffId,
    pub date: NaiveDate,
    /// Time-slot row (0-based, `< ROWS_PER_DAY`)
    pub row: u8,
}

impl CellKey {
    #[inline]
    pub fn new(staff: impl Into<StaffId>, date: NaiveDate, row: u8) -> Self {
        Self { staff: staff.into(), date, row }
    }

    /// Month this cell belongs to (persistence is grouped by month).
    pub fn month(&self) -> YearMonth {
        YearMonth::of(self.date)
    }

    /// Address one line of this cell.
    pub fn line(&self, line: u8) -> CellLine {
        CellLine { cell: self.clone(), line }
    }

    /// `(staff, date)` pair used for daily aggregation.
    pub fn day(&self) -> (StaffId, NaiveDate) {
        (self.staff.clone(), self.date)
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.staff, self.date.format("%Y-%m-%d"), self.row)
    }
}

/// One text line of one cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CellLine {
    pub cell: CellKey,
    /// Line index (0-based, `< LINES_PER_CELL`)
    pub line: u8,
}

impl CellLine {
    pub fn new(cell: CellKey, line: u8) -> Self {
        Self { cell, line }
    }
}

impl fmt::Display for CellLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.cell, self.line)
    }
}

/// Calendar month, the unit of loading, subscription and persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    pub fn of(date: NaiveDate) -> Self {
        Self { year: date.year(), month: date.month() }
    }

    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    pub fn next(&self) -> Self {
        if self.month >= 12 {
            Self { year: self.year + 1, month: 1 }
        } else {
            Self { year: self.year, month: self.month + 1 }
        }
    }

    /// Every date of the month, in order. Empty for an invalid month.
    pub fn days(&self) -> Vec<NaiveDate> {
        let Some(first) = self.first_day() else {
            return Vec::new();
        };
        first
            .iter_days()
            .take_while(|d| d.month() == self.month)
            .collect()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = String;

    /// Parses `YYYY-MM`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (y, m) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| format!("expected YYYY-MM, got '{s}'"))?;
        let year: i32 = y.parse().map_err(|_| format!("invalid year in '{s}'"))?;
        let month: u32 = m.parse().map_err(|_| format!("invalid month in '{s}'"))?;
        if !(1..=12).contains(&month) {
            return Err(format!("month out of range in '{s}'"));
        }
        Ok(Self { year, month })
    }
}
