//! Day-off overlays.
//!
//! Two sparse maps sit on top of the schedule: day-off requests made by
//! staff and day-offs fixed by the office. An entry without a row covers
//! every row of that staff member's date. Overlays change how a cell looks
//! and suppress duration, never the shift record itself.

use chrono::NaiveDate;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use careshift_core::{CellKey, StaffId, YearMonth, ROWS_PER_DAY};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayKind {
    DayOffRequest,
    ScheduledDayOff,
}

impl OverlayKind {
    pub fn code(self) -> &'static str {
        match self {
            Self::DayOffRequest => "day_off_request",
            Self::ScheduledDayOff => "scheduled_day_off",
        }
    }
}

/// `staffId-date[-rowIndex]`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OverlayKey {
    pub staff: StaffId,
    pub date: NaiveDate,
    pub row: Option<u8>,
}

impl OverlayKey {
    pub fn whole_day(staff: impl Into<StaffId>, date: NaiveDate) -> Self {
        Self { staff: staff.into(), date, row: None }
    }

    pub fn slot(staff: impl Into<StaffId>, date: NaiveDate, row: u8) -> Self {
        Self { staff: staff.into(), date, row: Some(row) }
    }

    pub fn covers(&self, cell: &CellKey) -> bool {
        self.staff == cell.staff
            && self.date == cell.date
            && self.row.map_or(true, |r| r == cell.row)
    }

    /// Composite string form used by the remote maps.
    pub fn to_composite(&self) -> String {
        match self.row {
            Some(row) => format!("{}-{}-{}", self.staff, self.date.format("%Y-%m-%d"), row),
            None => format!("{}-{}", self.staff, self.date.format("%Y-%m-%d")),
        }
    }

    /// Parse the composite form. Staff ids may themselves contain dashes,
    /// so the date is located from the right.
    pub fn from_composite(s: &str) -> Option<Self> {
        let (head, row) = match s.rsplit_once('-') {
            Some((head, tail)) if tail.len() == 1 && tail.chars().all(|c| c.is_ascii_digit()) => {
                let row: u8 = tail.parse().ok()?;
                if row >= ROWS_PER_DAY {
                    return None;
                }
                (head, Some(row))
            }
            _ => (s, None),
        };
        if head.len() < 12 || !head.is_char_boundary(head.len() - 11) {
            return None;
        }
        let (staff, date) = head.split_at(head.len() - 11);
        let date = date.strip_prefix('-')?;
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
        if staff.is_empty() {
            return None;
        }
        Some(Self { staff: StaffId::new(staff), date, row })
    }
}

/// Overlay flags of one cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverlayState {
    pub day_off_requested: bool,
    pub scheduled_day_off: bool,
}

impl OverlayState {
    pub const CLEAR: OverlayState = OverlayState { day_off_requested: false, scheduled_day_off: false };

    /// Shifts on a day-off row carry no duration.
    pub fn suppresses_duration(&self) -> bool {
        self.day_off_requested || self.scheduled_day_off
    }

    pub fn is_clear(&self) -> bool {
        !self.suppresses_duration()
    }
}

/// One sparse overlay map; values are free-text notes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlayMap {
    entries: FxHashMap<OverlayKey, String>,
}

impl OverlayMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: OverlayKey, note: impl Into<String>) {
        self.entries.insert(key, note.into());
    }

    pub fn remove(&mut self, key: &OverlayKey) -> Option<String> {
        self.entries.remove(key)
    }

    pub fn covers(&self, cell: &CellKey) -> bool {
        self.entries.contains_key(&OverlayKey::slot(cell.staff.clone(), cell.date, cell.row))
            || self.entries.contains_key(&OverlayKey::whole_day(cell.staff.clone(), cell.date))
    }

    pub fn note_for(&self, cell: &CellKey) -> Option<&str> {
        self.entries
            .get(&OverlayKey::slot(cell.staff.clone(), cell.date, cell.row))
            .or_else(|| self.entries.get(&OverlayKey::whole_day(cell.staff.clone(), cell.date)))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OverlayKey, &String)> {
        self.entries.iter()
    }
}

/// Both overlay maps for the visible month range.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overlays {
    requests: OverlayMap,
    scheduled: OverlayMap,
}

impl Overlays {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw entries, keeping only those inside `months`.
    pub fn for_months(
        months: &[YearMonth],
        entries: impl IntoIterator<Item = (OverlayKind, OverlayKey, String)>,
    ) -> Self {
        let mut overlays = Self::new();
        for (kind, key, note) in entries {
            if months.iter().any(|m| m.contains(key.date)) {
                overlays.map_mut(kind).insert(key, note);
            }
        }
        overlays
    }

    pub fn map(&self, kind: OverlayKind) -> &OverlayMap {
        match kind {
            OverlayKind::DayOffRequest => &self.requests,
            OverlayKind::ScheduledDayOff => &self.scheduled,
        }
    }

    pub fn map_mut(&mut self, kind: OverlayKind) -> &mut OverlayMap {
        match kind {
            OverlayKind::DayOffRequest => &mut self.requests,
            OverlayKind::ScheduledDayOff => &mut self.scheduled,
        }
    }

    /// Replace one map's entries for a month, leaving other months intact.
    pub fn replace_month(
        &mut self,
        kind: OverlayKind,
        month: YearMonth,
        entries: impl IntoIterator<Item = (OverlayKey, String)>,
    ) {
        let map = self.map_mut(kind);
        map.entries.retain(|k, _| !month.contains(k.date));
        for (key, note) in entries {
            if month.contains(key.date) {
                map.insert(key, note);
            }
        }
    }

    pub fn state_for(&self, cell: &CellKey) -> OverlayState {
        OverlayState {
            day_off_requested: self.requests.covers(cell),
            scheduled_day_off: self.scheduled.covers(cell),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, d).unwrap()
    }

    #[test]
    fn test_composite_keys() {
        let whole = OverlayKey::whole_day("H1", date(5));
        assert_eq!(whole.to_composite(), "H1-2026-04-05");
        assert_eq!(OverlayKey::from_composite("H1-2026-04-05"), Some(whole));

        let slot = OverlayKey::slot("staff-a", date(5), 3);
        assert_eq!(slot.to_composite(), "staff-a-2026-04-05-3");
        assert_eq!(OverlayKey::from_composite("staff-a-2026-04-05-3"), Some(slot));

        assert_eq!(OverlayKey::from_composite("H1-2026-04-05-7"), None);
        assert_eq!(OverlayKey::from_composite("-2026-04-05"), None);
        assert_eq!(OverlayKey::from_composite("garbage"), None);
    }

    #[test]
    fn test_whole_day_covers_every_row() {
        let mut overlays = Overlays::new();
        overlays.map_mut(OverlayKind::DayOffRequest).insert(OverlayKey::whole_day("H1", date(5)), "");
        overlays.map_mut(OverlayKind::ScheduledDayOff).insert(OverlayKey::slot("H1", date(6), 2), "");

        for row in 0..ROWS_PER_DAY {
            assert!(overlays.state_for(&CellKey::new("H1", date(5), row)).day_off_requested);
        }
        assert!(overlays.state_for(&CellKey::new("H1", date(6), 2)).scheduled_day_off);
        assert!(overlays.state_for(&CellKey::new("H1", date(6), 3)).is_clear());
        assert!(overlays.state_for(&CellKey::new("H2", date(5), 0)).is_clear());
    }

    #[test]
    fn test_replace_month_keeps_other_months() {
        let mut overlays = Overlays::new();
        let may = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        overlays.map_mut(OverlayKind::DayOffRequest).insert(OverlayKey::whole_day("H1", date(5)), "");
        overlays.map_mut(OverlayKind::DayOffRequest).insert(OverlayKey::whole_day("H1", may), "");

        overlays.replace_month(
            OverlayKind::DayOffRequest,
            YearMonth::new(2026, 4),
            vec![(OverlayKey::whole_day("H2", date(9)), "通院".to_string())],
        );

        let map = overlays.map(OverlayKind::DayOffRequest);
        assert_eq!(map.len(), 2);
        assert_eq!(map.note_for(&CellKey::new("H2", date(9), 1)), Some("通院"));
        assert!(map.covers(&CellKey::new("H1", may, 0)));
        assert!(!map.covers(&CellKey::new("H1", date(5), 0)));
    }
}
