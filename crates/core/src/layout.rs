//! Grid geometry.
//!
//! Columns are staff members in display order. The vertical axis is a
//! sequence of slots, one per `(date, row)`, dates ascending and rows
//! 0..ROWS_PER_DAY within each date. Week tables only group dates for
//! display; navigation walks the slot sequence straight through them.

use chrono::{Datelike, NaiveDate, Weekday};

use crate::ids::{CellKey, CellLine, StaffId, YearMonth, LINES_PER_CELL, ROWS_PER_DAY};

/// Column/slot coordinates of a cell inside a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridPos {
    pub col: usize,
    pub slot: usize,
}

/// Consecutive dates rendered as one table (Monday-first weeks).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekTable {
    pub index: usize,
    pub dates: Vec<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridLayout {
    staff: Vec<StaffId>,
    dates: Vec<NaiveDate>,
}

impl GridLayout {
    /// Create a layout; dates are sorted and de-duplicated.
    pub fn new(staff: Vec<StaffId>, mut dates: Vec<NaiveDate>) -> Self {
        dates.sort();
        dates.dedup();
        Self { staff, dates }
    }

    /// Layout covering every date of a month.
    pub fn for_month(month: YearMonth, staff: Vec<StaffId>) -> Self {
        Self::new(staff, month.days())
    }

    pub fn staff(&self) -> &[StaffId] {
        &self.staff
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn is_empty(&self) -> bool {
        self.staff.is_empty() || self.dates.is_empty()
    }

    pub fn col_count(&self) -> usize {
        self.staff.len()
    }

    pub fn slot_count(&self) -> usize {
        self.dates.len() * ROWS_PER_DAY as usize
    }

    /// First cell in display order.
    pub fn first_cell(&self) -> Option<CellKey> {
        self.cell_at(GridPos { col: 0, slot: 0 })
    }

    pub fn contains(&self, key: &CellKey) -> bool {
        self.position_of(key).is_some()
    }

    pub fn position_of(&self, key: &CellKey) -> Option<GridPos> {
        if key.row >= ROWS_PER_DAY {
            return None;
        }
        let col = self.staff.iter().position(|s| *s == key.staff)?;
        let day = self.dates.binary_search(&key.date).ok()?;
        Some(GridPos { col, slot: day * ROWS_PER_DAY as usize + key.row as usize })
    }

    pub fn cell_at(&self, pos: GridPos) -> Option<CellKey> {
        let staff = self.staff.get(pos.col)?;
        let date = self.dates.get(pos.slot / ROWS_PER_DAY as usize)?;
        let row = (pos.slot % ROWS_PER_DAY as usize) as u8;
        Some(CellKey::new(staff.clone(), *date, row))
    }

    /// Cell `d_col` columns right and `d_slot` slots down from `origin`.
    pub fn offset(&self, origin: &CellKey, d_col: usize, d_slot: usize) -> Option<CellKey> {
        let pos = self.position_of(origin)?;
        self.cell_at(GridPos { col: pos.col + d_col, slot: pos.slot + d_slot })
    }

    /// Next line in reading order: the following line of the same cell,
    /// then line 0 of the next slot. `None` past the last line of the grid.
    pub fn line_below(&self, at: &CellLine) -> Option<CellLine> {
        if at.line + 1 < LINES_PER_CELL {
            return Some(CellLine::new(at.cell.clone(), at.line + 1));
        }
        let pos = self.position_of(&at.cell)?;
        let next = self.cell_at(GridPos { col: pos.col, slot: pos.slot + 1 })?;
        Some(next.line(0))
    }

    pub fn line_above(&self, at: &CellLine) -> Option<CellLine> {
        if at.line > 0 {
            return Some(CellLine::new(at.cell.clone(), at.line - 1));
        }
        let pos = self.position_of(&at.cell)?;
        let slot = pos.slot.checked_sub(1)?;
        let prev = self.cell_at(GridPos { col: pos.col, slot })?;
        Some(prev.line(LINES_PER_CELL - 1))
    }

    /// Same slot in the neighbouring staff column (`step` = +1 right, -1 left).
    pub fn adjacent_cell(&self, key: &CellKey, step: isize) -> Option<CellKey> {
        let pos = self.position_of(key)?;
        let col = pos.col.checked_add_signed(step)?;
        self.cell_at(GridPos { col, slot: pos.slot })
    }

    /// All cells of the rectangle spanned by two corners, slot-major.
    pub fn rect(&self, a: &CellKey, b: &CellKey) -> Vec<CellKey> {
        let (Some(pa), Some(pb)) = (self.position_of(a), self.position_of(b)) else {
            return Vec::new();
        };
        let (c0, c1) = (pa.col.min(pb.col), pa.col.max(pb.col));
        let (s0, s1) = (pa.slot.min(pb.slot), pa.slot.max(pb.slot));
        (s0..=s1)
            .flat_map(|slot| (c0..=c1).map(move |col| GridPos { col, slot }))
            .filter_map(|pos| self.cell_at(pos))
            .collect()
    }

    /// Monday-first week tables covering the layout's dates.
    pub fn week_tables(&self) -> Vec<WeekTable> {
        let mut tables: Vec<WeekTable> = Vec::new();
        for date in &self.dates {
            let week_start = date.week(Weekday::Mon).first_day();
            match tables.last_mut() {
                Some(table)
                    if table
                        .dates
                        .first()
                        .map(|d| d.week(Weekday::Mon).first_day() == week_start)
                        .unwrap_or(false) =>
                {
                    table.dates.push(*date);
                }
                _ => {
                    let index = tables.len();
                    tables.push(WeekTable { index, dates: vec![*date] });
                }
            }
        }
        tables
    }

    /// Index of the week table holding `date`.
    pub fn week_index_of(&self, date: NaiveDate) -> Option<usize> {
        self.week_tables()
            .iter()
            .find(|t| t.dates.contains(&date))
            .map(|t| t.index)
    }

    /// Weekday of the slot's date; used by renderers for header coloring.
    pub fn weekday_of(&self, key: &CellKey) -> Weekday {
        key.date.weekday()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, d).unwrap()
    }

    fn layout() -> GridLayout {
        GridLayout::new(
            vec![StaffId::from("H1"), StaffId::from("H2"), StaffId::from("H3")],
            vec![date(2), date(1), date(3)],
        )
    }

    #[test]
    fn test_position_round_trip() {
        let l = layout();
        let key = CellKey::new("H2", date(2), 3);
        let pos = l.position_of(&key).unwrap();
        assert_eq!(pos, GridPos { col: 1, slot: 8 });
        assert_eq!(l.cell_at(pos), Some(key));
        assert_eq!(l.slot_count(), 15);
    }

    #[test]
    fn test_unknown_cells_are_outside() {
        let l = layout();
        assert!(!l.contains(&CellKey::new("H9", date(1), 0)));
        assert!(!l.contains(&CellKey::new("H1", date(9), 0)));
        assert!(!l.contains(&CellKey::new("H1", date(1), ROWS_PER_DAY)));
    }

    #[test]
    fn test_line_below_wraps_to_next_slot_and_date() {
        let l = layout();
        let last_line = CellKey::new("H1", date(1), 0).line(3);
        assert_eq!(l.line_below(&last_line), Some(CellKey::new("H1", date(1), 1).line(0)));

        let last_row = CellKey::new("H1", date(1), 4).line(3);
        assert_eq!(l.line_below(&last_row), Some(CellKey::new("H1", date(2), 0).line(0)));

        let grid_end = CellKey::new("H1", date(3), 4).line(3);
        assert_eq!(l.line_below(&grid_end), None);
    }

    #[test]
    fn test_line_above_is_inverse() {
        let l = layout();
        let at = CellKey::new("H3", date(2), 0).line(0);
        let above = l.line_above(&at).unwrap();
        assert_eq!(above, CellKey::new("H3", date(1), 4).line(3));
        assert_eq!(l.line_below(&above), Some(at));
        assert_eq!(l.line_above(&CellKey::new("H1", date(1), 0).line(0)), None);
    }

    #[test]
    fn test_adjacent_cell() {
        let l = layout();
        let key = CellKey::new("H1", date(1), 2);
        assert_eq!(l.adjacent_cell(&key, 1), Some(CellKey::new("H2", date(1), 2)));
        assert_eq!(l.adjacent_cell(&key, -1), None);
        let last = CellKey::new("H3", date(1), 2);
        assert_eq!(l.adjacent_cell(&last, 1), None);
    }

    #[test]
    fn test_rect_is_slot_major() {
        let l = layout();
        let cells = l.rect(&CellKey::new("H2", date(1), 1), &CellKey::new("H1", date(1), 0));
        assert_eq!(
            cells,
            vec![
                CellKey::new("H1", date(1), 0),
                CellKey::new("H2", date(1), 0),
                CellKey::new("H1", date(1), 1),
                CellKey::new("H2", date(1), 1),
            ]
        );
    }

    #[test]
    fn test_week_tables_split_on_monday() {
        // April 2026: the 1st is a Wednesday, the 6th a Monday.
        let l = GridLayout::for_month(YearMonth::new(2026, 4), vec![StaffId::from("H1")]);
        let tables = l.week_tables();
        assert_eq!(tables[0].dates.len(), 5);
        assert_eq!(tables[1].dates.first(), Some(&date(6)));
        assert_eq!(l.week_index_of(date(6)), Some(1));
        assert_eq!(tables.iter().map(|t| t.dates.len()).sum::<usize>(), 30);
    }
}
