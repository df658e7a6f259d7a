//! The in-memory shift list, indexed by cell.

use chrono::NaiveDate;
use rustc_hash::FxHashMap;

use careshift_core::{CellKey, StaffId, YearMonth};

use crate::record::ShiftRecord;

/// At most one live record per cell. Tombstones are not kept here; the
/// persistence outbox tracks pending deletes.
#[derive(Debug, Clone, Default)]
pub struct ShiftBook {
    cells: FxHashMap<CellKey, ShiftRecord>,
}

impl ShiftBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a store snapshot. Deleted records are skipped; if two live
    /// records claim one cell the later mutation wins.
    pub fn from_records(records: impl IntoIterator<Item = ShiftRecord>) -> Self {
        let mut book = Self::new();
        for record in records.into_iter().filter(|r| !r.deleted) {
            match book.cells.get(&record.key) {
                Some(existing) if existing.updated_seq > record.updated_seq => {
                    log::debug!("duplicate shift at {}; keeping {}", record.key, existing.id);
                }
                _ => {
                    book.cells.insert(record.key.clone(), record);
                }
            }
        }
        book
    }

    pub fn get(&self, key: &CellKey) -> Option<&ShiftRecord> {
        self.cells.get(key)
    }

    pub fn get_mut(&mut self, key: &CellKey) -> Option<&mut ShiftRecord> {
        self.cells.get_mut(key)
    }

    /// Insert at the record's own key. Returns the record it displaced.
    pub fn upsert(&mut self, record: ShiftRecord) -> Option<ShiftRecord> {
        self.cells.insert(record.key.clone(), record)
    }

    pub fn remove(&mut self, key: &CellKey) -> Option<ShiftRecord> {
        self.cells.remove(key)
    }

    pub fn find_by_id(&self, id: &str) -> Option<&ShiftRecord> {
        self.cells.values().find(|r| r.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ShiftRecord> {
        self.cells.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &CellKey> {
        self.cells.keys()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Records in cell order (staff, date, row).
    pub fn sorted(&self) -> Vec<&ShiftRecord> {
        let mut records: Vec<_> = self.cells.values().collect();
        records.sort_by(|a, b| a.key.cmp(&b.key));
        records
    }

    pub fn records_for_day<'a>(
        &'a self,
        staff: &'a StaffId,
        date: NaiveDate,
    ) -> impl Iterator<Item = &'a ShiftRecord> + 'a {
        self.cells.values().filter(move |r| &r.key.staff == staff && r.key.date == date)
    }

    pub fn records_in_month(&self, month: YearMonth) -> Vec<ShiftRecord> {
        let mut records: Vec<_> =
            self.cells.values().filter(|r| month.contains(r.key.date)).cloned().collect();
        records.sort_by(|a, b| a.key.cmp(&b.key));
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ShiftFields;

    fn key(staff: &str, d: u32, row: u8) -> CellKey {
        CellKey::new(staff, NaiveDate::from_ymd_opt(2026, 4, d).unwrap(), row)
    }

    #[test]
    fn test_from_records_skips_tombstones_and_duplicates() {
        let mut old = ShiftRecord::with_id("a", key("H1", 5, 0), ShiftFields::default());
        old.updated_seq = 1;
        let mut newer = ShiftRecord::with_id("b", key("H1", 5, 0), ShiftFields::default());
        newer.updated_seq = 2;
        let mut gone = ShiftRecord::with_id("c", key("H1", 6, 0), ShiftFields::default());
        gone.deleted = true;

        let book = ShiftBook::from_records(vec![newer, old, gone]);
        assert_eq!(book.len(), 1);
        assert_eq!(book.get(&key("H1", 5, 0)).map(|r| r.id.as_str()), Some("b"));
        assert!(book.find_by_id("c").is_none());
    }

    #[test]
    fn test_day_and_month_queries() {
        let mut book = ShiftBook::new();
        book.upsert(ShiftRecord::with_id("a", key("H1", 5, 0), ShiftFields::default()));
        book.upsert(ShiftRecord::with_id("b", key("H1", 5, 3), ShiftFields::default()));
        book.upsert(ShiftRecord::with_id("c", key("H2", 5, 0), ShiftFields::default()));
        let may = CellKey::new("H1", NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(), 0);
        book.upsert(ShiftRecord::with_id("d", may, ShiftFields::default()));

        let h1 = StaffId::from("H1");
        let date = NaiveDate::from_ymd_opt(2026, 4, 5).unwrap();
        assert_eq!(book.records_for_day(&h1, date).count(), 2);

        let april: Vec<_> = book.records_in_month(YearMonth::new(2026, 4)).into_iter().map(|r| r.id).collect();
        assert_eq!(april, vec!["a", "b", "c"]);
    }
}
