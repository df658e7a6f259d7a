use std::collections::BTreeSet;

use crate::ids::{CellKey, CellLine};
use crate::layout::{GridLayout, GridPos};

/// The selection model: an anchor line plus additional selected cells.
///
/// The anchor is where typing goes. Extra cells come from shift-click
/// ranges or ctrl-click toggles and only matter for multi-cell operations
/// (delete, copy, broadcast paste). The anchor cell is never stored in the
/// extra set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    anchor: CellLine,
    extra: BTreeSet<CellKey>,
}

impl Selection {
    pub fn new(anchor: CellLine) -> Self {
        Self { anchor, extra: BTreeSet::new() }
    }

    pub fn anchor(&self) -> &CellLine {
        &self.anchor
    }

    pub fn active_cell(&self) -> &CellKey {
        &self.anchor.cell
    }

    pub fn line(&self) -> u8 {
        self.anchor.line
    }

    /// Set selection to a single line (click).
    pub fn select(&mut self, at: CellLine) {
        self.anchor = at;
        self.extra.clear();
    }

    /// Extend to the rectangle between the anchor cell and `target` (shift-click).
    pub fn extend_to(&mut self, layout: &GridLayout, target: &CellKey) {
        self.extra = layout
            .rect(&self.anchor.cell, target)
            .into_iter()
            .filter(|k| *k != self.anchor.cell)
            .collect();
    }

    /// Add or remove a cell from the extra set (ctrl-click).
    pub fn toggle(&mut self, key: CellKey) {
        if key == self.anchor.cell {
            return;
        }
        if !self.extra.remove(&key) {
            self.extra.insert(key);
        }
    }

    /// Drop the extra cells, keeping the anchor.
    pub fn collapse(&mut self) {
        self.extra.clear();
    }

    pub fn is_multi(&self) -> bool {
        !self.extra.is_empty()
    }

    pub fn contains(&self, key: &CellKey) -> bool {
        self.anchor.cell == *key || self.extra.contains(key)
    }

    pub fn cell_count(&self) -> usize {
        1 + self.extra.len()
    }

    /// All selected cells, anchor first.
    pub fn cells(&self) -> Vec<CellKey> {
        std::iter::once(self.anchor.cell.clone())
            .chain(self.extra.iter().cloned())
            .collect()
    }

    /// Top-left and bottom-right corners of the selected cells' bounding box.
    pub fn bounds(&self, layout: &GridLayout) -> Option<(GridPos, GridPos)> {
        let positions: Vec<GridPos> = self
            .cells()
            .iter()
            .filter_map(|k| layout.position_of(k))
            .collect();
        let min_col = positions.iter().map(|p| p.col).min()?;
        let max_col = positions.iter().map(|p| p.col).max()?;
        let min_slot = positions.iter().map(|p| p.slot).min()?;
        let max_slot = positions.iter().map(|p| p.slot).max()?;
        Some((GridPos { col: min_col, slot: min_slot }, GridPos { col: max_col, slot: max_slot }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::StaffId;
    use chrono::NaiveDate;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, d).unwrap()
    }

    fn layout() -> GridLayout {
        GridLayout::new(vec![StaffId::from("H1"), StaffId::from("H2")], vec![date(1), date(2)])
    }

    #[test]
    fn test_click_collapses_extra() {
        let l = layout();
        let mut sel = Selection::new(CellKey::new("H1", date(1), 0).line(0));
        sel.extend_to(&l, &CellKey::new("H2", date(1), 1));
        assert_eq!(sel.cell_count(), 4);
        sel.select(CellKey::new("H2", date(2), 0).line(2));
        assert!(!sel.is_multi());
        assert_eq!(sel.line(), 2);
    }

    #[test]
    fn test_toggle_never_adds_anchor() {
        let anchor = CellKey::new("H1", date(1), 0);
        let mut sel = Selection::new(anchor.line(0));
        sel.toggle(anchor.clone());
        assert!(!sel.is_multi());

        let other = CellKey::new("H2", date(2), 4);
        sel.toggle(other.clone());
        assert!(sel.contains(&other));
        sel.toggle(other.clone());
        assert!(!sel.contains(&other));
    }

    #[test]
    fn test_bounds() {
        let l = layout();
        let mut sel = Selection::new(CellKey::new("H2", date(1), 3).line(0));
        sel.toggle(CellKey::new("H1", date(2), 1));
        let (min, max) = sel.bounds(&l).unwrap();
        assert_eq!(min, GridPos { col: 0, slot: 3 });
        assert_eq!(max, GridPos { col: 1, slot: 6 });
        assert_eq!(sel.cells()[0], CellKey::new("H2", date(1), 3));
    }
}
