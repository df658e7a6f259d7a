//! `careshift-core`: addressing and layout types shared by every crate.
//!
//! A cell is addressed by `(staff, date, row)`; each cell carries four text
//! lines. The layout maps cells onto a 2-D grid (staff columns by date/row
//! slots) and the selection tracks the anchor line plus extra cells.

pub mod ids;
pub mod layout;
pub mod selection;

pub use ids::{CellKey, CellLine, StaffId, YearMonth, LINES_PER_CELL, ROWS_PER_DAY};
pub use layout::{GridLayout, GridPos, WeekTable};
pub use selection::Selection;
