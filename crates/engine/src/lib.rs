//! `careshift-engine`: shift records and everything computed from them.
//!
//! Pure crate: no IO, no clocks. The grid crate drives it.

pub mod aggregate;
pub mod book;
pub mod codec;
pub mod color;
pub mod display;
pub mod overlay;
pub mod pay;
pub mod record;
pub mod service;
pub mod time;

pub use aggregate::{Aggregates, Totals};
pub use book::ShiftBook;
pub use color::CellColor;
pub use display::CellDisplay;
pub use overlay::{OverlayKey, OverlayKind, OverlayMap, OverlayState, Overlays};
pub use pay::{PayBreakdown, PayCalculator, RateTable, RateTablePayCalculator};
pub use record::{CancelStatus, ShiftFields, ShiftRecord};
pub use service::ServiceType;
pub use time::TimeRange;
