//! careshift store seam.
//!
//! The grid talks to persistence only through [`ShiftStore`]. Methods are
//! blocking; the grid's sync worker runs them off the input path. Two
//! implementations ship here: [`MemoryStore`], a multi-client in-process
//! store with live subscriptions, and [`JsonDirStore`], a directory of JSON
//! month files used by the CLI.

mod error;
mod json_dir;
mod memory;
mod subscription;

pub use error::StoreError;
pub use json_dir::JsonDirStore;
pub use memory::MemoryStore;
pub use subscription::Subscription;

use careshift_core::YearMonth;
use careshift_engine::{OverlayKey, OverlayKind, ShiftRecord};
use careshift_protocol::PayrollFieldDoc;

/// Receives the full month (tombstones included) on every change.
pub type SnapshotCallback = Box<dyn FnMut(Vec<ShiftRecord>) + Send>;

pub type OverlayEntries = Vec<(OverlayKey, String)>;
pub type OverlayCallback = Box<dyn FnMut(OverlayEntries) + Send>;

pub trait ShiftStore: Send + Sync {
    /// Every shift of the month, tombstones included.
    fn load_shifts(&self, month: YearMonth) -> Result<Vec<ShiftRecord>, StoreError>;

    /// Deliver the current month immediately, then again after every change
    /// until the returned subscription is dropped.
    fn subscribe_shifts(
        &self,
        month: YearMonth,
        on_snapshot: SnapshotCallback,
    ) -> Result<Subscription, StoreError>;

    /// Upsert by document id.
    fn save_shifts(&self, month: YearMonth, records: &[ShiftRecord]) -> Result<(), StoreError>;

    /// Tombstone a shift. Deleting an unknown or already deleted id succeeds.
    fn soft_delete(&self, id: &str) -> Result<(), StoreError>;

    fn load_overlays(&self, kind: OverlayKind, month: YearMonth) -> Result<OverlayEntries, StoreError>;

    /// Replace the month's entries of one overlay map.
    fn save_overlays(
        &self,
        kind: OverlayKind,
        month: YearMonth,
        entries: &[(OverlayKey, String)],
    ) -> Result<(), StoreError>;

    fn subscribe_overlays(
        &self,
        kind: OverlayKind,
        month: YearMonth,
        on_snapshot: OverlayCallback,
    ) -> Result<Subscription, StoreError>;

    fn save_payroll_field(&self, field: &PayrollFieldDoc) -> Result<(), StoreError>;
}
