//! `careshift-grid`: the interactive shift grid.
//!
//! [`ShiftGrid`] owns the selection, the edit state machine, undo history,
//! the internal clipboard and the optimistic shift list. Every mutation goes
//! through one write path that updates the list synchronously, records an
//! undo group, protects the touched cells against stale remote echoes and
//! stages a store write. [`SyncWorker`] drains those writes on smol and
//! [`RemoteFeed`] delivers store snapshots back into the grid.

mod cancel;
pub mod clipboard;
pub mod clock;
mod drag;
mod editing;
pub mod error;
pub mod events;
pub mod grid;
pub mod history;
pub mod input;
pub mod mode;
pub mod outbox;
pub mod payroll;
pub mod reconcile;
pub mod sync;

pub use clipboard::{is_internal_paste, normalize_clipboard_text, plan_text_paste, CopiedCell, InternalClipboard};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::GridError;
pub use events::{EventCallback, EventCollector, GridEvent};
pub use grid::{CellWrite, ShiftGrid};
pub use history::{CellSnapshot, History, UndoGroup};
pub use input::{ClipboardPayload, InputEvent, InputOutcome, Key, Modifiers};
pub use mode::{EditMode, EditSession, GridMode};
pub use outbox::{PersistJob, PersistTiming};
pub use sync::{PersistOutcome, RemoteFeed, RemoteMessage, RetryPolicy, SyncBatch, SyncReport, SyncWorker};
