//! The grid: state plus the single write path every mutation goes through.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;
use rustc_hash::FxHashSet;

use careshift_config::GridSettings;
use careshift_core::{CellKey, GridLayout, Selection, StaffId, YearMonth};
use careshift_engine::pay::pay_for;
use careshift_engine::{
    Aggregates, CellDisplay, OverlayKind, Overlays, PayCalculator, RateTablePayCalculator, ShiftBook,
    ShiftRecord, Totals, ServiceType,
};
use careshift_engine::codec;
use careshift_store::ShiftStore;

use crate::clipboard::InternalClipboard;
use crate::clock::{Clock, SystemClock};
use crate::error::GridError;
use crate::events::{EventCallback, GridEvent};
use crate::history::{CellSnapshot, History, UndoGroup};
use crate::mode::GridMode;
use crate::outbox::{Outbox, PersistTiming};
use crate::payroll::PayrollEditor;
use crate::reconcile::Reconciler;

/// One cell-level write in a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum CellWrite {
    /// Store the record at its own key
    Upsert(ShiftRecord),
    /// Leave the cell empty
    Clear(CellKey),
}

impl CellWrite {
    pub fn key(&self) -> &CellKey {
        match self {
            CellWrite::Upsert(record) => &record.key,
            CellWrite::Clear(key) => key,
        }
    }
}

pub struct ShiftGrid {
    pub(crate) layout: GridLayout,
    pub(crate) book: ShiftBook,
    pub(crate) overlays: Overlays,
    pub(crate) selection: Selection,
    pub(crate) mode: GridMode,
    pub(crate) history: History,
    pub(crate) clipboard: Option<InternalClipboard>,
    pub(crate) calculator: Box<dyn PayCalculator + Send>,
    pub(crate) aggregates: Aggregates,
    pub(crate) reconciler: Reconciler,
    pub(crate) outbox: Outbox,
    pub(crate) payroll: PayrollEditor,
    /// Document ids the store has seen or may have seen (loaded, or handed
    /// to the sync worker)
    pub(crate) store_ids: FxHashSet<String>,
    pub(crate) clock: Arc<dyn Clock>,
    /// Logical local-mutation sequence
    pub(crate) seq: u64,
    listeners: Vec<EventCallback>,
    pub(crate) settings: GridSettings,
}

impl ShiftGrid {
    /// Empty grid over `layout`. The selection starts on the first cell.
    pub fn new(layout: GridLayout, settings: GridSettings) -> Result<Self, GridError> {
        let first = layout.first_cell().ok_or(GridError::EmptyLayout)?;
        let calculator = RateTablePayCalculator::new(settings.rates.clone());
        Ok(Self {
            layout,
            book: ShiftBook::new(),
            overlays: Overlays::new(),
            selection: Selection::new(first.line(0)),
            mode: GridMode::Selected,
            history: History::with_limit(settings.history.limit),
            clipboard: None,
            calculator: Box::new(calculator),
            aggregates: Aggregates::new(),
            reconciler: Reconciler::new(settings.sync.suppression_window()),
            outbox: Outbox::new(settings.sync.debounce()),
            payroll: PayrollEditor::new(settings.sync.payroll_debounce()),
            store_ids: FxHashSet::default(),
            clock: Arc::new(SystemClock),
            seq: 0,
            listeners: Vec::new(),
            settings,
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the pay calculator and recompute every record's pay.
    pub fn with_calculator(mut self, calculator: Box<dyn PayCalculator + Send>) -> Self {
        self.calculator = calculator;
        let keys: Vec<CellKey> = self.book.keys().cloned().collect();
        for key in keys {
            if let Some(record) = self.book.get(&key) {
                let pay = pay_for(record, self.calculator.as_ref());
                if let Some(record) = self.book.get_mut(&key) {
                    record.pay = pay;
                }
            }
        }
        self.aggregates = Aggregates::rebuild(&self.book);
        self
    }

    /// Grid loaded with every month its layout touches.
    pub fn load(
        store: &dyn ShiftStore,
        layout: GridLayout,
        settings: GridSettings,
    ) -> Result<Self, GridError> {
        let mut grid = Self::new(layout, settings)?;
        grid.reload_from(store)?;
        Ok(grid)
    }

    /// Replace local state with the store's. Pending local writes are kept
    /// in the outbox but the in-memory list is rebuilt from the store.
    pub fn reload_from(&mut self, store: &dyn ShiftStore) -> Result<(), GridError> {
        let mut records = Vec::new();
        let mut overlay_entries = Vec::new();
        for month in self.months() {
            records.extend(store.load_shifts(month)?);
            for kind in [OverlayKind::DayOffRequest, OverlayKind::ScheduledDayOff] {
                for (key, note) in store.load_overlays(kind, month)? {
                    overlay_entries.push((kind, key, note));
                }
            }
        }
        let months = self.months();
        self.overlays = Overlays::for_months(&months, overlay_entries);

        self.store_ids.extend(records.iter().map(|r| r.id.clone()));
        let mut book = ShiftBook::from_records(
            records.into_iter().filter(|r| self.layout.contains(&r.key)),
        );
        let keys: Vec<CellKey> = book.keys().cloned().collect();
        for key in keys {
            if let Some(record) = book.get_mut(&key) {
                record.persisted = true;
                record.pay = pay_for(record, self.calculator.as_ref());
            }
        }
        self.book = book;
        self.aggregates = Aggregates::rebuild(&self.book);
        log::info!("loaded {} shifts for {} month(s)", self.book.len(), months.len());
        Ok(())
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    /// Months covered by the layout's dates, ascending.
    pub fn months(&self) -> Vec<YearMonth> {
        let mut months: Vec<YearMonth> = self.layout.dates().iter().map(|d| YearMonth::of(*d)).collect();
        months.dedup();
        months
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn mode(&self) -> &GridMode {
        &self.mode
    }

    pub fn is_editing(&self) -> bool {
        self.mode.is_editing()
    }

    pub fn overlays(&self) -> &Overlays {
        &self.overlays
    }

    pub fn overlays_mut(&mut self) -> &mut Overlays {
        &mut self.overlays
    }

    pub fn settings(&self) -> &GridSettings {
        &self.settings
    }

    pub fn shift_at(&self, key: &CellKey) -> Option<&ShiftRecord> {
        self.book.get(key)
    }

    /// Live records in cell order.
    pub fn shifts(&self) -> Vec<&ShiftRecord> {
        self.book.sorted()
    }

    pub fn shift_count(&self) -> usize {
        self.book.len()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn pending_writes(&self) -> usize {
        self.outbox.pending_len()
    }

    pub fn cell_display(&self, staff: &StaffId, date: NaiveDate, row: u8) -> CellDisplay {
        self.display_of(&CellKey::new(staff.clone(), date, row))
    }

    pub(crate) fn display_of(&self, key: &CellKey) -> CellDisplay {
        CellDisplay::project(self.book.get(key), self.overlays.state_for(key))
    }

    /// Text of one line as currently displayed.
    pub fn line_text(&self, key: &CellKey, line: u8) -> String {
        self.book.get(key).map(|r| codec::encode_line(&r.fields, line)).unwrap_or_default()
    }

    pub fn day_totals(&self, staff: &StaffId, date: NaiveDate) -> Totals {
        self.aggregates.day_total(staff, date)
    }

    pub fn staff_totals(&self, staff: &StaffId, month: YearMonth) -> std::collections::BTreeMap<ServiceType, Totals> {
        self.aggregates.staff_totals(staff, month)
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// Register a listener. Listeners are called synchronously.
    pub fn on_event(&mut self, callback: EventCallback) {
        self.listeners.push(callback);
    }

    pub(crate) fn emit(&mut self, event: GridEvent) {
        for listener in &mut self.listeners {
            listener(&event);
        }
    }

    // ------------------------------------------------------------------
    // Write path
    // ------------------------------------------------------------------

    pub(crate) fn snapshot_cell(&self, key: &CellKey) -> CellSnapshot {
        let display = self.display_of(key);
        CellSnapshot {
            key: key.clone(),
            lines: display.lines,
            background: display.background,
            record: self.book.get(key).cloned(),
        }
    }

    /// Drop a record from the store's view: tombstone it if the store may
    /// know it, otherwise just forget any pending write.
    fn retire(&mut self, record: &ShiftRecord, seq: u64, timing: PersistTiming) {
        if self.store_ids.contains(&record.id) {
            let now = self.clock.now();
            self.outbox.stage_delete(&record.key, &record.id, seq, timing, now);
        } else {
            self.outbox.discard(&record.id);
        }
    }

    /// Apply a batch of writes as one logical mutation and return the
    /// before-state of every affected cell.
    ///
    /// Clears run before upserts so a record can move within one batch. A
    /// record displaced from its cell is deleted unless the same batch
    /// writes it somewhere else.
    pub(crate) fn apply_writes(&mut self, writes: Vec<CellWrite>, timing: PersistTiming) -> Vec<CellSnapshot> {
        let mut before = Vec::new();
        let mut seen: FxHashSet<CellKey> = FxHashSet::default();
        for write in &writes {
            if seen.insert(write.key().clone()) {
                before.push(self.snapshot_cell(write.key()));
            }
        }
        if writes.is_empty() {
            return before;
        }

        self.seq += 1;
        let seq = self.seq;
        let now = self.clock.now();

        let (mut clears, mut upserts) = (Vec::new(), Vec::new());
        for write in writes {
            match write {
                CellWrite::Clear(key) => clears.push(key),
                CellWrite::Upsert(record) if codec::is_blank(&record.fields) => clears.push(record.key),
                CellWrite::Upsert(record) => upserts.push(record),
            }
        }
        let kept_ids: FxHashSet<String> = upserts.iter().map(|r| r.id.clone()).collect();

        let mut days: BTreeSet<(StaffId, NaiveDate)> = BTreeSet::new();
        let mut cleared = Vec::new();
        for key in clears {
            if let Some(old) = self.book.remove(&key) {
                if !kept_ids.contains(&old.id) {
                    self.retire(&old, seq, timing);
                }
                cleared.push(key.clone());
            }
            days.insert(key.day());
            self.reconciler.note_local(&key, seq, now);
        }

        let mut written = Vec::with_capacity(upserts.len());
        for mut record in upserts {
            record.updated_seq = seq;
            record.deleted = false;
            record.persisted = self.store_ids.contains(&record.id) && record.persisted;
            record.pay = pay_for(&record, self.calculator.as_ref());
            if let Some(previous) = self.book.upsert(record.clone()) {
                if previous.id != record.id && !kept_ids.contains(&previous.id) {
                    self.retire(&previous, seq, timing);
                }
            }
            days.insert(record.key.day());
            self.reconciler.note_local(&record.key, seq, now);
            self.outbox.stage_upsert(record.clone(), seq, timing, now);
            written.push(record);
        }
        cleared.retain(|k| self.book.get(k).is_none());

        // Cells no staged write targets any more hold no token.
        for snapshot in &before {
            if !self.outbox.covers(&snapshot.key) {
                self.reconciler.release(&snapshot.key);
            }
        }

        for (staff, date) in &days {
            self.aggregates.recompute_day(&self.book, staff, *date);
        }

        self.emit(GridEvent::ShiftsUpdated {
            shifts: written,
            cleared,
            debounce: timing == PersistTiming::Debounced,
        });
        before
    }

    /// Apply writes and record them as one undo group. Clearing an already
    /// empty cell is not a change.
    pub(crate) fn apply_group(&mut self, label: &'static str, mut writes: Vec<CellWrite>, timing: PersistTiming) -> bool {
        writes.retain(|write| match write {
            CellWrite::Clear(key) => self.book.get(key).is_some(),
            CellWrite::Upsert(record) => {
                !codec::is_blank(&record.fields) || self.book.get(&record.key).is_some()
            }
        });
        if writes.is_empty() {
            return false;
        }
        let before = self.apply_writes(writes, timing);
        self.history.push(UndoGroup::new(label, before));
        true
    }

    /// Write that puts a snapshot's state back.
    fn restore_write(entry: &CellSnapshot) -> CellWrite {
        match &entry.record {
            Some(record) => {
                let mut record = record.clone();
                record.key = entry.key.clone();
                CellWrite::Upsert(record)
            }
            None => CellWrite::Clear(entry.key.clone()),
        }
    }

    // ------------------------------------------------------------------
    // Undo / redo
    // ------------------------------------------------------------------

    /// Undo the last action. An open edit is discarded first.
    pub fn undo(&mut self) -> bool {
        let discarded = self.mode.is_editing();
        if discarded {
            self.cancel_edit();
        }
        let Some(group) = self.history.pop_undo() else {
            return discarded;
        };
        let writes = group.entries.iter().map(Self::restore_write).collect();
        let after = self.apply_writes(writes, PersistTiming::Immediate);
        self.focus_group(&group);
        self.history.push_redo(UndoGroup::new(group.label, after));
        true
    }

    pub fn redo(&mut self) -> bool {
        if self.mode.is_editing() {
            return false;
        }
        let Some(group) = self.history.pop_redo() else {
            return false;
        };
        let writes = group.entries.iter().map(Self::restore_write).collect();
        let before = self.apply_writes(writes, PersistTiming::Immediate);
        self.focus_group(&group);
        self.history.push_undo_keep_redo(UndoGroup::new(group.label, before));
        true
    }

    /// Move the selection to the first cell an undo/redo touched.
    fn focus_group(&mut self, group: &UndoGroup) {
        if let Some(first) = group.entries.first() {
            if self.layout.contains(&first.key) {
                let line = self.selection.line();
                self.selection.select(first.key.line(line));
            }
        }
    }
}
