//! Merging the remote snapshot feed with optimistic local edits.
//!
//! A cell is protected while it has an unacknowledged local write or while
//! its last local write is younger than the suppression window. Protected
//! cells keep local state; every other cell takes the remote state as is,
//! deletes included. Snapshots arriving while an edit is open are held back
//! (latest per month) and merged when the edit closes.

use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use rustc_hash::{FxHashMap, FxHashSet};

use careshift_core::{CellKey, StaffId, YearMonth};
use careshift_engine::pay::pay_for;
use careshift_engine::{OverlayKind, ShiftRecord};
use careshift_store::OverlayEntries;

use crate::events::GridEvent;
use crate::grid::ShiftGrid;

#[derive(Debug)]
pub struct Reconciler {
    window: Duration,
    /// Last local mutation per cell
    last_local: FxHashMap<CellKey, (u64, Instant)>,
    /// Highest unacknowledged local sequence per cell
    pending: FxHashMap<CellKey, u64>,
    deferred: BTreeMap<YearMonth, Vec<ShiftRecord>>,
}

impl Reconciler {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_local: FxHashMap::default(),
            pending: FxHashMap::default(),
            deferred: BTreeMap::new(),
        }
    }

    pub fn note_local(&mut self, key: &CellKey, seq: u64, now: Instant) {
        self.last_local.insert(key.clone(), (seq, now));
        self.pending.insert(key.clone(), seq);
    }

    /// The store accepted the writes to `keys` up to `seq`, except those
    /// to the `failed` cells.
    pub fn acknowledge(&mut self, keys: &[CellKey], seq: u64, failed: &[CellKey]) {
        for key in keys {
            if failed.contains(key) {
                continue;
            }
            if self.pending.get(key).map_or(false, |token| *token <= seq) {
                self.pending.remove(key);
            }
        }
    }

    /// Drop the token of a cell no staged write targets any more. The
    /// suppression window still applies.
    pub fn release(&mut self, key: &CellKey) {
        self.pending.remove(key);
    }

    pub fn has_pending(&self, key: &CellKey) -> bool {
        self.pending.contains_key(key)
    }

    pub fn is_protected(&self, key: &CellKey, now: Instant) -> bool {
        if self.pending.contains_key(key) {
            return true;
        }
        self.last_local
            .get(key)
            .map_or(false, |(_, at)| now.saturating_duration_since(*at) < self.window)
    }

    /// Forget window entries that can no longer protect anything.
    pub fn prune(&mut self, now: Instant) {
        let window = self.window;
        self.last_local.retain(|_, (_, at)| now.saturating_duration_since(*at) < window);
    }

    pub fn defer(&mut self, month: YearMonth, snapshot: Vec<ShiftRecord>) {
        self.deferred.insert(month, snapshot);
    }

    pub fn has_deferred(&self) -> bool {
        !self.deferred.is_empty()
    }

    pub fn take_deferred(&mut self) -> Vec<(YearMonth, Vec<ShiftRecord>)> {
        std::mem::take(&mut self.deferred).into_iter().collect()
    }
}

/// Fields that matter when comparing a local record with its remote copy.
fn same_content(a: &ShiftRecord, b: &ShiftRecord) -> bool {
    a.id == b.id
        && a.key == b.key
        && a.fields == b.fields
        && a.cancel_status == b.cancel_status
        && a.canceled_at == b.canceled_at
}

impl ShiftGrid {
    /// Merge an authoritative snapshot of one month.
    pub fn apply_remote_snapshot(&mut self, month: YearMonth, records: Vec<ShiftRecord>) {
        if self.mode.is_editing() {
            log::debug!("deferring {} snapshot ({} shifts) until edit closes", month, records.len());
            self.reconciler.defer(month, records);
            self.emit(GridEvent::SnapshotDeferred { month });
            return;
        }

        let now = self.clock.now();
        self.reconciler.prune(now);
        self.store_ids.extend(records.iter().map(|r| r.id.clone()));

        let mut remote: BTreeMap<CellKey, ShiftRecord> = BTreeMap::new();
        for mut record in records {
            if record.deleted || !month.contains(record.key.date) || !self.layout.contains(&record.key) {
                continue;
            }
            if self.outbox.is_pending_delete(&record.id) {
                continue;
            }
            record.persisted = true;
            remote.insert(record.key.clone(), record);
        }

        // Ids held locally by protected cells must not appear anywhere else.
        let protected_ids: FxHashSet<String> = self
            .book
            .iter()
            .filter(|r| self.reconciler.is_protected(&r.key, now))
            .map(|r| r.id.clone())
            .collect();

        let local_keys: Vec<CellKey> =
            self.book.keys().filter(|k| month.contains(k.date)).cloned().collect();
        let keys: BTreeSet<CellKey> = local_keys.into_iter().chain(remote.keys().cloned()).collect();

        let mut removals = Vec::new();
        let mut inserts = Vec::new();
        for key in keys {
            if self.reconciler.is_protected(&key, now) {
                continue;
            }
            let local = self.book.get(&key);
            match remote.remove(&key) {
                Some(r) if protected_ids.contains(&r.id) => {
                    log::debug!("ignoring stale remote copy of {} at {}", r.id, key);
                }
                Some(r) => match local {
                    Some(l) if same_content(l, &r) => {
                        if !l.persisted {
                            inserts.push(r);
                        }
                    }
                    _ => inserts.push(r),
                },
                None => {
                    if local.is_some() {
                        removals.push(key);
                    }
                }
            }
        }

        let mut changed = Vec::new();
        let mut days: BTreeSet<(StaffId, NaiveDate)> = BTreeSet::new();
        for key in removals {
            self.book.remove(&key);
            days.insert(key.day());
            changed.push(key);
        }
        for mut record in inserts {
            record.pay = pay_for(&record, self.calculator.as_ref());
            let differs = self.book.get(&record.key).map_or(true, |l| !same_content(l, &record));
            days.insert(record.key.day());
            if differs {
                changed.push(record.key.clone());
            }
            self.book.upsert(record);
        }
        for (staff, date) in &days {
            self.aggregates.recompute_day(&self.book, staff, *date);
        }

        if !changed.is_empty() {
            changed.sort();
            log::debug!("{}: {} cell(s) updated from remote", month, changed.len());
            self.emit(GridEvent::RemoteApplied { month, changed });
        }
    }

    /// Replace one overlay map's entries for a month.
    pub fn apply_remote_overlays(&mut self, kind: OverlayKind, month: YearMonth, entries: OverlayEntries) {
        self.overlays.replace_month(kind, month, entries);
    }

    /// Merge snapshots that arrived while an edit was open.
    pub(crate) fn flush_deferred(&mut self) {
        if self.mode.is_editing() || !self.reconciler.has_deferred() {
            return;
        }
        for (month, records) in self.reconciler.take_deferred() {
            self.apply_remote_snapshot(month, records);
        }
    }
}
