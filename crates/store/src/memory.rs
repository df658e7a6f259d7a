//! In-process store shared by any number of grid instances.
//!
//! Every clone of a [`MemoryStore`] sees the same data, so two grids built on
//! clones behave like two clients of one backend. Subscribers are called
//! synchronously after each write, outside the store lock.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use careshift_core::YearMonth;
use careshift_engine::{OverlayKey, OverlayKind, ShiftRecord};
use careshift_protocol::PayrollFieldDoc;

use crate::{OverlayCallback, OverlayEntries, ShiftStore, SnapshotCallback, StoreError, Subscription};

type SharedShiftCallback = Arc<Mutex<SnapshotCallback>>;
type SharedOverlayCallback = Arc<Mutex<OverlayCallback>>;

#[derive(Default)]
struct Inner {
    /// All shifts by document id
    shifts: BTreeMap<String, ShiftRecord>,
    overlays: BTreeMap<(OverlayKind, YearMonth), OverlayEntries>,
    payroll: BTreeMap<(YearMonth, String, String), f64>,
    shift_subs: Vec<(u64, YearMonth, SharedShiftCallback)>,
    overlay_subs: Vec<(u64, OverlayKind, YearMonth, SharedOverlayCallback)>,
    next_sub: u64,
    fail_next: u32,
    write_calls: usize,
}

impl Inner {
    fn month_snapshot(&self, month: YearMonth) -> Vec<ShiftRecord> {
        let mut records: Vec<ShiftRecord> = self
            .shifts
            .values()
            .filter(|r| month.contains(r.key.date))
            .cloned()
            .map(|mut r| {
                r.persisted = true;
                r
            })
            .collect();
        records.sort_by(|a, b| a.key.cmp(&b.key).then_with(|| a.id.cmp(&b.id)));
        records
    }

    /// Count a write attempt and consume an injected failure if one is armed.
    fn begin_write(&mut self) -> Result<(), StoreError> {
        self.write_calls += 1;
        if self.fail_next > 0 {
            self.fail_next -= 1;
            return Err(StoreError::Unavailable("injected failure".to_string()));
        }
        Ok(())
    }

    fn upsert(&mut self, record: ShiftRecord, touched: &mut Vec<YearMonth>) {
        if let Some(previous) = self.shifts.get(&record.id) {
            touched.push(previous.key.month());
        }
        touched.push(record.key.month());
        self.shifts.insert(record.id.clone(), record);
    }

    fn tombstone(&mut self, id: &str, touched: &mut Vec<YearMonth>) {
        if let Some(record) = self.shifts.get_mut(id) {
            if !record.deleted {
                record.deleted = true;
                touched.push(record.key.month());
            }
        }
    }

    /// Pending deliveries for the given months.
    fn shift_deliveries(&self, months: &[YearMonth]) -> Vec<(SharedShiftCallback, Vec<ShiftRecord>)> {
        let mut out = Vec::new();
        for (_, month, cb) in &self.shift_subs {
            if months.contains(month) {
                out.push((Arc::clone(cb), self.month_snapshot(*month)));
            }
        }
        out
    }
}

fn deliver_shifts(deliveries: Vec<(SharedShiftCallback, Vec<ShiftRecord>)>) {
    for (cb, snapshot) in deliveries {
        let mut guard = cb.lock();
        let callback = &mut *guard;
        callback(snapshot);
    }
}

fn deliver_overlays(deliveries: Vec<(SharedOverlayCallback, OverlayEntries)>) {
    for (cb, entries) in deliveries {
        let mut guard = cb.lock();
        let callback = &mut *guard;
        callback(entries);
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with persisted shifts.
    pub fn with_shifts(records: impl IntoIterator<Item = ShiftRecord>) -> Self {
        let store = Self::new();
        {
            let mut inner = store.inner.lock();
            for mut record in records {
                record.persisted = true;
                inner.shifts.insert(record.id.clone(), record);
            }
        }
        store
    }

    /// Make the next `n` writes fail with [`StoreError::Unavailable`].
    pub fn fail_next(&self, n: u32) {
        self.inner.lock().fail_next = n;
    }

    /// Write attempts so far, failed ones included.
    pub fn write_calls(&self) -> usize {
        self.inner.lock().write_calls
    }

    pub fn shift(&self, id: &str) -> Option<ShiftRecord> {
        self.inner.lock().shifts.get(id).cloned()
    }

    pub fn live_count(&self, month: YearMonth) -> usize {
        self.inner.lock().month_snapshot(month).iter().filter(|r| !r.deleted).count()
    }

    pub fn payroll_value(&self, month: YearMonth, staff_id: &str, field: &str) -> Option<f64> {
        self.inner
            .lock()
            .payroll
            .get(&(month, staff_id.to_string(), field.to_string()))
            .copied()
    }

    pub fn subscriber_count(&self) -> usize {
        let inner = self.inner.lock();
        inner.shift_subs.len() + inner.overlay_subs.len()
    }

    /// Simulate another client writing a shift. Bypasses failure injection.
    pub fn put_remote(&self, record: ShiftRecord) {
        let deliveries = {
            let mut inner = self.inner.lock();
            let mut touched = Vec::new();
            inner.upsert(record, &mut touched);
            inner.shift_deliveries(&touched)
        };
        deliver_shifts(deliveries);
    }

    /// Simulate another client deleting a shift.
    pub fn delete_remote(&self, id: &str) {
        let deliveries = {
            let mut inner = self.inner.lock();
            let mut touched = Vec::new();
            inner.tombstone(id, &mut touched);
            inner.shift_deliveries(&touched)
        };
        deliver_shifts(deliveries);
    }

    fn unsubscribe(inner: &Weak<Mutex<Inner>>, id: u64) {
        if let Some(inner) = inner.upgrade() {
            let mut inner = inner.lock();
            inner.shift_subs.retain(|(sub, _, _)| *sub != id);
            inner.overlay_subs.retain(|(sub, _, _, _)| *sub != id);
        }
    }
}

impl ShiftStore for MemoryStore {
    fn load_shifts(&self, month: YearMonth) -> Result<Vec<ShiftRecord>, StoreError> {
        Ok(self.inner.lock().month_snapshot(month))
    }

    fn subscribe_shifts(
        &self,
        month: YearMonth,
        on_snapshot: SnapshotCallback,
    ) -> Result<Subscription, StoreError> {
        let cb: SharedShiftCallback = Arc::new(Mutex::new(on_snapshot));
        let (id, initial) = {
            let mut inner = self.inner.lock();
            inner.next_sub += 1;
            let id = inner.next_sub;
            inner.shift_subs.push((id, month, Arc::clone(&cb)));
            (id, inner.month_snapshot(month))
        };
        deliver_shifts(vec![(cb, initial)]);

        let weak = Arc::downgrade(&self.inner);
        Ok(Subscription::new(move || Self::unsubscribe(&weak, id)))
    }

    fn save_shifts(&self, month: YearMonth, records: &[ShiftRecord]) -> Result<(), StoreError> {
        let deliveries = {
            let mut inner = self.inner.lock();
            inner.begin_write()?;
            let mut touched = vec![month];
            for record in records {
                inner.upsert(record.clone(), &mut touched);
            }
            touched.sort();
            touched.dedup();
            inner.shift_deliveries(&touched)
        };
        deliver_shifts(deliveries);
        Ok(())
    }

    fn soft_delete(&self, id: &str) -> Result<(), StoreError> {
        let deliveries = {
            let mut inner = self.inner.lock();
            inner.begin_write()?;
            let mut touched = Vec::new();
            inner.tombstone(id, &mut touched);
            inner.shift_deliveries(&touched)
        };
        deliver_shifts(deliveries);
        Ok(())
    }

    fn load_overlays(&self, kind: OverlayKind, month: YearMonth) -> Result<OverlayEntries, StoreError> {
        Ok(self.inner.lock().overlays.get(&(kind, month)).cloned().unwrap_or_default())
    }

    fn save_overlays(
        &self,
        kind: OverlayKind,
        month: YearMonth,
        entries: &[(OverlayKey, String)],
    ) -> Result<(), StoreError> {
        let deliveries = {
            let mut inner = self.inner.lock();
            inner.begin_write()?;
            let entries: OverlayEntries =
                entries.iter().filter(|(k, _)| month.contains(k.date)).cloned().collect();
            inner.overlays.insert((kind, month), entries.clone());
            inner
                .overlay_subs
                .iter()
                .filter(|(_, k, m, _)| *k == kind && *m == month)
                .map(|(_, _, _, cb)| (Arc::clone(cb), entries.clone()))
                .collect::<Vec<_>>()
        };
        deliver_overlays(deliveries);
        Ok(())
    }

    fn subscribe_overlays(
        &self,
        kind: OverlayKind,
        month: YearMonth,
        on_snapshot: OverlayCallback,
    ) -> Result<Subscription, StoreError> {
        let cb: SharedOverlayCallback = Arc::new(Mutex::new(on_snapshot));
        let (id, initial) = {
            let mut inner = self.inner.lock();
            inner.next_sub += 1;
            let id = inner.next_sub;
            inner.overlay_subs.push((id, kind, month, Arc::clone(&cb)));
            (id, inner.overlays.get(&(kind, month)).cloned().unwrap_or_default())
        };
        deliver_overlays(vec![(cb, initial)]);

        let weak = Arc::downgrade(&self.inner);
        Ok(Subscription::new(move || Self::unsubscribe(&weak, id)))
    }

    fn save_payroll_field(&self, field: &PayrollFieldDoc) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.begin_write()?;
        inner
            .payroll
            .insert((field.month, field.staff_id.clone(), field.field.clone()), field.value);
        Ok(())
    }
}
