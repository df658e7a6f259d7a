//! A directory of JSON month files.
//!
//! ```text
//! <dir>/shifts-2026-04.json                      MonthSnapshot
//! <dir>/overlays-day_off_request-2026-04.json    OverlaySnapshot
//! <dir>/payroll.json                             [PayrollFieldDoc]
//! ```
//!
//! Files are replaced whole through a `.tmp` sibling and a rename. Writes
//! made through this handle (or a clone of it) are delivered to its
//! subscribers after the file lands; edits by other processes are not watched.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use careshift_core::YearMonth;
use careshift_engine::{OverlayKey, OverlayKind, ShiftRecord};
use careshift_protocol::{MonthSnapshot, OverlayDoc, OverlaySnapshot, PayrollFieldDoc, ShiftDoc};

use crate::{OverlayCallback, OverlayEntries, ShiftStore, SnapshotCallback, StoreError, Subscription};

type SharedShiftCallback = Arc<Mutex<SnapshotCallback>>;
type SharedOverlayCallback = Arc<Mutex<OverlayCallback>>;

#[derive(Default)]
struct Subscribers {
    shifts: Vec<(u64, YearMonth, SharedShiftCallback)>,
    overlays: Vec<(u64, OverlayKind, YearMonth, SharedOverlayCallback)>,
    next_id: u64,
}

impl Subscribers {
    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn remove(subs: &Weak<Mutex<Subscribers>>, id: u64) {
        if let Some(subs) = subs.upgrade() {
            let mut subs = subs.lock();
            subs.shifts.retain(|(sub, _, _)| *sub != id);
            subs.overlays.retain(|(sub, _, _, _)| *sub != id);
        }
    }
}

#[derive(Clone)]
pub struct JsonDirStore {
    dir: PathBuf,
    /// Serializes read-modify-write cycles
    write_lock: Arc<Mutex<()>>,
    subs: Arc<Mutex<Subscribers>>,
}

impl JsonDirStore {
    /// Open (creating if needed) a store directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, write_lock: Arc::new(Mutex::new(())), subs: Arc::default() })
    }

    pub fn subscriber_count(&self) -> usize {
        let subs = self.subs.lock();
        subs.shifts.len() + subs.overlays.len()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn shifts_path(&self, month: YearMonth) -> PathBuf {
        self.dir.join(format!("shifts-{}.json", month))
    }

    fn overlays_path(&self, kind: OverlayKind, month: YearMonth) -> PathBuf {
        self.dir.join(format!("overlays-{}-{}.json", kind.code(), month))
    }

    fn payroll_path(&self) -> PathBuf {
        self.dir.join("payroll.json")
    }

    fn read_month(&self, month: YearMonth) -> Result<MonthSnapshot, StoreError> {
        let path = self.shifts_path(month);
        if !path.exists() {
            return Ok(MonthSnapshot::new(month, Vec::new()));
        }
        let contents = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn write_month(&self, snapshot: &MonthSnapshot) -> Result<(), StoreError> {
        write_replacing(&self.shifts_path(snapshot.month), &serde_json::to_string_pretty(snapshot)?)
    }

    /// Send each listed month to its shift subscribers. Called without the
    /// write lock held so callbacks may read the store.
    fn notify_shifts(&self, months: &[YearMonth]) {
        let targets: Vec<(YearMonth, SharedShiftCallback)> = self
            .subs
            .lock()
            .shifts
            .iter()
            .filter(|(_, month, _)| months.contains(month))
            .map(|(_, month, cb)| (*month, Arc::clone(cb)))
            .collect();
        for (month, cb) in targets {
            match self.load_shifts(month) {
                Ok(records) => {
                    let mut guard = cb.lock();
                    let callback = &mut *guard;
                    callback(records);
                }
                Err(e) => log::warn!("reloading {} for subscribers: {}", month, e),
            }
        }
    }

    fn notify_overlays(&self, kind: OverlayKind, month: YearMonth) {
        let targets: Vec<SharedOverlayCallback> = self
            .subs
            .lock()
            .overlays
            .iter()
            .filter(|(_, k, m, _)| *k == kind && *m == month)
            .map(|(_, _, _, cb)| Arc::clone(cb))
            .collect();
        if targets.is_empty() {
            return;
        }
        match self.load_overlays(kind, month) {
            Ok(entries) => {
                for cb in targets {
                    let mut guard = cb.lock();
                    let callback = &mut *guard;
                    callback(entries.clone());
                }
            }
            Err(e) => log::warn!("reloading {:?} {} for subscribers: {}", kind, month, e),
        }
    }

    /// Months that have a shift file on disk.
    fn stored_months(&self) -> Result<Vec<YearMonth>, StoreError> {
        let mut months = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let name = entry?.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(stem) = name.strip_prefix("shifts-").and_then(|s| s.strip_suffix(".json")) else {
                continue;
            };
            if let Ok(month) = stem.parse::<YearMonth>() {
                months.push(month);
            }
        }
        months.sort();
        Ok(months)
    }

    fn to_records(&self, snapshot: MonthSnapshot) -> Vec<ShiftRecord> {
        let month = snapshot.month;
        let (records, errors) = snapshot.into_records();
        for e in errors {
            log::warn!("{}: skipping shift document: {}", self.shifts_path(month).display(), e);
        }
        records
    }
}

impl ShiftStore for JsonDirStore {
    fn load_shifts(&self, month: YearMonth) -> Result<Vec<ShiftRecord>, StoreError> {
        let snapshot = self.read_month(month)?;
        Ok(self.to_records(snapshot))
    }

    fn subscribe_shifts(
        &self,
        month: YearMonth,
        on_snapshot: SnapshotCallback,
    ) -> Result<Subscription, StoreError> {
        let initial = self.load_shifts(month)?;
        let cb: SharedShiftCallback = Arc::new(Mutex::new(on_snapshot));
        let id = {
            let mut subs = self.subs.lock();
            let id = subs.next();
            subs.shifts.push((id, month, Arc::clone(&cb)));
            id
        };
        {
            let mut guard = cb.lock();
            let callback = &mut *guard;
            callback(initial);
        }

        let weak = Arc::downgrade(&self.subs);
        Ok(Subscription::new(move || Subscribers::remove(&weak, id)))
    }

    fn save_shifts(&self, _month: YearMonth, records: &[ShiftRecord]) -> Result<(), StoreError> {
        let written = self.write_shifts(records)?;
        self.notify_shifts(&written);
        Ok(())
    }

    fn soft_delete(&self, id: &str) -> Result<(), StoreError> {
        if let Some(month) = self.write_tombstone(id)? {
            self.notify_shifts(&[month]);
        }
        Ok(())
    }

    fn load_overlays(&self, kind: OverlayKind, month: YearMonth) -> Result<OverlayEntries, StoreError> {
        let path = self.overlays_path(kind, month);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let snapshot: OverlaySnapshot = serde_json::from_str(&fs::read_to_string(&path)?)?;
        let mut entries = Vec::with_capacity(snapshot.entries.len());
        for doc in snapshot.entries {
            match doc.overlay_key() {
                Ok(key) => entries.push((key, doc.note)),
                Err(e) => log::warn!("{}: {}", path.display(), e),
            }
        }
        Ok(entries)
    }

    fn save_overlays(
        &self,
        kind: OverlayKind,
        month: YearMonth,
        entries: &[(OverlayKey, String)],
    ) -> Result<(), StoreError> {
        {
            let _guard = self.write_lock.lock();
            let snapshot = OverlaySnapshot {
                kind,
                month,
                entries: entries
                    .iter()
                    .filter(|(key, _)| month.contains(key.date))
                    .map(|(key, note)| OverlayDoc::new(key, note.clone()))
                    .collect(),
            };
            write_replacing(&self.overlays_path(kind, month), &serde_json::to_string_pretty(&snapshot)?)?;
        }
        self.notify_overlays(kind, month);
        Ok(())
    }

    fn subscribe_overlays(
        &self,
        kind: OverlayKind,
        month: YearMonth,
        on_snapshot: OverlayCallback,
    ) -> Result<Subscription, StoreError> {
        let initial = self.load_overlays(kind, month)?;
        let cb: SharedOverlayCallback = Arc::new(Mutex::new(on_snapshot));
        let id = {
            let mut subs = self.subs.lock();
            let id = subs.next();
            subs.overlays.push((id, kind, month, Arc::clone(&cb)));
            id
        };
        {
            let mut guard = cb.lock();
            let callback = &mut *guard;
            callback(initial);
        }

        let weak = Arc::downgrade(&self.subs);
        Ok(Subscription::new(move || Subscribers::remove(&weak, id)))
    }

    fn save_payroll_field(&self, field: &PayrollFieldDoc) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();
        let path = self.payroll_path();
        let mut fields: Vec<PayrollFieldDoc> = if path.exists() {
            serde_json::from_str(&fs::read_to_string(&path)?)?
        } else {
            Vec::new()
        };
        match fields
            .iter_mut()
            .find(|f| f.month == field.month && f.staff_id == field.staff_id && f.field == field.field)
        {
            Some(existing) => existing.value = field.value,
            None => fields.push(field.clone()),
        }
        write_replacing(&path, &serde_json::to_string_pretty(&fields)?)
    }
}

impl JsonDirStore {
    /// Upsert records into their month files. Returns the months rewritten.
    fn write_shifts(&self, records: &[ShiftRecord]) -> Result<Vec<YearMonth>, StoreError> {
        let _guard = self.write_lock.lock();
        let mut months = self.stored_months()?;
        for record in records {
            let month = record.key.month();
            if !months.contains(&month) {
                months.push(month);
            }
        }

        let mut written = Vec::new();
        for month in months {
            let mut snapshot = self.read_month(month)?;
            let before = snapshot.shifts.len();
            // A record that moved between months leaves its old month.
            snapshot
                .shifts
                .retain(|doc| !records.iter().any(|r| r.id == doc.id && r.key.month() != month));
            let mut changed = snapshot.shifts.len() != before;

            for record in records.iter().filter(|r| r.key.month() == month) {
                let doc = ShiftDoc::from(record);
                match snapshot.shifts.iter_mut().find(|d| d.id == doc.id) {
                    Some(existing) => *existing = doc,
                    None => snapshot.shifts.push(doc),
                }
                changed = true;
            }
            if changed {
                snapshot.shifts.sort_by(|a, b| {
                    (&a.staff_id, a.date, a.row_index, &a.id).cmp(&(&b.staff_id, b.date, b.row_index, &b.id))
                });
                self.write_month(&snapshot)?;
                written.push(month);
            }
        }
        Ok(written)
    }

    /// Tombstone a shift in whichever month holds it. Returns that month if
    /// the file changed.
    fn write_tombstone(&self, id: &str) -> Result<Option<YearMonth>, StoreError> {
        let _guard = self.write_lock.lock();
        for month in self.stored_months()? {
            let mut snapshot = self.read_month(month)?;
            if let Some(doc) = snapshot.shifts.iter_mut().find(|d| d.id == id) {
                if doc.deleted {
                    return Ok(None);
                }
                doc.deleted = true;
                self.write_month(&snapshot)?;
                return Ok(Some(month));
            }
        }
        log::debug!("soft delete of unknown shift {}", id);
        Ok(None)
    }
}

/// Replace `path` with `contents` through a `.tmp` sibling and a rename.
fn write_replacing(path: &Path, contents: &str) -> Result<(), StoreError> {
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, contents)?;
    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    Ok(())
}
