//! Pending store writes, grouped by month.
//!
//! Writes to the same document coalesce: only the latest upsert of an id is
//! kept, and a delete cancels any pending upsert of that id (and the other
//! way round). Each month queue has a due time; debounced writes push it
//! out, immediate writes pull it in.

use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

use careshift_core::{CellKey, YearMonth};
use careshift_engine::ShiftRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistTiming {
    Immediate,
    Debounced,
}

/// One batch of writes for one month, handed to the sync worker.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistJob {
    pub month: YearMonth,
    /// Highest local mutation sequence included
    pub seq: u64,
    pub upserts: Vec<ShiftRecord>,
    /// Document ids to tombstone, with the cell each one was cleared from
    pub deletes: Vec<(String, CellKey)>,
}

impl PersistJob {
    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.deletes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.upserts.len() + self.deletes.len()
    }

    /// Cells whose protection this job releases once the store accepts it.
    pub fn keys(&self) -> Vec<CellKey> {
        self.upserts
            .iter()
            .map(|r| r.key.clone())
            .chain(self.deletes.iter().map(|(_, key)| key.clone()))
            .collect()
    }
}

#[derive(Debug)]
struct MonthQueue {
    upserts: BTreeMap<String, ShiftRecord>,
    deletes: BTreeMap<String, CellKey>,
    seq: u64,
    due: Instant,
}

#[derive(Debug)]
pub struct Outbox {
    debounce: Duration,
    months: BTreeMap<YearMonth, MonthQueue>,
}

impl Outbox {
    pub fn new(debounce: Duration) -> Self {
        Self { debounce, months: BTreeMap::new() }
    }

    fn due_for(&self, timing: PersistTiming, now: Instant) -> Instant {
        match timing {
            PersistTiming::Immediate => now,
            PersistTiming::Debounced => now + self.debounce,
        }
    }

    fn queue(&mut self, month: YearMonth, seq: u64, timing: PersistTiming, now: Instant) -> &mut MonthQueue {
        let due = self.due_for(timing, now);
        let queue = self.months.entry(month).or_insert_with(|| MonthQueue {
            upserts: BTreeMap::new(),
            deletes: BTreeMap::new(),
            seq,
            due,
        });
        queue.seq = queue.seq.max(seq);
        queue.due = match timing {
            PersistTiming::Immediate => queue.due.min(due),
            PersistTiming::Debounced => queue.due.max(due),
        };
        queue
    }

    /// Drop every pending write of `id` in any month.
    fn forget(&mut self, id: &str) {
        for queue in self.months.values_mut() {
            queue.upserts.remove(id);
            queue.deletes.remove(id);
        }
        self.months.retain(|_, q| !q.upserts.is_empty() || !q.deletes.is_empty());
    }

    pub fn stage_upsert(&mut self, record: ShiftRecord, seq: u64, timing: PersistTiming, now: Instant) {
        self.forget(&record.id);
        let month = record.key.month();
        self.queue(month, seq, timing, now).upserts.insert(record.id.clone(), record);
    }

    /// Tombstone `id`, last seen at `key`.
    pub fn stage_delete(&mut self, key: &CellKey, id: &str, seq: u64, timing: PersistTiming, now: Instant) {
        self.forget(id);
        self.queue(key.month(), seq, timing, now).deletes.insert(id.to_string(), key.clone());
    }

    /// Forget a record the store never saw.
    pub fn discard(&mut self, id: &str) {
        self.forget(id);
    }

    pub fn is_pending_delete(&self, id: &str) -> bool {
        self.months.values().any(|q| q.deletes.contains_key(id))
    }

    /// Whether a staged write still targets `key`.
    pub fn covers(&self, key: &CellKey) -> bool {
        self.months.get(&key.month()).map_or(false, |q| {
            q.upserts.values().any(|r| &r.key == key) || q.deletes.values().any(|k| k == key)
        })
    }

    pub fn is_empty(&self) -> bool {
        self.months.values().all(|q| q.upserts.is_empty() && q.deletes.is_empty())
    }

    pub fn pending_len(&self) -> usize {
        self.months.values().map(|q| q.upserts.len() + q.deletes.len()).sum()
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.months.values().map(|q| q.due).min()
    }

    /// Jobs whose due time has passed.
    pub fn take_due(&mut self, now: Instant) -> Vec<PersistJob> {
        let due: Vec<YearMonth> =
            self.months.iter().filter(|(_, q)| q.due <= now).map(|(m, _)| *m).collect();
        due.into_iter().filter_map(|m| self.take_month(m)).collect()
    }

    /// Every pending job regardless of due time (teardown).
    pub fn take_all(&mut self) -> Vec<PersistJob> {
        let months: Vec<YearMonth> = self.months.keys().copied().collect();
        months.into_iter().filter_map(|m| self.take_month(m)).collect()
    }

    fn take_month(&mut self, month: YearMonth) -> Option<PersistJob> {
        let queue = self.months.remove(&month)?;
        let job = PersistJob {
            month,
            seq: queue.seq,
            upserts: queue.upserts.into_values().collect(),
            deletes: queue.deletes.into_iter().collect(),
        };
        (!job.is_empty()).then_some(job)
    }

    /// Put failed writes back, unless something newer for the same id has
    /// been staged since the job was taken.
    pub fn requeue(&mut self, job: PersistJob, now: Instant) {
        let pending: BTreeSet<String> = self
            .months
            .values()
            .flat_map(|q| q.upserts.keys().chain(q.deletes.keys()).cloned())
            .collect();
        let seq = job.seq;
        for record in job.upserts {
            if !pending.contains(&record.id) {
                self.queue(record.key.month(), seq, PersistTiming::Debounced, now)
                    .upserts
                    .insert(record.id.clone(), record);
            }
        }
        for (id, key) in job.deletes {
            if !pending.contains(&id) {
                self.queue(key.month(), seq, PersistTiming::Debounced, now).deletes.insert(id, key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use careshift_core::CellKey;
    use careshift_engine::ShiftFields;
    use chrono::{Datelike, NaiveDate};

    fn record(id: &str, day: u32) -> ShiftRecord {
        ShiftRecord::with_id(id, CellKey::new("H1", NaiveDate::from_ymd_opt(2026, 4, day).unwrap(), 0), ShiftFields::default())
    }

    #[test]
    fn test_latest_upsert_wins_and_delete_cancels() {
        let now = Instant::now();
        let mut outbox = Outbox::new(Duration::from_millis(800));
        outbox.stage_upsert(record("a", 5), 1, PersistTiming::Immediate, now);
        outbox.stage_upsert(record("a", 6), 2, PersistTiming::Immediate, now);
        outbox.stage_upsert(record("b", 7), 3, PersistTiming::Immediate, now);
        outbox.stage_delete(&record("b", 7).key, "b", 4, PersistTiming::Immediate, now);

        let jobs = outbox.take_due(now);
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].seq, 4);
        assert_eq!(jobs[0].upserts.len(), 1);
        assert_eq!(jobs[0].upserts[0].key.date.day0(), 5);
        assert_eq!(jobs[0].deletes, vec![("b".to_string(), record("b", 7).key)]);
        assert_eq!(jobs[0].keys(), vec![record("a", 6).key, record("b", 7).key]);
        assert!(outbox.is_empty());
    }

    #[test]
    fn test_debounce_delays_due_time() {
        let now = Instant::now();
        let mut outbox = Outbox::new(Duration::from_millis(800));
        outbox.stage_upsert(record("a", 5), 1, PersistTiming::Debounced, now);
        assert!(outbox.take_due(now + Duration::from_millis(500)).is_empty());
        outbox.stage_upsert(record("b", 5), 2, PersistTiming::Debounced, now + Duration::from_millis(500));
        assert!(outbox.take_due(now + Duration::from_millis(900)).is_empty());
        assert_eq!(outbox.take_due(now + Duration::from_millis(1300)).len(), 1);
    }

    #[test]
    fn test_requeue_skips_superseded_writes() {
        let now = Instant::now();
        let mut outbox = Outbox::new(Duration::from_millis(800));
        outbox.stage_upsert(record("a", 5), 1, PersistTiming::Immediate, now);
        outbox.stage_upsert(record("b", 5), 1, PersistTiming::Immediate, now);
        let job = outbox.take_due(now).remove(0);

        outbox.stage_upsert(record("a", 9), 2, PersistTiming::Immediate, now);
        outbox.requeue(job, now);
        let jobs = outbox.take_all();
        let mut ids: Vec<_> = jobs[0].upserts.iter().map(|r| (r.id.clone(), r.key.date.day0())).collect();
        ids.sort();
        assert_eq!(ids, vec![("a".to_string(), 8), ("b".to_string(), 4)]);
    }

    #[test]
    fn test_covers_follows_the_record() {
        let now = Instant::now();
        let mut outbox = Outbox::new(Duration::from_millis(800));
        outbox.stage_upsert(record("a", 5), 1, PersistTiming::Immediate, now);
        assert!(outbox.covers(&record("a", 5).key));

        // moved before the worker ran: only the new cell is still targeted
        outbox.stage_upsert(record("a", 6), 2, PersistTiming::Debounced, now);
        assert!(!outbox.covers(&record("a", 5).key));
        assert!(outbox.covers(&record("a", 6).key));

        outbox.discard("a");
        assert!(!outbox.covers(&record("a", 6).key));
    }
}
