//! Payroll adjustment fields with per-field debounced saves.
//!
//! Rapid edits of one field coalesce via a generation counter: only the
//! latest generation is saved. Edits to different fields never cancel each
//! other.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use careshift_core::{StaffId, YearMonth};
use careshift_protocol::PayrollFieldDoc;

use crate::grid::ShiftGrid;

/// Keyed debounce timers.
#[derive(Debug)]
pub struct Debouncer<K: Ord + Clone> {
    delay: Duration,
    generation: u64,
    /// Latest generation and due time per key
    pending: BTreeMap<K, (u64, Instant)>,
}

impl<K: Ord + Clone> Debouncer<K> {
    pub fn new(delay: Duration) -> Self {
        Self { delay, generation: 0, pending: BTreeMap::new() }
    }

    /// (Re)start the timer for `key`. Returns the new generation.
    pub fn schedule(&mut self, key: K, now: Instant) -> u64 {
        self.generation += 1;
        self.pending.insert(key, (self.generation, now + self.delay));
        self.generation
    }

    /// Whether `generation` is still the latest one scheduled for `key`.
    pub fn is_current(&self, key: &K, generation: u64) -> bool {
        self.pending.get(key).map_or(false, |(g, _)| *g == generation)
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.pending.values().map(|(_, due)| *due).min()
    }

    pub fn take_due(&mut self, now: Instant) -> Vec<K> {
        let due: Vec<K> = self
            .pending
            .iter()
            .filter(|(_, (_, at))| *at <= now)
            .map(|(k, _)| k.clone())
            .collect();
        for key in &due {
            self.pending.remove(key);
        }
        due
    }

    pub fn take_all(&mut self) -> Vec<K> {
        std::mem::take(&mut self.pending).into_keys().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// `(month, staff, field)`
pub type PayrollKey = (YearMonth, StaffId, String);

#[derive(Debug)]
pub struct PayrollEditor {
    debouncer: Debouncer<PayrollKey>,
    values: BTreeMap<PayrollKey, f64>,
}

impl PayrollEditor {
    pub fn new(delay: Duration) -> Self {
        Self { debouncer: Debouncer::new(delay), values: BTreeMap::new() }
    }

    pub fn set(&mut self, key: PayrollKey, value: f64, now: Instant) {
        self.values.insert(key.clone(), value);
        self.debouncer.schedule(key, now);
    }

    pub fn value(&self, key: &PayrollKey) -> Option<f64> {
        self.values.get(key).copied()
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.debouncer.next_due()
    }

    pub fn has_pending(&self) -> bool {
        !self.debouncer.is_empty()
    }

    fn docs(&self, keys: Vec<PayrollKey>) -> Vec<PayrollFieldDoc> {
        keys.into_iter()
            .filter_map(|key| {
                let value = self.value(&key)?;
                let (month, staff, field) = key;
                Some(PayrollFieldDoc { month, staff_id: staff.as_str().to_string(), field, value })
            })
            .collect()
    }

    pub fn take_due(&mut self, now: Instant) -> Vec<PayrollFieldDoc> {
        let keys = self.debouncer.take_due(now);
        self.docs(keys)
    }

    pub fn take_all(&mut self) -> Vec<PayrollFieldDoc> {
        let keys = self.debouncer.take_all();
        self.docs(keys)
    }
}

impl ShiftGrid {
    /// Edit a payroll adjustment field; the save is debounced per field.
    pub fn set_payroll_field(&mut self, month: YearMonth, staff: &StaffId, field: &str, value: f64) {
        let now = self.clock.now();
        self.payroll.set((month, staff.clone(), field.to_string()), value, now);
    }

    pub fn payroll_field(&self, month: YearMonth, staff: &StaffId, field: &str) -> Option<f64> {
        self.payroll.value(&(month, staff.clone(), field.to_string()))
    }

    /// Payroll fields whose debounce has elapsed, ready to save.
    pub fn take_due_payroll(&mut self) -> Vec<PayrollFieldDoc> {
        let now = self.clock.now();
        self.payroll.take_due(now)
    }
}
