//! Per-staff totals derived from the shift book.
//!
//! Daily buckets are keyed by `(staff, date)` so a single mutation only
//! recomputes the one or two days it touched. Monthly figures are summed
//! from the daily buckets on demand.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rustc_hash::FxHashMap;
use serde::Serialize;

use careshift_core::{StaffId, YearMonth};

use crate::book::ShiftBook;
use crate::record::{CancelStatus, ShiftRecord};
use crate::service::ServiceType;
use crate::time::round2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub count: u32,
    pub duration: f64,
    pub regular_hours: f64,
    pub night_hours: f64,
    pub regular_pay: f64,
    pub night_pay: f64,
    pub total_pay: f64,
}

impl Totals {
    fn add_record(&mut self, record: &ShiftRecord) {
        self.count += 1;
        self.duration = round2(self.duration + record.fields.duration.unwrap_or(0.0));
        self.add_pay(record);
    }

    fn add_pay(&mut self, record: &ShiftRecord) {
        let pay = &record.pay;
        self.regular_hours = round2(self.regular_hours + pay.regular_hours);
        self.night_hours = round2(self.night_hours + pay.night_hours);
        self.regular_pay += pay.regular_pay;
        self.night_pay += pay.night_pay;
        self.total_pay += pay.total_pay;
    }

    pub fn merge(&mut self, other: &Totals) {
        self.count += other.count;
        self.duration = round2(self.duration + other.duration);
        self.regular_hours = round2(self.regular_hours + other.regular_hours);
        self.night_hours = round2(self.night_hours + other.night_hours);
        self.regular_pay += other.regular_pay;
        self.night_pay += other.night_pay;
        self.total_pay += other.total_pay;
    }
}

fn counts_toward_totals(record: &ShiftRecord) -> bool {
    !record.deleted && record.cancel_status != CancelStatus::RemoveTime
}

type DayKey = (StaffId, NaiveDate);

#[derive(Debug, Clone, Default)]
pub struct Aggregates {
    daily: FxHashMap<DayKey, BTreeMap<ServiceType, Totals>>,
}

impl Aggregates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rebuild(book: &ShiftBook) -> Self {
        let mut aggregates = Self::new();
        for record in book.iter().filter(|r| counts_toward_totals(r)) {
            aggregates
                .daily
                .entry((record.key.staff.clone(), record.key.date))
                .or_default()
                .entry(record.fields.service_type)
                .or_default()
                .add_record(record);
        }
        aggregates
    }

    /// Refresh one `(staff, date)` bucket from the book.
    pub fn recompute_day(&mut self, book: &ShiftBook, staff: &StaffId, date: NaiveDate) {
        let mut day: BTreeMap<ServiceType, Totals> = BTreeMap::new();
        for record in book.records_for_day(staff, date).filter(|r| counts_toward_totals(r)) {
            day.entry(record.fields.service_type).or_default().add_record(record);
        }
        let key = (staff.clone(), date);
        if day.is_empty() {
            self.daily.remove(&key);
        } else {
            self.daily.insert(key, day);
        }
    }

    pub fn day(&self, staff: &StaffId, date: NaiveDate) -> Option<&BTreeMap<ServiceType, Totals>> {
        self.daily.get(&(staff.clone(), date))
    }

    pub fn day_total(&self, staff: &StaffId, date: NaiveDate) -> Totals {
        let mut total = Totals::default();
        for t in self.day(staff, date).into_iter().flat_map(|m| m.values()) {
            total.merge(t);
        }
        total
    }

    /// Monthly totals per service for one staff member.
    pub fn staff_totals(&self, staff: &StaffId, month: YearMonth) -> BTreeMap<ServiceType, Totals> {
        let mut out: BTreeMap<ServiceType, Totals> = BTreeMap::new();
        for ((s, date), services) in &self.daily {
            if s != staff || !month.contains(*date) {
                continue;
            }
            for (service, t) in services {
                out.entry(*service).or_default().merge(t);
            }
        }
        out
    }

    pub fn staff_grand_total(&self, staff: &StaffId, month: YearMonth) -> Totals {
        let mut total = Totals::default();
        for t in self.staff_totals(staff, month).values() {
            total.merge(t);
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pay::{pay_for, RateTablePayCalculator};
    use crate::record::ShiftFields;
    use crate::time::parse_clock;
    use careshift_core::CellKey;

    fn shift(d: u32, row: u8, service: ServiceType, from: &str, to: &str) -> ShiftRecord {
        let key = CellKey::new("H1", NaiveDate::from_ymd_opt(2026, 4, d).unwrap(), row);
        let fields = ShiftFields {
            start_time: parse_clock(from),
            end_time: parse_clock(to),
            service_type: service,
            ..Default::default()
        };
        let mut record = ShiftRecord::new(key, fields);
        record.fields.duration = record.fields.time_range().map(|r| r.hours());
        record.pay = pay_for(&record, &RateTablePayCalculator::default());
        record
    }

    #[test]
    fn test_monthly_totals_by_service() {
        let mut book = ShiftBook::new();
        book.upsert(shift(6, 0, ServiceType::Kaji, "09:00", "11:00"));
        book.upsert(shift(6, 1, ServiceType::Kaji, "13:00", "14:30"));
        book.upsert(shift(7, 0, ServiceType::Shintai, "09:00", "10:00"));

        let aggregates = Aggregates::rebuild(&book);
        let h1 = StaffId::from("H1");
        let totals = aggregates.staff_totals(&h1, YearMonth::new(2026, 4));
        assert_eq!(totals[&ServiceType::Kaji].count, 2);
        assert_eq!(totals[&ServiceType::Kaji].duration, 3.5);
        assert_eq!(totals[&ServiceType::Kaji].total_pay, 7000.0);
        assert_eq!(aggregates.staff_grand_total(&h1, YearMonth::new(2026, 4)).total_pay, 9400.0);
    }

    #[test]
    fn test_cancellations() {
        let mut book = ShiftBook::new();
        let mut kept = shift(6, 0, ServiceType::Kaji, "09:00", "10:00");
        kept.cancel_status = CancelStatus::KeepTime;
        let mut removed = shift(6, 1, ServiceType::Kaji, "11:00", "12:00");
        removed.cancel_status = CancelStatus::RemoveTime;
        book.upsert(kept);
        book.upsert(removed);

        let aggregates = Aggregates::rebuild(&book);
        let day = aggregates.day_total(&StaffId::from("H1"), NaiveDate::from_ymd_opt(2026, 4, 6).unwrap());
        assert_eq!(day.count, 1);
        assert_eq!(day.total_pay, 2000.0);
    }

    #[test]
    fn test_recompute_day_drops_emptied_bucket() {
        let mut book = ShiftBook::new();
        let record = shift(6, 0, ServiceType::Kaji, "09:00", "10:00");
        let key = record.key.clone();
        book.upsert(record);
        let mut aggregates = Aggregates::rebuild(&book);

        book.remove(&key);
        aggregates.recompute_day(&book, &key.staff, key.date);
        assert!(aggregates.day(&key.staff, key.date).is_none());
    }
}
