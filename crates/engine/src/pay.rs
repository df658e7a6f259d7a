//! Pay calculation seam.
//!
//! The grid never computes money itself: every mutation runs the record
//! through a [`PayCalculator`] and stores the resulting breakdown on the
//! record. [`RateTablePayCalculator`] is the bundled implementation driven by
//! a configurable [`RateTable`].

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::record::{CancelStatus, ShiftRecord};
use crate::service::ServiceType;
use crate::time::{round2, TimeRange};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayBreakdown {
    pub regular_hours: f64,
    pub night_hours: f64,
    pub regular_pay: f64,
    pub night_pay: f64,
    pub total_pay: f64,
}

impl PayBreakdown {
    pub const ZERO: PayBreakdown = PayBreakdown {
        regular_hours: 0.0,
        night_hours: 0.0,
        regular_pay: 0.0,
        night_pay: 0.0,
        total_pay: 0.0,
    };

    pub fn total_hours(&self) -> f64 {
        round2(self.regular_hours + self.night_hours)
    }
}

/// `date` selects the holiday rate table.
pub trait PayCalculator {
    fn compute_pay(&self, service: ServiceType, range: &TimeRange, date: NaiveDate) -> PayBreakdown;
}

/// Pay for a record as it currently stands.
///
/// Removed-time cancellations and records without a complete time range earn
/// nothing; keep-time cancellations are paid as worked.
pub fn pay_for(record: &ShiftRecord, calc: &dyn PayCalculator) -> PayBreakdown {
    if record.deleted || record.cancel_status == CancelStatus::RemoveTime {
        return PayBreakdown::ZERO;
    }
    match record.fields.time_range() {
        Some(range) => calc.compute_pay(record.fields.service_type, &range, record.key.date),
        None => PayBreakdown::ZERO,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateTable {
    /// Hourly rate per service code; services not listed use `default_hourly`
    pub hourly: BTreeMap<String, f64>,
    pub default_hourly: f64,
    pub night_multiplier: f64,
    /// Hour of day the night window opens
    pub night_start_hour: u32,
    /// Hour of day the night window closes (next morning when below start)
    pub night_end_hour: u32,
    pub holiday_multiplier: f64,
    pub holidays: Vec<NaiveDate>,
    /// Treat Dec 31 through Jan 3 as holidays
    pub year_end_holidays: bool,
}

impl Default for RateTable {
    fn default() -> Self {
        let hourly = [
            (ServiceType::Shintai, 2400.0),
            (ServiceType::Kaji, 2000.0),
            (ServiceType::Judo, 2200.0),
            (ServiceType::Tsuin, 2400.0),
            (ServiceType::Kodo, 2200.0),
            (ServiceType::Ido, 2000.0),
            (ServiceType::Doko, 2200.0),
            (ServiceType::Kaigi, 1200.0),
            (ServiceType::Kenshu, 1200.0),
        ]
        .into_iter()
        .map(|(s, rate)| (s.code().to_string(), rate))
        .collect();

        Self {
            hourly,
            default_hourly: 2000.0,
            night_multiplier: 1.25,
            night_start_hour: 22,
            night_end_hour: 6,
            holiday_multiplier: 1.0,
            holidays: Vec::new(),
            year_end_holidays: true,
        }
    }
}

impl RateTable {
    pub fn hourly_rate(&self, service: ServiceType) -> f64 {
        self.hourly.get(service.code()).copied().unwrap_or(self.default_hourly)
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        if self.holidays.contains(&date) {
            return true;
        }
        self.year_end_holidays
            && matches!((date.month(), date.day()), (12, 31) | (1, 1) | (1, 2) | (1, 3))
    }
}

#[derive(Debug, Clone, Default)]
pub struct RateTablePayCalculator {
    table: RateTable,
}

impl RateTablePayCalculator {
    pub fn new(table: RateTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &RateTable {
        &self.table
    }
}

impl PayCalculator for RateTablePayCalculator {
    fn compute_pay(&self, service: ServiceType, range: &TimeRange, date: NaiveDate) -> PayBreakdown {
        let t = &self.table;
        let total = range.minutes();
        let night = range.minutes_within(t.night_start_hour, t.night_end_hour).min(total);
        let regular = total - night;

        let mut rate = t.hourly_rate(service);
        if t.is_holiday(date) {
            rate *= t.holiday_multiplier;
        }

        let regular_hours = regular as f64 / 60.0;
        let night_hours = night as f64 / 60.0;
        let regular_pay = (regular_hours * rate).round();
        let night_pay = (night_hours * rate * t.night_multiplier).round();

        PayBreakdown {
            regular_hours: round2(regular_hours),
            night_hours: round2(night_hours),
            regular_pay,
            night_pay,
            total_pay: regular_pay + night_pay,
        }
    }
}
