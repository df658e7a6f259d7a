//! Clock times and shift time ranges.

use chrono::{NaiveTime, Timelike};

const MINUTES_PER_DAY: i64 = 24 * 60;

/// Parse `H:MM` / `HH:MM`. `24:00` is accepted as midnight.
pub fn parse_clock(s: &str) -> Option<NaiveTime> {
    let (h, m) = s.trim().split_once(':')?;
    if h.is_empty() || h.len() > 2 || m.len() != 2 {
        return None;
    }
    let hour: u32 = h.parse().ok()?;
    let minute: u32 = m.parse().ok()?;
    if hour == 24 && minute == 0 {
        return NaiveTime::from_hms_opt(0, 0, 0);
    }
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Always `HH:MM`.
pub fn format_clock(t: NaiveTime) -> String {
    format!("{:02}:{:02}", t.hour(), t.minute())
}

pub(crate) fn minute_of_day(t: NaiveTime) -> i64 {
    i64::from(t.hour()) * 60 + i64::from(t.minute())
}

/// A start/end pair. An end at or before the start runs past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeRange {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Absolute minutes `[start, end)` measured from the start day's midnight.
    pub fn span_minutes(&self) -> (i64, i64) {
        let start = minute_of_day(self.start);
        let mut end = minute_of_day(self.end);
        if end <= start {
            end += MINUTES_PER_DAY;
        }
        (start, end)
    }

    pub fn minutes(&self) -> i64 {
        let (start, end) = self.span_minutes();
        end - start
    }

    /// Length in hours, rounded to two decimals.
    pub fn hours(&self) -> f64 {
        round2(self.minutes() as f64 / 60.0)
    }

    /// Minutes of this range falling inside the nightly window
    /// `[night_start, night_end)` (hours of day, wrapping past midnight).
    pub fn minutes_within(&self, night_start_hour: u32, night_end_hour: u32) -> i64 {
        let (start, end) = self.span_minutes();
        let ns = i64::from(night_start_hour) * 60;
        let ne = i64::from(night_end_hour) * 60;
        let windows: Vec<(i64, i64)> = if ns > ne {
            vec![
                (0, ne),
                (ns, MINUTES_PER_DAY + ne),
                (MINUTES_PER_DAY + ns, 2 * MINUTES_PER_DAY),
            ]
        } else {
            vec![(ns, ne), (MINUTES_PER_DAY + ns, MINUTES_PER_DAY + ne)]
        };
        windows
            .into_iter()
            .map(|(ws, we)| (end.min(we) - start.max(ws)).max(0))
            .sum()
    }
}

pub(crate) fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
