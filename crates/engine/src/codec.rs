//! Cell codec: four display lines <-> [`ShiftFields`].
//!
//! ```text
//! line 0  09:30-11:30      time range (end optional)
//! line 1  花子(家事)        client name + service label
//! line 2  2                duration in hours
//! line 3  渋谷区            area
//! ```
//!
//! Decoding never fails. Anything unrecognised degrades to empty fields
//! (logged at debug) so a half-typed cell is still a valid record.

use once_cell::sync::Lazy;
use regex::Regex;

use careshift_core::LINES_PER_CELL;

use crate::overlay::OverlayState;
use crate::record::ShiftFields;
use crate::service::ServiceType;
use crate::time::{format_clock, parse_clock, round2};

static TIME_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d{1,2}:\d{2})\s*(?:[\-‐‑‒–—―−~～〜]\s*(\d{1,2}:\d{2})?)?\s*$")
        .expect("time range pattern")
});

static LABELLED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.*?)\s*[(（]([^()（）]*)[)）]\s*$").expect("label pattern")
});

static DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d+(?:\.\d+)?|\.\d+)\s*(?:[hH]|時間)?\s*$").expect("duration pattern")
});

/// Fold full-width digits and punctuation to ASCII.
fn normalize(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '０'..='９' => char::from_u32(c as u32 - '０' as u32 + '0' as u32).unwrap_or(c),
            '：' => ':',
            '．' => '.',
            '\u{3000}' => ' ',
            _ => c,
        })
        .collect()
}

fn decode_times(line: &str) -> (Option<chrono::NaiveTime>, Option<chrono::NaiveTime>) {
    let line = normalize(line);
    if line.trim().is_empty() {
        return (None, None);
    }
    let Some(caps) = TIME_RANGE.captures(&line) else {
        log::debug!("unrecognised time range {:?}", line);
        return (None, None);
    };
    let start = caps.get(1).and_then(|m| parse_clock(m.as_str()));
    let end = caps.get(2).and_then(|m| parse_clock(m.as_str()));
    match start {
        Some(start) => (Some(start), end),
        None => {
            log::debug!("time out of range {:?}", line);
            (None, None)
        }
    }
}

/// Client name and service; `None` service when no known label is present.
fn decode_client(line: &str) -> (String, Option<ServiceType>) {
    if let Some(caps) = LABELLED.captures(line) {
        let label = caps.get(2).map_or("", |m| m.as_str().trim());
        if let Some(service) = ServiceType::from_label(label) {
            let client = caps.get(1).map_or("", |m| m.as_str());
            return (client.trim().to_string(), Some(service));
        }
    }
    (line.trim().to_string(), None)
}

/// `Ok(None)` for an empty line, `Err(())` for text that is not a number.
fn decode_duration(line: &str) -> Result<Option<f64>, ()> {
    let line = normalize(line);
    if line.trim().is_empty() {
        return Ok(None);
    }
    DURATION
        .captures(&line)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .map(Some)
        .ok_or(())
}

fn derived_duration(fields: &ShiftFields) -> Option<f64> {
    fields.time_range().map(|r| r.hours())
}

/// Parse up to four display lines. Missing lines count as empty.
pub fn decode<S: AsRef<str>>(lines: &[S], overlay: OverlayState) -> ShiftFields {
    let line = |i: usize| lines.get(i).map_or("", |s| s.as_ref());

    let (start_time, end_time) = decode_times(line(0));
    let (client_name, service) = decode_client(line(1));
    let mut fields = ShiftFields {
        start_time,
        end_time,
        client_name,
        service_type: service.unwrap_or_default(),
        duration: None,
        area: line(3).trim().to_string(),
    };

    fields.duration = if overlay.suppresses_duration() {
        None
    } else {
        match decode_duration(line(2)) {
            Ok(Some(d)) => Some(d),
            Ok(None) => derived_duration(&fields),
            Err(()) => {
                log::debug!("unrecognised duration {:?}", line(2));
                derived_duration(&fields)
            }
        }
    };
    fields
}

/// Hours to two decimals without trailing zeros: `2`, `1.5`, `1.67`.
pub fn format_duration(hours: f64) -> String {
    format!("{}", round2(hours))
}

pub fn encode_line(fields: &ShiftFields, line: u8) -> String {
    match line {
        0 => match (fields.start_time, fields.end_time) {
            (Some(s), Some(e)) => format!("{}-{}", format_clock(s), format_clock(e)),
            (Some(s), None) => format_clock(s),
            _ => String::new(),
        },
        1 if fields.service_type.shows_label() => {
            format!("{}({})", fields.client_name, fields.service_type.label())
        }
        1 => fields.client_name.clone(),
        2 => fields.duration.map(format_duration).unwrap_or_default(),
        3 => fields.area.clone(),
        _ => String::new(),
    }
}

pub fn encode(fields: &ShiftFields) -> [String; 4] {
    [0, 1, 2, 3].map(|i| encode_line(fields, i))
}

/// A record whose every display line is empty must not be stored.
pub fn is_blank(fields: &ShiftFields) -> bool {
    (0..LINES_PER_CELL).all(|i| encode_line(fields, i).is_empty())
}

/// Replace one display line and re-derive the record.
///
/// This is the single place typed text becomes structured data. Fields
/// encoded on other lines are carried over untouched, so a service type
/// without a label (`Yotei`) survives edits to its client name.
pub fn apply_line(fields: &ShiftFields, line: u8, text: &str, overlay: OverlayState) -> ShiftFields {
    let mut next = fields.clone();
    match line {
        0 => {
            let was_derived = fields.duration.is_none() || fields.duration == derived_duration(fields);
            let (start, end) = decode_times(text);
            next.start_time = start;
            next.end_time = end;
            if was_derived {
                next.duration = derived_duration(&next);
            }
        }
        1 => {
            let (client, service) = decode_client(text);
            next.client_name = client;
            next.service_type = match service {
                Some(service) => service,
                None if !fields.service_type.shows_label() => fields.service_type,
                None => ServiceType::Other,
            };
        }
        2 => {
            next.duration = match decode_duration(text) {
                Ok(Some(d)) => Some(d),
                Ok(None) => derived_duration(&next),
                Err(()) => {
                    log::debug!("unrecognised duration {:?}", text);
                    derived_duration(&next)
                }
            };
        }
        3 => next.area = text.trim().to_string(),
        _ => {
            log::debug!("line index {} out of range", line);
        }
    }
    if overlay.suppresses_duration() {
        next.duration = None;
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day_off() -> OverlayState {
        OverlayState { day_off_requested: true, scheduled_day_off: false }
    }

    #[test]
    fn test_decode_reference_cell() {
        let fields = decode(&["09:30-11:30", "花子(家事)", "2", "渋谷区"], OverlayState::CLEAR);
        assert_eq!(fields.start_time, parse_clock("09:30"));
        assert_eq!(fields.end_time, parse_clock("11:30"));
        assert_eq!(fields.client_name, "花子");
        assert_eq!(fields.service_type, ServiceType::Kaji);
        assert_eq!(fields.duration, Some(2.0));
        assert_eq!(fields.area, "渋谷区");
    }

    #[test]
    fn test_dash_variants_and_full_width() {
        for line in ["9:30～11:30", "09:30 〜 11:30", "09:30—11:30", "０９：３０−１１：３０", "9:30~11:30"] {
            let fields = decode(&[line], OverlayState::CLEAR);
            assert_eq!(fields.start_time, parse_clock("09:30"), "{}", line);
            assert_eq!(fields.end_time, parse_clock("11:30"), "{}", line);
        }
    }

    #[test]
    fn test_start_only() {
        let fields = decode(&["14:00", "", "", ""], OverlayState::CLEAR);
        assert_eq!(fields.start_time, parse_clock("14:00"));
        assert_eq!(fields.end_time, None);
        assert_eq!(fields.duration, None);
        assert_eq!(encode_line(&fields, 0), "14:00");
    }

    #[test]
    fn test_garbage_degrades_to_empty() {
        let fields = decode(&["after lunch", "", "lots", ""], OverlayState::CLEAR);
        assert_eq!(fields.start_time, None);
        assert_eq!(fields.duration, None);
    }

    #[test]
    fn test_unknown_label_stays_in_name() {
        let fields = decode(&["", "太郎(見守り)", "", ""], OverlayState::CLEAR);
        assert_eq!(fields.client_name, "太郎(見守り)");
        assert_eq!(fields.service_type, ServiceType::Other);

        let fields = decode(&["", "太郎（通院）", "", ""], OverlayState::CLEAR);
        assert_eq!(fields.client_name, "太郎");
        assert_eq!(fields.service_type, ServiceType::Tsuin);
    }

    #[test]
    fn test_duration_derived_from_range() {
        let fields = decode(&["22:00-02:00", "", "", ""], OverlayState::CLEAR);
        assert_eq!(fields.duration, Some(4.0));
        let fields = decode(&["", "", "1.5h", ""], OverlayState::CLEAR);
        assert_eq!(fields.duration, Some(1.5));
        let fields = decode(&["", "", "３時間", ""], OverlayState::CLEAR);
        assert_eq!(fields.duration, Some(3.0));
    }

    #[test]
    fn test_overlay_suppresses_duration() {
        let fields = decode(&["09:00-10:00", "", "1", ""], day_off());
        assert_eq!(fields.duration, None);
        assert_eq!(fields.start_time, parse_clock("09:00"));
    }

    #[test]
    fn test_encode_omits_label_for_unlabelled_types() {
        let fields = ShiftFields {
            client_name: "会議室".to_string(),
            service_type: ServiceType::Yotei,
            duration: Some(1.25),
            ..Default::default()
        };
        assert_eq!(encode(&fields), ["", "会議室", "1.25", ""].map(String::from));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(2.0), "2");
        assert_eq!(format_duration(1.5), "1.5");
        assert_eq!(format_duration(5.0 / 3.0), "1.67");
        assert_eq!(format_duration(1.234), "1.23");
    }

    #[test]
    fn test_is_blank() {
        assert!(is_blank(&ShiftFields::default()));
        let labelled = ShiftFields { service_type: ServiceType::Kaji, ..Default::default() };
        assert!(!is_blank(&labelled));
    }

    #[test]
    fn test_apply_line_rederives_duration() {
        let fields = decode(&["09:00-10:00", "花子(身体)", "", ""], OverlayState::CLEAR);
        assert_eq!(fields.duration, Some(1.0));

        let longer = apply_line(&fields, 0, "09:00-11:30", OverlayState::CLEAR);
        assert_eq!(longer.duration, Some(2.5));

        let typed = apply_line(&longer, 2, "2", OverlayState::CLEAR);
        let moved = apply_line(&typed, 0, "13:00-14:00", OverlayState::CLEAR);
        assert_eq!(moved.duration, Some(2.0));
    }

    #[test]
    fn test_apply_line_keeps_unlabelled_service() {
        let fields = ShiftFields {
            client_name: "仮".to_string(),
            service_type: ServiceType::Yotei,
            ..Default::default()
        };
        let renamed = apply_line(&fields, 1, "山田", OverlayState::CLEAR);
        assert_eq!(renamed.service_type, ServiceType::Yotei);
        assert_eq!(renamed.client_name, "山田");

        let relabelled = apply_line(&renamed, 1, "山田(移動)", OverlayState::CLEAR);
        assert_eq!(relabelled.service_type, ServiceType::Ido);

        let cleared = apply_line(&relabelled, 1, "山田", OverlayState::CLEAR);
        assert_eq!(cleared.service_type, ServiceType::Other);
    }
}
