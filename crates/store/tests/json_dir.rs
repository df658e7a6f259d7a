use std::sync::{Arc, Mutex};

use chrono::NaiveDate;

use careshift_core::{CellKey, YearMonth};
use careshift_engine::time::parse_clock;
use careshift_engine::{OverlayKey, OverlayKind, ServiceType, ShiftFields, ShiftRecord};
use careshift_protocol::PayrollFieldDoc;
use careshift_store::{JsonDirStore, ShiftStore};

fn date(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, m, d).unwrap()
}

fn shift(id: &str, key: CellKey) -> ShiftRecord {
    ShiftRecord::with_id(
        id,
        key,
        ShiftFields {
            start_time: parse_clock("09:30"),
            end_time: parse_clock("11:30"),
            client_name: "花子".to_string(),
            service_type: ServiceType::Kaji,
            duration: Some(2.0),
            area: "渋谷区".to_string(),
        },
    )
}

#[test]
fn save_then_load_month() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonDirStore::open(dir.path()).unwrap();
    let april = YearMonth::new(2026, 4);

    store.save_shifts(april, &[shift("a", CellKey::new("H1", date(4, 5), 0))]).unwrap();
    store.save_shifts(april, &[shift("b", CellKey::new("H2", date(4, 5), 1))]).unwrap();

    let loaded = store.load_shifts(april).unwrap();
    assert_eq!(loaded.len(), 2);
    assert!(loaded.iter().all(|r| r.persisted));
    assert_eq!(loaded[0].fields.client_name, "花子");
    assert!(dir.path().join("shifts-2026-04.json").exists());
}

#[test]
fn upsert_replaces_by_id_and_moves_between_months() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonDirStore::open(dir.path()).unwrap();
    let april = YearMonth::new(2026, 4);
    let may = YearMonth::new(2026, 5);

    store.save_shifts(april, &[shift("a", CellKey::new("H1", date(4, 30), 0))]).unwrap();
    store.save_shifts(april, &[shift("a", CellKey::new("H1", date(4, 30), 3))]).unwrap();
    let loaded = store.load_shifts(april).unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].key.row, 3);

    store.save_shifts(may, &[shift("a", CellKey::new("H1", date(5, 1), 0))]).unwrap();
    assert!(store.load_shifts(april).unwrap().is_empty());
    assert_eq!(store.load_shifts(may).unwrap().len(), 1);
}

#[test]
fn soft_delete_tombstones() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonDirStore::open(dir.path()).unwrap();
    let april = YearMonth::new(2026, 4);
    store.save_shifts(april, &[shift("a", CellKey::new("H1", date(4, 5), 0))]).unwrap();

    store.soft_delete("a").unwrap();
    store.soft_delete("a").unwrap();
    store.soft_delete("nope").unwrap();

    let loaded = store.load_shifts(april).unwrap();
    assert_eq!(loaded.len(), 1);
    assert!(loaded[0].deleted);
}

#[test]
fn subscribers_see_every_write_until_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonDirStore::open(dir.path()).unwrap();
    let april = YearMonth::new(2026, 4);
    store.save_shifts(april, &[shift("a", CellKey::new("H1", date(4, 5), 0))]).unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let sub = store
        .subscribe_shifts(april, Box::new(move |snap| sink.lock().unwrap().push(snap.len())))
        .unwrap();
    assert_eq!(store.subscriber_count(), 1);

    // a clone is another handle on the same directory and feed
    let other = store.clone();
    other.save_shifts(april, &[shift("b", CellKey::new("H1", date(4, 6), 0))]).unwrap();
    store.soft_delete("a").unwrap();
    store.soft_delete("a").unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![1, 2, 2]);

    drop(sub);
    assert_eq!(store.subscriber_count(), 0);
    store.save_shifts(april, &[shift("c", CellKey::new("H2", date(4, 6), 0))]).unwrap();
    assert_eq!(seen.lock().unwrap().len(), 3);
}

#[test]
fn moving_a_record_notifies_both_months() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonDirStore::open(dir.path()).unwrap();
    let (april, may) = (YearMonth::new(2026, 4), YearMonth::new(2026, 5));
    store.save_shifts(april, &[shift("a", CellKey::new("H1", date(4, 30), 0))]).unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut subs = Vec::new();
    for month in [april, may] {
        let sink = Arc::clone(&seen);
        subs.push(
            store
                .subscribe_shifts(month, Box::new(move |snap| sink.lock().unwrap().push((month, snap.len()))))
                .unwrap(),
        );
    }
    seen.lock().unwrap().clear();

    store.save_shifts(may, &[shift("a", CellKey::new("H1", date(5, 1), 0))]).unwrap();
    let seen = seen.lock().unwrap();
    assert!(seen.contains(&(april, 0)));
    assert!(seen.contains(&(may, 1)));
}

#[test]
fn overlay_subscribers_get_the_saved_map() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonDirStore::open(dir.path()).unwrap();
    let april = YearMonth::new(2026, 4);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _sub = store
        .subscribe_overlays(
            OverlayKind::ScheduledDayOff,
            april,
            Box::new(move |entries| sink.lock().unwrap().push(entries.len())),
        )
        .unwrap();
    store
        .save_overlays(OverlayKind::ScheduledDayOff, april, &[(OverlayKey::whole_day("H1", date(4, 5)), String::new())])
        .unwrap();
    store.save_overlays(OverlayKind::DayOffRequest, april, &[]).unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![0, 1]);
}

#[test]
fn writes_leave_no_temporary_files() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonDirStore::open(dir.path()).unwrap();
    let april = YearMonth::new(2026, 4);
    store.save_shifts(april, &[shift("a", CellKey::new("H1", date(4, 5), 0))]).unwrap();
    store.soft_delete("a").unwrap();
    store.save_overlays(OverlayKind::DayOffRequest, april, &[]).unwrap();
    store
        .save_payroll_field(&PayrollFieldDoc {
            month: april,
            staff_id: "H1".to_string(),
            field: "bonus".to_string(),
            value: 10.0,
        })
        .unwrap();

    let mut names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["overlays-day_off_request-2026-04.json", "payroll.json", "shifts-2026-04.json"]);
}

#[test]
fn overlays_and_payroll() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonDirStore::open(dir.path()).unwrap();
    let april = YearMonth::new(2026, 4);
    let entries = vec![
        (OverlayKey::whole_day("H1", date(4, 5)), "有給".to_string()),
        (OverlayKey::slot("H1", date(4, 6), 2), String::new()),
        (OverlayKey::whole_day("H1", date(5, 1)), String::new()),
    ];
    store.save_overlays(OverlayKind::DayOffRequest, april, &entries).unwrap();

    let loaded = store.load_overlays(OverlayKind::DayOffRequest, april).unwrap();
    assert_eq!(loaded, entries[..2].to_vec());
    assert!(store.load_overlays(OverlayKind::ScheduledDayOff, april).unwrap().is_empty());

    let mut field = PayrollFieldDoc {
        month: april,
        staff_id: "H1".to_string(),
        field: "transport".to_string(),
        value: 1200.0,
    };
    store.save_payroll_field(&field).unwrap();
    field.value = 1500.0;
    store.save_payroll_field(&field).unwrap();
    let raw = std::fs::read_to_string(dir.path().join("payroll.json")).unwrap();
    let saved: Vec<PayrollFieldDoc> = serde_json::from_str(&raw).unwrap();
    assert_eq!(saved, vec![field]);
}
