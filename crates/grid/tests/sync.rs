use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use parking_lot::Mutex;

use careshift_config::GridSettings;
use careshift_core::{CellKey, GridLayout, StaffId, YearMonth};
use careshift_grid::{EventCollector, GridEvent, InputEvent, ManualClock, RetryPolicy, ShiftGrid, SyncWorker};
use careshift_store::MemoryStore;

fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 4, d).unwrap()
}

fn april() -> YearMonth {
    YearMonth::new(2026, 4)
}

fn cell(staff: &str, day: u32, row: u8) -> CellKey {
    CellKey::new(staff, date(day), row)
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy { attempts: 3, backoff: Duration::from_millis(1) }
}

fn setup(store: &MemoryStore) -> (ShiftGrid, ManualClock, SyncWorker, Arc<Mutex<EventCollector>>) {
    let clock = ManualClock::new();
    let layout = GridLayout::new(vec![StaffId::from("H1"), StaffId::from("H2")], vec![date(5), date(6)]);
    let mut grid = ShiftGrid::load(store, layout, GridSettings::default())
        .unwrap()
        .with_clock(Arc::new(clock.clone()));
    let events = Arc::new(Mutex::new(EventCollector::new()));
    let sink = Arc::clone(&events);
    grid.on_event(Box::new(move |e| sink.lock().push(e.clone())));
    let worker = SyncWorker::new(Arc::new(store.clone()), fast_retry());
    (grid, clock, worker, events)
}

fn commit(grid: &mut ShiftGrid, key: &CellKey, line: u8, text: &str) {
    grid.handle_input(InputEvent::click(key.line(line)));
    grid.handle_input(InputEvent::Text(text.to_string()));
    grid.handle_input(InputEvent::Blur);
}

#[test]
fn edits_are_saved_immediately_and_marked_persisted() {
    let store = MemoryStore::new();
    let (mut grid, _clock, worker, _) = setup(&store);
    let key = cell("H1", 5, 0);

    commit(&mut grid, &key, 1, "花子(家事)");
    assert!(!grid.shift_at(&key).unwrap().persisted);
    assert_eq!(grid.pending_writes(), 1);

    assert_eq!(worker.run_due_blocking(&mut grid), 1);
    assert_eq!(store.live_count(april()), 1);
    assert!(grid.shift_at(&key).unwrap().persisted);
    assert_eq!(grid.pending_writes(), 0);
    assert_eq!(worker.run_due_blocking(&mut grid), 0);
}

#[test]
fn drag_waits_for_debounce() {
    let store = MemoryStore::new();
    let (mut grid, clock, worker, _) = setup(&store);
    let (a, b) = (cell("H1", 5, 0), cell("H2", 6, 1));
    commit(&mut grid, &a, 1, "花子");
    worker.run_due_blocking(&mut grid);
    let id = grid.shift_at(&a).unwrap().id.clone();

    grid.drag_drop(&a, &b).unwrap();
    assert_eq!(worker.run_due_blocking(&mut grid), 0);
    clock.advance(Duration::from_millis(500));
    assert_eq!(worker.run_due_blocking(&mut grid), 0);
    clock.advance(Duration::from_millis(300));
    assert_eq!(worker.run_due_blocking(&mut grid), 1);

    let saved = store.shift(&id).unwrap();
    assert_eq!(saved.key, b);
    assert!(!saved.deleted);
    assert_eq!(store.live_count(april()), 1);
}

#[test]
fn transient_failures_are_retried() {
    let store = MemoryStore::new();
    let (mut grid, _clock, worker, events) = setup(&store);
    let key = cell("H1", 5, 0);
    commit(&mut grid, &key, 1, "花子");

    store.fail_next(2);
    worker.run_due_blocking(&mut grid);
    assert_eq!(store.write_calls(), 3);
    assert!(grid.shift_at(&key).unwrap().persisted);
    assert!(events.lock().persist_failures().is_empty());
}

#[test]
fn exhausted_retries_report_and_requeue() {
    let store = MemoryStore::new();
    let (mut grid, clock, worker, events) = setup(&store);
    let key = cell("H1", 5, 0);
    commit(&mut grid, &key, 1, "花子");
    let id = grid.shift_at(&key).unwrap().id.clone();

    store.fail_next(3);
    worker.run_due_blocking(&mut grid);
    assert_eq!(store.write_calls(), 3);
    assert!(store.shift(&id).is_none());

    // local state survives and the write waits for another round
    assert_eq!(grid.shift_at(&key).unwrap().fields.client_name, "花子");
    assert!(!grid.shift_at(&key).unwrap().persisted);
    assert_eq!(grid.pending_writes(), 1);
    {
        let events = events.lock();
        let failures = events.persist_failures();
        assert_eq!(failures.len(), 1);
        assert!(matches!(failures[0], GridEvent::PersistFailed { failed, .. } if failed == &vec![id.clone()]));
    }

    clock.advance(Duration::from_secs(1));
    assert_eq!(worker.run_due_blocking(&mut grid), 1);
    assert!(store.shift(&id).is_some());
    assert!(grid.shift_at(&key).unwrap().persisted);
}

#[test]
fn payroll_edits_debounce_per_field() {
    let store = MemoryStore::new();
    let (mut grid, clock, worker, _) = setup(&store);
    let h1 = StaffId::from("H1");

    grid.set_payroll_field(april(), &h1, "transportation", 1000.0);
    clock.advance(Duration::from_millis(400));
    grid.set_payroll_field(april(), &h1, "transportation", 1200.0);
    assert_eq!(grid.payroll_field(april(), &h1, "transportation"), Some(1200.0));

    clock.advance(Duration::from_millis(500));
    assert_eq!(worker.run_due_blocking(&mut grid), 0);
    clock.advance(Duration::from_millis(300));
    assert_eq!(worker.run_due_blocking(&mut grid), 1);
    assert_eq!(store.payroll_value(april(), "H1", "transportation"), Some(1200.0));
    assert_eq!(store.write_calls(), 1);
}

#[test]
fn payroll_failure_is_reported() {
    let store = MemoryStore::new();
    let (mut grid, clock, worker, events) = setup(&store);
    grid.set_payroll_field(april(), &StaffId::from("H2"), "bonus", 5000.0);
    clock.advance(Duration::from_secs(1));

    store.fail_next(3);
    worker.run_due_blocking(&mut grid);
    let events = events.lock();
    assert!(events.events().iter().any(|e| matches!(
        e,
        GridEvent::PayrollSaveFailed { staff_id, field, .. } if staff_id == "H2" && field == "bonus"
    )));
}

#[test]
fn flush_on_shutdown_writes_everything() {
    let store = MemoryStore::new();
    let (mut grid, _clock, worker, _) = setup(&store);
    let (a, b) = (cell("H1", 5, 0), cell("H2", 5, 0));
    commit(&mut grid, &a, 1, "花子");
    worker.run_due_blocking(&mut grid);
    grid.drag_drop(&a, &b).unwrap();
    grid.set_payroll_field(april(), &StaffId::from("H1"), "bonus", 300.0);

    grid.handle_input(InputEvent::click(cell("H1", 6, 2).line(1)));
    grid.handle_input(InputEvent::Text("太郎".to_string()));

    assert_eq!(worker.flush_blocking(&mut grid), 2);
    assert!(!grid.is_editing());
    assert_eq!(store.live_count(april()), 2);
    assert_eq!(store.payroll_value(april(), "H1", "bonus"), Some(300.0));
    assert_eq!(grid.pending_writes(), 0);
}

#[test]
fn tick_waits_for_the_next_due_write() {
    let store = MemoryStore::new();
    let mut settings = GridSettings::default();
    settings.sync.debounce_ms = 10;
    let layout = GridLayout::new(vec![StaffId::from("H1"), StaffId::from("H2")], vec![date(5)]);
    let grid = Mutex::new(ShiftGrid::load(&store, layout, settings).unwrap());
    let worker = SyncWorker::new(Arc::new(store.clone()), fast_retry());

    commit(&mut grid.lock(), &cell("H1", 5, 0), 1, "花子");
    smol::block_on(worker.tick(&grid));
    grid.lock().drag_drop(&cell("H1", 5, 0), &cell("H2", 5, 0)).unwrap();
    assert_eq!(smol::block_on(worker.tick(&grid)), 1);
    assert_eq!(store.live_count(april()), 1);
}

#[test]
fn grid_keeps_editing_while_a_batch_is_in_flight() {
    let store = MemoryStore::new();
    let (mut grid, clock, worker, _) = setup(&store);
    let (a, b) = (cell("H1", 5, 0), cell("H2", 6, 0));
    commit(&mut grid, &a, 1, "花子");

    let batch = grid.take_due_batch();
    assert_eq!(batch.len(), 1);
    assert_eq!(grid.pending_writes(), 0);

    // a newer edit to the same cell lands before the first write returns
    commit(&mut grid, &a, 1, "太郎");
    commit(&mut grid, &b, 1, "一郎");
    let report = smol::block_on(worker.execute(batch));
    assert_eq!(grid.apply_sync_report(report), 1);

    assert!(!grid.shift_at(&a).unwrap().persisted);
    assert_eq!(grid.shift_at(&a).unwrap().fields.client_name, "太郎");
    assert_eq!(grid.pending_writes(), 2);

    clock.advance(Duration::from_secs(1));
    assert_eq!(worker.run_due_blocking(&mut grid), 1);
    let id = grid.shift_at(&a).unwrap().id.clone();
    assert_eq!(store.shift(&id).unwrap().fields.client_name, "太郎");
    assert!(grid.shift_at(&a).unwrap().persisted);
    assert!(grid.shift_at(&b).unwrap().persisted);
}
