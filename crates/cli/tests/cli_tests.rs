// End-to-end tests for the cshift binary.
//
// Run with: cargo test -p careshift-cli --test cli_tests

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use chrono::NaiveDate;

use careshift_config::GridSettings;
use careshift_core::{CellKey, YearMonth};
use careshift_engine::{codec, OverlayState, ShiftRecord};
use careshift_store::{JsonDirStore, ShiftStore};

fn cshift(config: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_cshift"));
    cmd.env("CSHIFT_CONFIG", config);
    cmd
}

fn stdout(output: &Output) -> String {
    assert!(
        output.status.success(),
        "exit code: {:?}\nstderr: {}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn shift(staff: &str, day: u32, row: u8, lines: [&str; 4]) -> ShiftRecord {
    let key = CellKey::new(staff, NaiveDate::from_ymd_opt(2026, 4, day).unwrap(), row);
    ShiftRecord::new(key, codec::decode(&lines[..], OverlayState::CLEAR))
}

/// Schedule directory with three April shifts, plus a default settings file.
fn fixture() -> (tempfile::TempDir, PathBuf, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let schedule = dir.path().join("schedule");
    let store = JsonDirStore::open(&schedule).unwrap();
    store
        .save_shifts(
            YearMonth::new(2026, 4),
            &[
                shift("H1", 5, 0, ["09:30-11:30", "花子(家事)", "", "渋谷区"]),
                shift("H1", 6, 1, ["13:00-14:00", "太郎(身体)", "", ""]),
                shift("H2", 5, 0, ["10:00-11:00", "次郎(家事)", "", ""]),
            ],
        )
        .unwrap();
    let config = dir.path().join("grid.toml");
    GridSettings::default().save(&config).unwrap();
    (dir, schedule, config)
}

fn month_args(schedule: &Path, month: &str) -> Vec<String> {
    vec![
        "--dir".to_string(),
        schedule.display().to_string(),
        "--year".to_string(),
        "2026".to_string(),
        "--month".to_string(),
        month.to_string(),
    ]
}

#[test]
fn decode_prints_structured_fields() {
    let (_dir, _, config) = fixture();
    let output = cshift(&config)
        .args(["decode", "9:30-11:30", "花子(家事)", "2", "渋谷区"])
        .output()
        .expect("cshift decode");
    let val: serde_json::Value = serde_json::from_str(stdout(&output).trim()).unwrap();

    assert_eq!(val["startTime"], "09:30");
    assert_eq!(val["endTime"], "11:30");
    assert_eq!(val["clientName"], "花子");
    assert_eq!(val["serviceType"], "kaji");
    assert_eq!(val["duration"], 2.0);
    assert_eq!(val["area"], "渋谷区");
    assert_eq!(val["lines"][0], "09:30-11:30");
}

#[test]
fn decode_under_day_off_drops_duration() {
    let (_dir, _, config) = fixture();
    let output = cshift(&config)
        .args(["decode", "9:00-11:00", "花子", "--scheduled-off"])
        .output()
        .expect("cshift decode");
    let val: serde_json::Value = serde_json::from_str(stdout(&output).trim()).unwrap();
    assert!(val["duration"].is_null());
    assert_eq!(val["startTime"], "09:00");
}

#[test]
fn render_lists_occupied_cells_in_grid_order() {
    let (_dir, schedule, config) = fixture();
    let output = cshift(&config)
        .arg("render")
        .args(month_args(&schedule, "4"))
        .output()
        .expect("cshift render");
    let text = stdout(&output);
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("2026-04-05 #0 H1"));
    assert!(lines[0].contains("09:30-11:30 / 花子(家事) / 2 / 渋谷区"));
    assert!(lines[1].starts_with("2026-04-05 #0 H2"));
    assert!(lines[2].starts_with("2026-04-06 #1 H1"));
}

#[test]
fn render_json_honours_staff_filter() {
    let (_dir, schedule, config) = fixture();
    let output = cshift(&config)
        .arg("render")
        .args(month_args(&schedule, "4"))
        .args(["--staff", "H2", "--json"])
        .output()
        .expect("cshift render --json");
    let val: serde_json::Value = serde_json::from_str(stdout(&output).trim()).unwrap();
    let cells = val.as_array().unwrap();
    assert_eq!(cells.len(), 1);
    assert_eq!(cells[0]["staffId"], "H2");
    assert_eq!(cells[0]["lines"][1], "次郎(家事)");
}

#[test]
fn totals_group_by_service() {
    let (_dir, schedule, config) = fixture();
    let output = cshift(&config)
        .arg("totals")
        .args(month_args(&schedule, "4"))
        .arg("--json")
        .output()
        .expect("cshift totals");
    let val: serde_json::Value = serde_json::from_str(stdout(&output).trim()).unwrap();

    assert_eq!(val["H1"]["kaji"]["count"], 1);
    assert_eq!(val["H1"]["shintai"]["count"], 1);
    assert_eq!(val["H1"]["total"]["count"], 2);
    assert_eq!(val["H1"]["total"]["regularHours"], 3.0);
    assert_eq!(val["H2"]["total"]["count"], 1);
    assert!(val["H1"]["total"]["totalPay"].as_f64().unwrap() > 0.0);
}

#[test]
fn paste_preview_reads_stdin() {
    let (_dir, _, config) = fixture();
    let mut child = cshift(&config)
        .args(["paste-preview", "--staff", "H1,H2", "--dates", "2026-04-05,2026-04-06"])
        .args(["--anchor-staff", "H2", "--anchor-row", "4"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("cshift paste-preview");
    child
        .stdin
        .take()
        .unwrap()
        .write_all("9:00-10:00\t11:00\n花子(家事)\t太郎\n\t\n\t\n\n\n\n\n".as_bytes())
        .unwrap();
    let output = child.wait_with_output().unwrap();
    let text = stdout(&output);
    let lines: Vec<&str> = text.lines().collect();

    // second column falls off the grid, second group lands on the next date
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("2026-04-05 #4 H2"));
    assert!(lines[0].contains("09:00-10:00 / 花子(家事)"));
    assert!(lines[1].starts_with("2026-04-06 #0 H2"));
    assert!(lines[1].ends_with("(clear)"));
}

#[test]
fn bad_month_is_a_usage_error() {
    let (_dir, schedule, config) = fixture();
    let output = cshift(&config)
        .arg("render")
        .args(month_args(&schedule, "13"))
        .output()
        .expect("cshift render");
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("month must be 1-12"));
}

#[test]
fn empty_month_without_staff_is_a_usage_error() {
    let (_dir, schedule, config) = fixture();
    let output = cshift(&config)
        .arg("totals")
        .args(month_args(&schedule, "5"))
        .output()
        .expect("cshift totals");
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("hint:"));
}

#[test]
fn malformed_settings_exit_with_config_code() {
    let (_dir, schedule, config) = fixture();
    std::fs::write(&config, "[sync\nbroken").unwrap();
    let output = cshift(&config)
        .arg("totals")
        .args(month_args(&schedule, "4"))
        .output()
        .expect("cshift totals");
    assert_eq!(output.status.code(), Some(4));
}
