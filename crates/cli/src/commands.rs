//! Subcommand implementations.

use std::collections::BTreeMap;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde_json::{json, Value};

use careshift_config::GridSettings;
use careshift_core::{CellKey, GridLayout, StaffId, YearMonth, ROWS_PER_DAY};
use careshift_engine::time::format_clock;
use careshift_engine::{codec, OverlayKind, OverlayState, Overlays, ShiftFields, Totals};
use careshift_grid::{plan_text_paste, ShiftGrid};
use careshift_store::{JsonDirStore, ShiftStore};

use crate::{CliError, MonthArgs};

fn fields_json(fields: &ShiftFields) -> Value {
    json!({
        "startTime": fields.start_time.map(format_clock),
        "endTime": fields.end_time.map(format_clock),
        "clientName": fields.client_name,
        "serviceType": fields.service_type.code(),
        "duration": fields.duration,
        "area": fields.area,
    })
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value).map_err(|e| CliError::io(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

pub fn decode(lines: &[String], day_off: bool, scheduled_off: bool) -> Result<(), CliError> {
    let overlay = OverlayState { day_off_requested: day_off, scheduled_day_off: scheduled_off };
    let fields = codec::decode(lines, overlay);
    let mut out = fields_json(&fields);
    out["lines"] = json!(codec::encode(&fields));
    print_json(&out)
}

fn month_of(args: &MonthArgs) -> Result<YearMonth, CliError> {
    if !(1..=12).contains(&args.month) {
        return Err(CliError::usage(format!("month must be 1-12, got {}", args.month)));
    }
    Ok(YearMonth::new(args.year, args.month))
}

/// Open the directory and load a grid over the month.
fn load_month(args: &MonthArgs, settings: GridSettings) -> Result<(ShiftGrid, YearMonth), CliError> {
    let month = month_of(args)?;
    let store = JsonDirStore::open(&args.dir)?;

    let staff: Vec<StaffId> = if args.staff.is_empty() {
        let mut ids: Vec<StaffId> = store
            .load_shifts(month)?
            .into_iter()
            .filter(|r| !r.deleted)
            .map(|r| r.key.staff)
            .collect();
        ids.sort();
        ids.dedup();
        ids
    } else {
        args.staff.iter().map(|s| StaffId::new(s.trim())).collect()
    };
    if staff.is_empty() {
        return Err(CliError::usage(format!("no shifts in {} under {}", month, args.dir.display()))
            .with_hint("pass --staff to render empty columns"));
    }

    let grid = ShiftGrid::load(&store, GridLayout::for_month(month, staff), settings)?;
    Ok((grid, month))
}

pub fn render(args: &MonthArgs, settings: GridSettings) -> Result<(), CliError> {
    let (grid, month) = load_month(args, settings)?;
    let layout = grid.layout();

    let mut cells = Vec::new();
    for &date in layout.dates() {
        for row in 0..ROWS_PER_DAY {
            for staff in layout.staff() {
                let display = grid.cell_display(staff, date, row);
                if !display.is_empty() {
                    cells.push((CellKey::new(staff.clone(), date, row), display));
                }
            }
        }
    }
    log::info!("{}: {} occupied cell(s)", month, cells.len());

    if args.json {
        let out: Vec<Value> = cells
            .iter()
            .map(|(key, display)| {
                json!({
                    "staffId": key.staff.as_str(),
                    "date": key.date,
                    "row": key.row,
                    "lines": display.lines,
                    "background": display.background.to_hex(),
                    "warning": display.has_warning,
                })
            })
            .collect();
        return print_json(&Value::Array(out));
    }

    for (key, display) in &cells {
        let flag = if display.has_warning { " !" } else { "" };
        println!(
            "{} #{} {:<6} {} [{}]{}",
            key.date,
            key.row,
            key.staff.as_str(),
            display.lines.join(" / "),
            display.background.to_hex(),
            flag
        );
    }
    Ok(())
}

fn totals_json(t: &Totals) -> Value {
    json!({
        "count": t.count,
        "duration": t.duration,
        "regularHours": t.regular_hours,
        "nightHours": t.night_hours,
        "regularPay": t.regular_pay,
        "nightPay": t.night_pay,
        "totalPay": t.total_pay,
    })
}

pub fn totals(args: &MonthArgs, settings: GridSettings) -> Result<(), CliError> {
    let (grid, month) = load_month(args, settings)?;

    let mut report: BTreeMap<String, Value> = BTreeMap::new();
    for staff in grid.layout().staff() {
        let by_service = grid.staff_totals(staff, month);
        let mut grand = Totals::default();
        for t in by_service.values() {
            grand.merge(t);
        }

        if args.json {
            let mut entry = serde_json::Map::new();
            for (service, t) in &by_service {
                entry.insert(service.code().to_string(), totals_json(t));
            }
            entry.insert("total".to_string(), totals_json(&grand));
            report.insert(staff.to_string(), Value::Object(entry));
            continue;
        }

        println!("{}", staff);
        for (service, t) in &by_service {
            println!(
                "  {:<8} {:>3} shift(s) {:>7.2} h  {:>10.0}",
                service.label(),
                t.count,
                t.regular_hours + t.night_hours,
                t.total_pay
            );
        }
        println!(
            "  {:<8} {:>3} shift(s) {:>7.2} h  {:>10.0}",
            "total",
            grand.count,
            grand.regular_hours + grand.night_hours,
            grand.total_pay
        );
    }

    if args.json {
        return print_json(&json!(report));
    }
    Ok(())
}

pub struct Anchor {
    pub staff: Option<String>,
    pub date: Option<NaiveDate>,
    pub row: u8,
}

fn load_overlays(dir: &Path, layout: &GridLayout) -> Result<Overlays, CliError> {
    let store = JsonDirStore::open(dir)?;
    let mut months: Vec<YearMonth> = layout.dates().iter().map(|d| YearMonth::of(*d)).collect();
    months.dedup();

    let mut entries = Vec::new();
    for &month in &months {
        for kind in [OverlayKind::DayOffRequest, OverlayKind::ScheduledDayOff] {
            for (key, note) in store.load_overlays(kind, month)? {
                entries.push((kind, key, note));
            }
        }
    }
    Ok(Overlays::for_months(&months, entries))
}

pub fn paste_preview(
    staff: Vec<String>,
    dates: Vec<NaiveDate>,
    anchor: Anchor,
    dir: Option<PathBuf>,
    json: bool,
) -> Result<(), CliError> {
    let layout = GridLayout::new(staff.iter().map(|s| StaffId::new(s.trim())).collect(), dates);
    let first = layout
        .first_cell()
        .ok_or_else(|| CliError::usage("target grid has no cells"))?;
    let target = CellKey::new(
        anchor.staff.map(StaffId::new).unwrap_or(first.staff),
        anchor.date.unwrap_or(first.date),
        anchor.row,
    );
    if !layout.contains(&target) {
        return Err(CliError::usage(format!("anchor {} is outside the target grid", target)));
    }

    let overlays = match &dir {
        Some(dir) => load_overlays(dir, &layout)?,
        None => Overlays::new(),
    };

    let mut text = String::new();
    io::stdin()
        .read_to_string(&mut text)
        .map_err(|e| CliError::io(format!("reading stdin: {}", e)))?;
    let plan = plan_text_paste(&layout, &overlays, &target, &text);
    log::info!("{} cell(s) planned from {} byte(s)", plan.len(), text.len());

    if json {
        let out: Vec<Value> = plan
            .iter()
            .map(|(key, fields)| {
                let mut cell = json!({
                    "staffId": key.staff.as_str(),
                    "date": key.date,
                    "row": key.row,
                    "clear": codec::is_blank(fields),
                });
                cell["fields"] = fields_json(fields);
                cell
            })
            .collect();
        return print_json(&Value::Array(out));
    }

    for (key, fields) in &plan {
        let body = if codec::is_blank(fields) {
            "(clear)".to_string()
        } else {
            codec::encode(fields).join(" / ")
        };
        println!("{} #{} {:<6} {}", key.date, key.row, key.staff.as_str(), body);
    }
    Ok(())
}
