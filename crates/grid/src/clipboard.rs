//! Clipboard operations for the shift grid.
//!
//! This module contains:
//! - InternalClipboard for tracking copied cells with their records
//! - Copy, cut, paste (structured and plain text)
//! - Parsing of newline/tab clipboard text into per-cell shift fields
//!
//! Clipboard text format: newline rows, tab columns, four rows per slot.

use std::time::{Duration, Instant};

use careshift_core::{CellKey, GridLayout, GridPos, LINES_PER_CELL};
use careshift_engine::{codec, CellColor, Overlays, ShiftFields, ShiftRecord};

use crate::grid::{CellWrite, ShiftGrid};
use crate::input::ClipboardPayload;
use crate::outbox::PersistTiming;

/// A copied system clipboard is trusted as ours for this long when the host
/// cannot read the system clipboard back.
const UNREADABLE_CLIPBOARD_GRACE: Duration = Duration::from_secs(2);

/// One cell captured by a copy, positioned relative to the copied
/// rectangle's top-left cell.
#[derive(Debug, Clone, PartialEq)]
pub struct CopiedCell {
    pub d_col: usize,
    pub d_slot: usize,
    pub lines: [String; 4],
    pub background: CellColor,
    /// `None` when the cell was empty
    pub record: Option<ShiftRecord>,
}

/// Internal clipboard for tracking copied cells.
/// Keeps the structured records so a paste does not go through the text codec.
#[derive(Debug, Clone)]
pub struct InternalClipboard {
    /// Text handed to the system clipboard
    pub text: String,
    pub cells: Vec<CopiedCell>,
    /// Unique id written to clipboard metadata for reliable internal detection
    pub id: u128,
    pub created_at: Instant,
}

impl InternalClipboard {
    /// Metadata string stored next to the system text.
    pub fn metadata(&self) -> String {
        format!("\"{}\"", self.id)
    }
}

/// Normalize clipboard text for comparison (line endings, outer whitespace).
pub fn normalize_clipboard_text(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n").trim().to_string()
}

/// Whether a paste should use the internal clipboard.
///
/// True when the metadata carries the internal id, when the system text
/// matches the internal text, or when the system clipboard is unreadable and
/// the copy is recent.
pub fn is_internal_paste(
    internal: Option<&InternalClipboard>,
    system_text: Option<&str>,
    metadata: Option<&str>,
    now: Instant,
) -> bool {
    let Some(ic) = internal else {
        return false;
    };
    if metadata == Some(ic.metadata().as_str()) {
        return true;
    }
    if let Some(text) = system_text {
        return normalize_clipboard_text(text) == normalize_clipboard_text(&ic.text);
    }
    if metadata.is_some() {
        return false;
    }
    now.saturating_duration_since(ic.created_at) < UNREADABLE_CLIPBOARD_GRACE
}

/// Text with no row or column delimiters (after trimming).
fn is_single_value(text: &str) -> bool {
    let text = normalize_clipboard_text(text);
    !text.contains('\n') && !text.contains('\t')
}

/// Split clipboard text into cells to write, starting at `anchor`.
///
/// Every four rows form one slot; slot groups advance down the grid from
/// the anchor slot and tab columns advance across staff. The block is as
/// wide as its widest row, short rows padded with empty fields. Targets
/// outside the layout are dropped. Each group is decoded with its target's
/// overlay.
pub fn plan_text_paste(
    layout: &GridLayout,
    overlays: &Overlays,
    anchor: &CellKey,
    text: &str,
) -> Vec<(CellKey, ShiftFields)> {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let text = text.strip_suffix('\n').unwrap_or(&text);
    let rows: Vec<Vec<&str>> = text.split('\n').map(|row| row.split('\t').collect()).collect();

    let cols = rows.iter().map(Vec::len).max().unwrap_or(1);

    let mut planned = Vec::new();
    for (group, chunk) in rows.chunks(LINES_PER_CELL as usize).enumerate() {
        for col in 0..cols {
            let Some(target) = layout.offset(anchor, col, group) else {
                continue;
            };
            let lines: Vec<&str> = (0..LINES_PER_CELL as usize)
                .map(|i| chunk.get(i).and_then(|row| row.get(col)).copied().unwrap_or(""))
                .collect();
            let fields = codec::decode(&lines, overlays.state_for(&target));
            planned.push((target, fields));
        }
    }
    planned
}

impl ShiftGrid {
    pub fn internal_clipboard(&self) -> Option<&InternalClipboard> {
        self.clipboard.as_ref()
    }

    /// Copy the selection (or the edit buffer while editing).
    pub fn copy(&mut self) -> ClipboardPayload {
        if let Some(session) = self.mode.session() {
            // Text-only copy; the internal clipboard keeps the last cell copy
            return ClipboardPayload { text: session.buffer.clone(), metadata: None };
        }

        let (text, cells) = if self.selection.is_multi() {
            self.copy_rect()
        } else {
            let key = self.selection.active_cell().clone();
            let snapshot = self.snapshot_cell(&key);
            let text = snapshot.lines.join("\n");
            let cell = CopiedCell {
                d_col: 0,
                d_slot: 0,
                lines: snapshot.lines,
                background: snapshot.background,
                record: snapshot.record,
            };
            (text, vec![cell])
        };

        let clipboard = InternalClipboard {
            text: text.clone(),
            cells,
            id: rand::random(),
            created_at: self.clock.now(),
        };
        let metadata = clipboard.metadata();
        log::debug!("copied {} cell(s)", clipboard.cells.len());
        self.clipboard = Some(clipboard);
        ClipboardPayload { text, metadata: Some(metadata) }
    }

    /// TSV of the selection's bounding box; unselected cells inside the box
    /// copy as empty.
    fn copy_rect(&self) -> (String, Vec<CopiedCell>) {
        let Some((min, max)) = self.selection.bounds(&self.layout) else {
            return (String::new(), Vec::new());
        };
        let mut rows = Vec::new();
        let mut cells = Vec::new();
        for slot in min.slot..=max.slot {
            let mut slot_lines: Vec<[String; 4]> = Vec::new();
            for col in min.col..=max.col {
                let key = self.layout.cell_at(GridPos { col, slot });
                match key.filter(|k| self.selection.contains(k)) {
                    Some(key) => {
                        let snapshot = self.snapshot_cell(&key);
                        slot_lines.push(snapshot.lines.clone());
                        cells.push(CopiedCell {
                            d_col: col - min.col,
                            d_slot: slot - min.slot,
                            lines: snapshot.lines,
                            background: snapshot.background,
                            record: snapshot.record,
                        });
                    }
                    None => slot_lines.push(Default::default()),
                }
            }
            for line in 0..LINES_PER_CELL as usize {
                let row: Vec<&str> = slot_lines.iter().map(|l| l[line].as_str()).collect();
                rows.push(row.join("\t"));
            }
        }
        (rows.join("\n"), cells)
    }

    /// Copy, then clear every selected cell as one undo group. While
    /// editing only the buffer is cut.
    pub fn cut(&mut self) -> ClipboardPayload {
        let payload = self.copy();
        if let Some(session) = self.mode.session_mut() {
            session.buffer.clear();
            return payload;
        }
        let writes: Vec<CellWrite> = self
            .selection
            .cells()
            .into_iter()
            .filter(|k| self.book.get(k).is_some())
            .map(CellWrite::Clear)
            .collect();
        self.apply_group("Cut", writes, PersistTiming::Immediate);
        payload
    }

    /// Paste from the host clipboard. Returns the cells written.
    pub fn paste(&mut self, system_text: Option<&str>, metadata: Option<&str>) -> Vec<CellKey> {
        if self.mode.is_editing() {
            self.paste_into_edit(system_text);
            return Vec::new();
        }

        let now = self.clock.now();
        let internal = is_internal_paste(self.clipboard.as_ref(), system_text, metadata, now);
        let single_value = system_text.map_or(false, is_single_value);
        if internal || (single_value && self.clipboard.is_some()) {
            return self.paste_internal();
        }

        let Some(text) = system_text else {
            return Vec::new();
        };
        if single_value {
            let target = self.selection.anchor().clone();
            let cell = target.cell.clone();
            return if self.commit_line(target, text.trim()) { vec![cell] } else { Vec::new() };
        }
        self.paste_text(text)
    }

    /// First line of the pasted text goes into the edit buffer.
    fn paste_into_edit(&mut self, system_text: Option<&str>) {
        let text = system_text
            .map(str::to_string)
            .or_else(|| self.clipboard.as_ref().map(|ic| ic.text.clone()));
        let Some(text) = text else { return };
        let line = text.lines().next().unwrap_or("").trim();
        if let Some(session) = self.mode.session_mut() {
            session.buffer.push_str(line);
        }
    }

    /// Structured paste of the internal clipboard. A single copied cell is
    /// broadcast into every selected cell; a copied block lands relative to
    /// the active cell.
    fn paste_internal(&mut self) -> Vec<CellKey> {
        let Some(ic) = self.clipboard.clone() else {
            return Vec::new();
        };
        let targets: Vec<(CellKey, &CopiedCell)> = match ic.cells.as_slice() {
            [single] => self.selection.cells().into_iter().map(|k| (k, single)).collect(),
            cells => {
                let anchor = self.selection.active_cell().clone();
                cells
                    .iter()
                    .filter_map(|c| self.layout.offset(&anchor, c.d_col, c.d_slot).map(|k| (k, c)))
                    .collect()
            }
        };

        let mut written = Vec::with_capacity(targets.len());
        let mut writes = Vec::with_capacity(targets.len());
        for (target, source) in targets {
            let write = match &source.record {
                Some(record) => {
                    let mut fields = record.fields.clone();
                    if self.overlays.state_for(&target).suppresses_duration() {
                        fields.duration = None;
                    }
                    self.paste_write(target.clone(), fields)
                }
                None => CellWrite::Clear(target.clone()),
            };
            written.push(target);
            writes.push(write);
        }
        self.apply_group("Paste", writes, PersistTiming::Immediate);
        written
    }

    fn paste_text(&mut self, text: &str) -> Vec<CellKey> {
        let anchor = self.selection.active_cell().clone();
        let planned = plan_text_paste(&self.layout, &self.overlays, &anchor, text);
        let written: Vec<CellKey> = planned.iter().map(|(k, _)| k.clone()).collect();
        let writes = planned
            .into_iter()
            .map(|(target, fields)| self.paste_write(target, fields))
            .collect();
        self.apply_group("Paste", writes, PersistTiming::Immediate);
        written
    }

    /// Pasted content keeps the target's document id but never its
    /// cancellation.
    fn paste_write(&self, target: CellKey, fields: ShiftFields) -> CellWrite {
        if codec::is_blank(&fields) {
            return CellWrite::Clear(target);
        }
        let record = match self.book.get(&target) {
            Some(existing) => {
                let mut record = existing.clone();
                record.fields = fields;
                record.reactivate();
                record
            }
            None => ShiftRecord::new(target, fields),
        };
        CellWrite::Upsert(record)
    }
}
