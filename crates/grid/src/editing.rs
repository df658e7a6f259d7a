//! Selection and edit state machine.
//!
//! `Selected` ⇄ `Editing(Append | Overwrite)`. Every transition out of an
//! edit either commits the buffer (Enter, Tab, click elsewhere, blur) or
//! discards it (Escape, undo), and always leaves a selected line behind.

use careshift_core::{CellLine, LINES_PER_CELL};
use careshift_engine::{codec, ShiftRecord};

use crate::grid::{CellWrite, ShiftGrid};
use crate::input::{InputEvent, InputOutcome, Key, Modifiers};
use crate::mode::{EditMode, EditSession, GridMode};
use crate::outbox::PersistTiming;

impl ShiftGrid {
    /// Route one input event through the state machine.
    pub fn handle_input(&mut self, event: InputEvent) -> InputOutcome {
        match event {
            InputEvent::Click { target, modifiers } => InputOutcome::from_flag(self.click(target, modifiers)),
            InputEvent::DoubleClick { target } => {
                if !self.click(target, Modifiers::NONE) {
                    return InputOutcome::ignored();
                }
                InputOutcome::from_flag(self.start_edit())
            }
            InputEvent::Key { key, modifiers } => self.handle_key(key, modifiers),
            InputEvent::Text(text) => InputOutcome::from_flag(self.insert_text(&text)),
            InputEvent::CompositionStart => {
                if !self.mode.is_editing() {
                    self.begin_edit(EditMode::Overwrite, String::new());
                }
                if let Some(session) = self.mode.session_mut() {
                    session.composing = true;
                }
                InputOutcome::handled()
            }
            InputEvent::CompositionEnd(text) => {
                if let Some(session) = self.mode.session_mut() {
                    session.composing = false;
                }
                InputOutcome::from_flag(self.insert_text(&text))
            }
            InputEvent::Blur => InputOutcome::from_flag(self.commit_open_edit()),
            InputEvent::Copy => InputOutcome::with_clipboard(self.copy()),
            InputEvent::Cut => InputOutcome::with_clipboard(self.cut()),
            InputEvent::Paste { system_text, metadata } => {
                self.paste(system_text.as_deref(), metadata.as_deref());
                InputOutcome::handled()
            }
            InputEvent::Undo => InputOutcome::from_flag(self.undo()),
            InputEvent::Redo => InputOutcome::from_flag(self.redo()),
            InputEvent::DragDrop { from, to } => match self.drag_drop(&from, &to) {
                Ok(moved) => InputOutcome::from_flag(moved),
                Err(e) => {
                    log::debug!("drop ignored: {}", e);
                    InputOutcome::ignored()
                }
            },
        }
    }

    fn handle_key(&mut self, key: Key, modifiers: Modifiers) -> InputOutcome {
        let composing = self.mode.session().map_or(false, |s| s.composing);
        if composing && matches!(key, Key::Enter | Key::Tab | Key::Escape) {
            return InputOutcome::ignored();
        }

        if modifiers.command() {
            return match key {
                Key::Char('z') | Key::Char('Z') if modifiers.shift => InputOutcome::from_flag(self.redo()),
                Key::Char('z') | Key::Char('Z') => InputOutcome::from_flag(self.undo()),
                Key::Char('y') | Key::Char('Y') => InputOutcome::from_flag(self.redo()),
                Key::Char('c') | Key::Char('C') => InputOutcome::with_clipboard(self.copy()),
                Key::Char('x') | Key::Char('X') => InputOutcome::with_clipboard(self.cut()),
                _ => InputOutcome::ignored(),
            };
        }

        if self.mode.is_editing() {
            return match key {
                Key::Enter => {
                    self.confirm_edit_vertical(modifiers.shift);
                    InputOutcome::handled()
                }
                Key::Tab => {
                    self.confirm_edit_horizontal(if modifiers.shift { -1 } else { 1 });
                    InputOutcome::handled()
                }
                Key::Escape => {
                    self.cancel_edit();
                    InputOutcome::handled()
                }
                Key::Backspace => {
                    if let Some(session) = self.mode.session_mut() {
                        session.buffer.pop();
                    }
                    InputOutcome::handled()
                }
                Key::Char(c) if !modifiers.is_shortcut() && !c.is_control() => {
                    if let Some(session) = self.mode.session_mut() {
                        session.buffer.push(c);
                    }
                    InputOutcome::handled()
                }
                Key::F2 => InputOutcome::handled(),
                // Caret movement belongs to the host editor
                _ => InputOutcome::ignored(),
            };
        }

        match key {
            Key::F2 => InputOutcome::from_flag(self.start_edit()),
            Key::Enter => InputOutcome::from_flag(self.move_vertical(modifiers.shift)),
            Key::Tab => InputOutcome::from_flag(self.move_horizontal(if modifiers.shift { -1 } else { 1 })),
            Key::Escape => {
                self.selection.collapse();
                InputOutcome::handled()
            }
            Key::Backspace | Key::Delete => {
                self.delete_selection();
                InputOutcome::handled()
            }
            Key::Up => InputOutcome::from_flag(self.move_vertical(true)),
            Key::Down => InputOutcome::from_flag(self.move_vertical(false)),
            Key::Left => InputOutcome::from_flag(self.move_horizontal(-1)),
            Key::Right => InputOutcome::from_flag(self.move_horizontal(1)),
            Key::Char(c) if !modifiers.is_shortcut() && !c.is_control() => {
                self.begin_edit(EditMode::Overwrite, c.to_string());
                InputOutcome::handled()
            }
            _ => InputOutcome::ignored(),
        }
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    /// Pointer click. Returns false when the click stays inside the open
    /// editor (the host moves its caret) or misses the grid.
    fn click(&mut self, target: CellLine, modifiers: Modifiers) -> bool {
        if target.line >= LINES_PER_CELL || !self.layout.contains(&target.cell) {
            return false;
        }
        if self.mode.session().map_or(false, |s| s.target == target) {
            return false;
        }
        self.commit_open_edit();

        if modifiers.shift {
            self.selection.extend_to(&self.layout, &target.cell);
        } else if modifiers.command() {
            self.selection.toggle(target.cell);
        } else {
            self.selection.select(target);
        }
        true
    }

    /// Enter / arrow movement: one line down (or up), wrapping into the
    /// next slot. Stays put at the grid's edge.
    fn move_vertical(&mut self, up: bool) -> bool {
        let anchor = self.selection.anchor();
        let next = if up { self.layout.line_above(anchor) } else { self.layout.line_below(anchor) };
        match next {
            Some(next) => {
                self.selection.select(next);
                true
            }
            None => false,
        }
    }

    /// Tab / arrow movement: same line of the neighbouring staff column.
    fn move_horizontal(&mut self, step: isize) -> bool {
        let anchor = self.selection.anchor();
        let line = anchor.line;
        match self.layout.adjacent_cell(&anchor.cell, step) {
            Some(cell) => {
                self.selection.select(cell.line(line));
                true
            }
            None => false,
        }
    }

    // ------------------------------------------------------------------
    // Edit sessions
    // ------------------------------------------------------------------

    pub fn edit_buffer(&self) -> Option<&str> {
        self.mode.session().map(|s| s.buffer.as_str())
    }

    /// F2 / double-click: edit the active line starting from its text.
    pub fn start_edit(&mut self) -> bool {
        if self.mode.is_editing() {
            return false;
        }
        let anchor = self.selection.anchor().clone();
        let text = self.line_text(&anchor.cell, anchor.line);
        self.begin_edit(EditMode::Append, text);
        true
    }

    fn begin_edit(&mut self, mode: EditMode, buffer: String) {
        self.commit_open_edit();
        self.selection.collapse();
        let target = self.selection.anchor().clone();
        let original = self.line_text(&target.cell, target.line);
        self.mode = GridMode::Editing(EditSession { target, mode, buffer, original, composing: false });
    }

    fn insert_text(&mut self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        match self.mode.session_mut() {
            Some(session) => session.buffer.push_str(text),
            None => self.begin_edit(EditMode::Overwrite, text.to_string()),
        }
        true
    }

    /// Commit the open edit, if any, leaving the selection where it is.
    pub fn commit_open_edit(&mut self) -> bool {
        let GridMode::Editing(session) = std::mem::take(&mut self.mode) else {
            return false;
        };
        let committed = self.commit_line(session.target, &session.buffer);
        self.flush_deferred();
        committed
    }

    /// Discard the open edit; the displayed value is unchanged.
    pub fn cancel_edit(&mut self) {
        if !self.mode.is_editing() {
            return;
        }
        self.mode = GridMode::Selected;
        self.flush_deferred();
    }

    fn confirm_edit_vertical(&mut self, up: bool) {
        let anchor = self.selection.anchor();
        let next = if up { self.layout.line_above(anchor) } else { self.layout.line_below(anchor) };
        self.commit_open_edit();
        if let Some(next) = next {
            self.selection.select(next);
        }
    }

    fn confirm_edit_horizontal(&mut self, step: isize) {
        self.commit_open_edit();
        self.move_horizontal(step);
    }

    /// Write one line of text into a cell as one undo group.
    ///
    /// Unchanged text is a no-op, as is a blank line written into an empty
    /// cell. The cell's document id survives the edit.
    pub(crate) fn commit_line(&mut self, target: CellLine, text: &str) -> bool {
        let key = target.cell;
        if target.line >= LINES_PER_CELL || !self.layout.contains(&key) {
            return false;
        }
        if self.line_text(&key, target.line) == text {
            return false;
        }
        let existing = self.book.get(&key);
        if existing.is_none() && text.trim().is_empty() {
            return false;
        }

        let overlay = self.overlays.state_for(&key);
        let base = existing.map(|r| r.fields.clone()).unwrap_or_default();
        let fields = codec::apply_line(&base, target.line, text, overlay);
        let record = match existing {
            Some(existing) if existing.fields == fields => return false,
            Some(existing) => {
                let mut record = existing.clone();
                record.fields = fields;
                record
            }
            None => ShiftRecord::new(key, fields),
        };
        self.apply_group("Edit", vec![CellWrite::Upsert(record)], PersistTiming::Immediate)
    }

    /// Backspace/Delete while selected: a multi-cell selection loses every
    /// cell's content as one group; a single cell loses the active line.
    pub fn delete_selection(&mut self) -> bool {
        if self.mode.is_editing() {
            return false;
        }
        if self.selection.is_multi() {
            let writes = self
                .selection
                .cells()
                .into_iter()
                .filter(|k| self.book.get(k).is_some())
                .map(CellWrite::Clear)
                .collect();
            return self.apply_group("Delete", writes, PersistTiming::Immediate);
        }
        let anchor = self.selection.anchor().clone();
        self.commit_line(anchor, "")
    }
}
