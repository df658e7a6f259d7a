//! Toolkit-independent input events.

use careshift_core::{CellKey, CellLine};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    /// Cmd on macOS
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers { shift: false, ctrl: false, alt: false, meta: false };
    pub const SHIFT: Modifiers = Modifiers { shift: true, ctrl: false, alt: false, meta: false };
    pub const CTRL: Modifiers = Modifiers { shift: false, ctrl: true, alt: false, meta: false };

    /// Ctrl or Cmd: the platform command modifier.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }

    /// Any modifier that turns a character key into a shortcut.
    pub fn is_shortcut(&self) -> bool {
        self.ctrl || self.alt || self.meta
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Tab,
    Escape,
    Backspace,
    Delete,
    F2,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    /// Anything else (function keys, media keys); never starts an edit
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Click { target: CellLine, modifiers: Modifiers },
    DoubleClick { target: CellLine },
    Key { key: Key, modifiers: Modifiers },
    /// Committed text from the host text input
    Text(String),
    CompositionStart,
    /// IME composition finished with this text
    CompositionEnd(String),
    /// Focus left the grid
    Blur,
    Copy,
    Cut,
    /// `metadata` is the id the host stored next to the text, if any
    Paste { system_text: Option<String>, metadata: Option<String> },
    Undo,
    Redo,
    DragDrop { from: CellKey, to: CellKey },
}

impl InputEvent {
    pub fn key(key: Key) -> Self {
        Self::Key { key, modifiers: Modifiers::NONE }
    }

    pub fn click(target: CellLine) -> Self {
        Self::Click { target, modifiers: Modifiers::NONE }
    }
}

/// What the host should put on the system clipboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardPayload {
    pub text: String,
    /// Internal copy id, to be stored as clipboard metadata
    pub metadata: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputOutcome {
    /// False when the event should fall through to the host (e.g. caret
    /// movement inside the editor, IME keys)
    pub handled: bool,
    pub clipboard: Option<ClipboardPayload>,
}

impl InputOutcome {
    pub fn handled() -> Self {
        Self { handled: true, clipboard: None }
    }

    pub fn ignored() -> Self {
        Self::default()
    }

    pub fn from_flag(handled: bool) -> Self {
        Self { handled, clipboard: None }
    }

    pub fn with_clipboard(payload: ClipboardPayload) -> Self {
        Self { handled: true, clipboard: Some(payload) }
    }
}
