use careshift_core::CellLine;

/// How an edit session started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditMode {
    /// F2 / double-click: buffer starts from the line's text
    Append,
    /// Typing over a selected cell: buffer starts empty
    Overwrite,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSession {
    pub target: CellLine,
    pub mode: EditMode,
    pub buffer: String,
    /// Line text when the session opened
    pub original: String,
    /// An IME composition is in progress
    pub composing: bool,
}

/// Grid modes determine how keyboard input is handled
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GridMode {
    #[default]
    Selected,
    Editing(EditSession),
}

impl GridMode {
    pub fn is_editing(&self) -> bool {
        matches!(self, GridMode::Editing(_))
    }

    pub fn session(&self) -> Option<&EditSession> {
        match self {
            GridMode::Editing(session) => Some(session),
            GridMode::Selected => None,
        }
    }

    pub fn session_mut(&mut self) -> Option<&mut EditSession> {
        match self {
            GridMode::Editing(session) => Some(session),
            GridMode::Selected => None,
        }
    }
}
