use serde::{Deserialize, Serialize};

/// Framework-agnostic cell background (0xRRGGBB).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellColor(pub u32);

impl CellColor {
    pub const DEFAULT: CellColor = CellColor(0xFFFFFF);
    pub const CANCELED_KEEP_TIME: CellColor = CellColor(0xD9D9D9);
    pub const CANCELED_REMOVE_TIME: CellColor = CellColor(0xA6A6A6);
    pub const SCHEDULED_DAY_OFF: CellColor = CellColor(0xF8BBD0);
    pub const DAY_OFF_REQUEST: CellColor = CellColor(0xFFF59D);

    pub const fn from_hex(hex: u32) -> Self {
        Self(hex & 0xFF_FFFF)
    }

    /// `#RRGGBB`
    pub fn to_hex(self) -> String {
        format!("#{:06X}", self.0)
    }

    pub fn rgb(self) -> (u8, u8, u8) {
        (((self.0 >> 16) & 0xFF) as u8, ((self.0 >> 8) & 0xFF) as u8, (self.0 & 0xFF) as u8)
    }
}

impl Default for CellColor {
    fn default() -> Self {
        Self::DEFAULT
    }
}
