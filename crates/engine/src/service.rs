//! Service types and their fixed label table.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::color::CellColor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    /// Physical care
    Shintai,
    /// Housework assistance
    Kaji,
    /// Severe-disability home visit
    Judo,
    /// Hospital accompaniment
    Tsuin,
    /// Behavioral support
    Kodo,
    /// Mobility support
    Ido,
    /// Accompanied outing
    Doko,
    /// Staff meeting
    Kaigi,
    /// Training
    Kenshu,
    /// Tentative booking; shown without a label
    Yotei,
    #[default]
    Other,
}

impl ServiceType {
    pub const ALL: [ServiceType; 11] = [
        ServiceType::Shintai,
        ServiceType::Kaji,
        ServiceType::Judo,
        ServiceType::Tsuin,
        ServiceType::Kodo,
        ServiceType::Ido,
        ServiceType::Doko,
        ServiceType::Kaigi,
        ServiceType::Kenshu,
        ServiceType::Yotei,
        ServiceType::Other,
    ];

    /// Label written inside the parentheses on line 1.
    pub fn label(self) -> &'static str {
        match self {
            Self::Shintai => "身体",
            Self::Kaji => "家事",
            Self::Judo => "重度",
            Self::Tsuin => "通院",
            Self::Kodo => "行動",
            Self::Ido => "移動",
            Self::Doko => "同行",
            Self::Kaigi => "会議",
            Self::Kenshu => "研修",
            Self::Yotei => "予定",
            Self::Other => "その他",
        }
    }

    /// Exact label lookup.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.label() == label)
    }

    /// Stable snake_case code, as stored remotely and in rate tables.
    pub fn code(self) -> &'static str {
        match self {
            Self::Shintai => "shintai",
            Self::Kaji => "kaji",
            Self::Judo => "judo",
            Self::Tsuin => "tsuin",
            Self::Kodo => "kodo",
            Self::Ido => "ido",
            Self::Doko => "doko",
            Self::Kaigi => "kaigi",
            Self::Kenshu => "kenshu",
            Self::Yotei => "yotei",
            Self::Other => "other",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }

    /// Whether encode appends `(label)` to the client name.
    pub fn shows_label(self) -> bool {
        !matches!(self, Self::Other | Self::Yotei)
    }

    /// Background for an active shift of this type; `None` keeps the default.
    pub fn color(self) -> Option<CellColor> {
        let hex = match self {
            Self::Shintai => 0xFFE4E1,
            Self::Kaji => 0xE0F7E9,
            Self::Judo => 0xFFF3CD,
            Self::Tsuin => 0xE3F2FD,
            Self::Kodo => 0xF3E5F5,
            Self::Ido => 0xE0F2F1,
            Self::Doko => 0xFBE9E7,
            Self::Kaigi => 0xECEFF1,
            Self::Kenshu => 0xF1F8E9,
            Self::Yotei => 0xFFFDE7,
            Self::Other => return None,
        };
        Some(CellColor::from_hex(hex))
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
