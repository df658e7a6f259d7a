use std::fmt;

use careshift_core::CellKey;
use careshift_store::StoreError;

#[derive(Debug)]
pub enum GridError {
    /// The layout has no staff or no dates, so nothing can be selected
    EmptyLayout,
    /// Cell is not part of the grid's layout
    OutOfGrid(CellKey),
    Store(StoreError),
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyLayout => write!(f, "layout has no cells"),
            Self::OutOfGrid(key) => write!(f, "cell {key} is outside the grid"),
            Self::Store(e) => write!(f, "store error: {e}"),
        }
    }
}

impl std::error::Error for GridError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for GridError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}
