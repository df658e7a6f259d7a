use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Referenced document does not exist
    NotFound(String),
    /// Backend unreachable; the write may succeed later
    Unavailable(String),
    /// Backend refused the write
    Rejected(String),
    /// File I/O error
    Io(String),
    /// JSON encode/decode error
    Serde(String),
}

impl StoreError {
    /// Worth another attempt with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Io(_))
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "not found: {id}"),
            Self::Unavailable(msg) => write!(f, "store unavailable: {msg}"),
            Self::Rejected(msg) => write!(f, "write rejected: {msg}"),
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
            Self::Serde(msg) => write!(f, "JSON error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serde(e.to_string())
    }
}
