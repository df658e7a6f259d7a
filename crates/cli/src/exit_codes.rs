//! CLI Exit Code Registry
//!
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! | Code | Meaning                                    |
//! |------|--------------------------------------------|
//! | 0    | Success                                    |
//! | 1    | General error                              |
//! | 2    | Usage error (bad args, unknown staff/date) |
//! | 3    | Store directory unreadable or malformed    |
//! | 4    | Settings file unreadable or malformed      |

pub const EXIT_SUCCESS: u8 = 0;

/// Avoid this; prefer a specific code.
pub const EXIT_ERROR: u8 = 1;

pub const EXIT_USAGE: u8 = 2;

pub const EXIT_STORE: u8 = 3;

pub const EXIT_CONFIG: u8 = 4;
