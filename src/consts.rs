//! Project-wide constants.

use std::path::PathBuf;

/// Page size used when a request does not name one.
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Upper bound on any requested page size.
pub const MAX_PAGE_SIZE: u64 = 100;

/// Role that grants root access to sensitive entities.
pub const ROOT_ROLE: &str = "root";

/// Default database path: `~/.backoffice/backoffice.db`.
/// Single DB for entity tables and config.
pub fn default_db_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".backoffice").join("backoffice.db"))
}

/// Format a number with comma separators (e.g. 1,234,567).
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i).is_multiple_of(3) {
            result.push(',');
        }
        result.push(c);
    }
    result
}
