//! Database options and default path resolution.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Connection options applied at open time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbOptions {
    /// SQLite journal mode (`WAL`, `DELETE`, `MEMORY`, ...).
    pub journal_mode: String,
    /// Enforce foreign key constraints.
    pub foreign_keys: bool,
    /// Busy handler timeout in milliseconds.
    pub busy_timeout_ms: u64,
}

impl Default for DbOptions {
    fn default() -> Self {
        Self {
            journal_mode: "WAL".to_string(),
            foreign_keys: true,
            busy_timeout_ms: 5_000,
        }
    }
}

/// Default database path for the CLI.
///
/// Resolution order:
/// 1. `TURNSTILE_DB_PATH` environment variable
/// 2. `TURNSTILE_HOME/db.sqlite`
/// 3. `~/.turnstile/db.sqlite`
pub fn default_db_path() -> PathBuf {
    if let Ok(path) = std::env::var("TURNSTILE_DB_PATH") {
        return PathBuf::from(shellexpand::tilde(&path).to_string());
    }

    if let Ok(home) = std::env::var("TURNSTILE_HOME") {
        let mut path = PathBuf::from(shellexpand::tilde(&home).to_string());
        path.push("db.sqlite");
        return path;
    }

    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    let mut path = PathBuf::from(home);
    path.push(".turnstile");
    path.push("db.sqlite");
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = DbOptions::default();
        assert_eq!(opts.journal_mode, "WAL");
        assert!(opts.foreign_keys);
        assert_eq!(opts.busy_timeout_ms, 5_000);
    }
}
