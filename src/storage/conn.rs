//! Connection facade over the embedded engine.
//!
//! Owns the `rusqlite::Connection` and exposes the primitive verbs the
//! schedulers need: `run`, `get`, `all`, `batch`. Application code never
//! touches this directly; every call arrives through an
//! `OperationScheduler`, which is what makes the single handle safe to
//! share. Result rows come back as JSON maps.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::ToSql;
use tracing::trace;

use crate::config::DbOptions;
use crate::types::{value_ref_to_json, NamedParams, Result, Row};

/// Wrapper around one `rusqlite::Connection`.
///
/// The mutex satisfies aliasing; the schedulers are the real serializer.
/// By the time a lock is taken here, at most one operation per scheduler is
/// in flight.
pub struct Connection {
    inner: Mutex<rusqlite::Connection>,
}

impl Connection {
    /// Open (creating if missing) a database file and apply pragmas from
    /// `options`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Sqlite` if the engine fails to open the file
    /// or apply a pragma.
    pub fn open<P: AsRef<Path>>(path: P, options: &DbOptions) -> Result<Self> {
        let conn = rusqlite::Connection::open(path)?;
        Self::configure(&conn, options)?;
        Ok(Self {
            inner: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (tests, scratch work).
    pub fn open_in_memory(options: &DbOptions) -> Result<Self> {
        let conn = rusqlite::Connection::open_in_memory()?;
        Self::configure(&conn, options)?;
        Ok(Self {
            inner: Mutex::new(conn),
        })
    }

    fn configure(conn: &rusqlite::Connection, options: &DbOptions) -> Result<()> {
        // Some pragmas answer with a row; step through whatever comes back.
        for pragma in [
            format!("PRAGMA journal_mode = {}", options.journal_mode),
            format!(
                "PRAGMA foreign_keys = {}",
                if options.foreign_keys { "ON" } else { "OFF" }
            ),
            format!("PRAGMA busy_timeout = {}", options.busy_timeout_ms),
        ] {
            let mut stmt = conn.prepare(&pragma)?;
            let mut rows = stmt.query([])?;
            while rows.next()?.is_some() {}
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, rusqlite::Connection> {
        self.inner.lock().expect("connection mutex poisoned")
    }

    /// Execute a statement; returns the number of affected rows.
    pub fn run(&self, sql: &str, params: &NamedParams) -> Result<usize> {
        trace!(sql, "run");
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(sql)?;
        Ok(stmt.execute(&bind(params)[..])?)
    }

    /// Execute an INSERT; returns the new rowid.
    pub fn insert(&self, sql: &str, params: &NamedParams) -> Result<i64> {
        trace!(sql, "insert");
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(sql)?;
        stmt.execute(&bind(params)[..])?;
        Ok(conn.last_insert_rowid())
    }

    /// Run a query; returns the first row, if any.
    pub fn get(&self, sql: &str, params: &NamedParams) -> Result<Option<Row>> {
        Ok(self.all(sql, params)?.into_iter().next())
    }

    /// Run a query; returns all rows as JSON maps in SELECT order.
    pub fn all(&self, sql: &str, params: &NamedParams) -> Result<Vec<Row>> {
        trace!(sql, "all");
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(sql)?;
        let columns: Vec<String> = stmt
            .column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();
        let mut rows = stmt.query(&bind(params)[..])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut map = Row::new();
            for (index, column) in columns.iter().enumerate() {
                map.insert(column.clone(), value_ref_to_json(row.get_ref(index)?));
            }
            out.push(map);
        }
        Ok(out)
    }

    /// Execute a multi-statement script (no parameters).
    pub fn batch(&self, sql: &str) -> Result<()> {
        trace!("batch script");
        let conn = self.lock();
        conn.execute_batch(sql)?;
        Ok(())
    }

    /// Rowid generated by the most recent successful INSERT.
    pub fn last_insert_rowid(&self) -> i64 {
        self.lock().last_insert_rowid()
    }
}

fn bind(params: &NamedParams) -> Vec<(&str, &dyn ToSql)> {
    params
        .iter()
        .map(|(name, value)| (name.as_str(), value as &dyn ToSql))
        .collect()
}
