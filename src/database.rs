//! High-level database API.
//!
//! [`Database`] owns the connection facade, the connection-wide
//! [`OperationScheduler`], and the [`TransactionScheduler`]. Every statement
//! method compiles its SQL synchronously (shape errors surface before
//! anything is queued) and returns a [`Queued`] future that settles when
//! the scheduler has run the statement. Firing several statements without
//! awaiting each one is the intended usage; submission order is execution
//! order.

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::config::DbOptions;
use crate::query::builder::{
    count_sql, delete_sql, exists_sql, insert_sql, select_sql, update_sql, SelectOptions,
};
use crate::query::predicate::Connector;
use crate::sched::operation::{OperationScheduler, Queued};
use crate::sched::transaction::{TransactionCore, TransactionScheduler};
use crate::storage::Connection;
use crate::types::{NamedParams, Result, Row};

/// Statement surface shared by [`Database`] and [`Transaction`]: builds SQL
/// up front, enqueues the driver call on its scheduler.
#[derive(Clone)]
pub(crate) struct Executor {
    sched: OperationScheduler,
    conn: Arc<Connection>,
}

impl Executor {
    fn new(sched: OperationScheduler, conn: Arc<Connection>) -> Self {
        Self { sched, conn }
    }

    fn select(&self, table: &str, opts: &SelectOptions) -> Result<Queued<Vec<Row>>> {
        let (sql, params) = select_sql(table, opts)?;
        let conn = Arc::clone(&self.conn);
        Ok(self.sched.enqueue(move || async move { conn.all(&sql, &params) }))
    }

    fn get(&self, table: &str, opts: &SelectOptions) -> Result<Queued<Option<Row>>> {
        let opts = SelectOptions {
            limit: Some(1),
            ..opts.clone()
        };
        let (sql, params) = select_sql(table, &opts)?;
        let conn = Arc::clone(&self.conn);
        Ok(self.sched.enqueue(move || async move { conn.get(&sql, &params) }))
    }

    fn insert(&self, table: &str, row: &Value) -> Result<Queued<i64>> {
        let (sql, params) = insert_sql(table, row)?;
        let conn = Arc::clone(&self.conn);
        Ok(self
            .sched
            .enqueue(move || async move { conn.insert(&sql, &params) }))
    }

    fn insert_many(&self, table: &str, rows: &[Value]) -> Result<Queued<Vec<i64>>> {
        let statements = rows
            .iter()
            .map(|row| insert_sql(table, row))
            .collect::<Result<Vec<_>>>()?;
        let conn = Arc::clone(&self.conn);
        Ok(self.sched.enqueue(move || async move {
            let mut rowids = Vec::with_capacity(statements.len());
            for (sql, params) in &statements {
                rowids.push(conn.insert(sql, params)?);
            }
            Ok(rowids)
        }))
    }

    fn update(&self, table: &str, set: &Value, filter: Option<&Value>) -> Result<Queued<usize>> {
        let (sql, params) = update_sql(table, set, filter, Connector::And)?;
        let conn = Arc::clone(&self.conn);
        Ok(self.sched.enqueue(move || async move { conn.run(&sql, &params) }))
    }

    fn delete(&self, table: &str, filter: Option<&Value>) -> Result<Queued<usize>> {
        let (sql, params) = delete_sql(table, filter, Connector::And)?;
        let conn = Arc::clone(&self.conn);
        Ok(self.sched.enqueue(move || async move { conn.run(&sql, &params) }))
    }

    fn count(&self, table: &str, filter: Option<&Value>) -> Result<Queued<i64>> {
        let (sql, params) = count_sql(table, filter, Connector::And)?;
        let conn = Arc::clone(&self.conn);
        Ok(self.sched.enqueue(move || async move {
            let row = conn.get(&sql, &params)?;
            Ok(row
                .as_ref()
                .and_then(|r| r.get("n"))
                .and_then(Value::as_i64)
                .unwrap_or(0))
        }))
    }

    fn exists(&self, table: &str, filter: Option<&Value>) -> Result<Queued<bool>> {
        let (sql, params) = exists_sql(table, filter, Connector::And)?;
        let conn = Arc::clone(&self.conn);
        Ok(self.sched.enqueue(move || async move {
            let row = conn.get(&sql, &params)?;
            Ok(row
                .as_ref()
                .and_then(|r| r.get("present"))
                .and_then(Value::as_i64)
                .unwrap_or(0)
                != 0)
        }))
    }

    fn execute(&self, sql: impl Into<String>, params: NamedParams) -> Queued<usize> {
        let sql = sql.into();
        let conn = Arc::clone(&self.conn);
        self.sched
            .enqueue(move || async move { conn.run(&sql, &params) })
    }

    fn query(&self, sql: impl Into<String>, params: NamedParams) -> Queued<Vec<Row>> {
        let sql = sql.into();
        let conn = Arc::clone(&self.conn);
        self.sched
            .enqueue(move || async move { conn.all(&sql, &params) })
    }

    fn script(&self, sql: String) -> Queued<()> {
        let conn = Arc::clone(&self.conn);
        self.sched.enqueue(move || async move { conn.batch(&sql) })
    }
}

/// An embedded database fronted by ordered, single-flight scheduling.
pub struct Database {
    conn: Arc<Connection>,
    exec: Executor,
    transactions: TransactionScheduler,
    sched: OperationScheduler,
}

impl Database {
    /// Open (creating if missing) a database file with default options.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, &DbOptions::default())
    }

    /// Open a database file with explicit options.
    pub fn open_with<P: AsRef<Path>>(path: P, options: &DbOptions) -> Result<Self> {
        info!(path = %path.as_ref().display(), "opening database");
        Ok(Self::from_connection(Connection::open(path, options)?))
    }

    /// Open an in-memory database with default options.
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::from_connection(Connection::open_in_memory(
            &DbOptions::default(),
        )?))
    }

    fn from_connection(conn: Connection) -> Self {
        let conn = Arc::new(conn);
        let sched = OperationScheduler::new();
        Self {
            exec: Executor::new(sched.clone(), Arc::clone(&conn)),
            transactions: TransactionScheduler::new(),
            sched,
            conn,
        }
    }

    /// Select rows.
    ///
    /// # Errors
    ///
    /// Shape errors from the filter surface here, synchronously; execution
    /// errors settle the returned future.
    pub fn select(&self, table: &str, opts: &SelectOptions) -> Result<Queued<Vec<Row>>> {
        self.exec.select(table, opts)
    }

    /// Select the first matching row, if any.
    pub fn get(&self, table: &str, opts: &SelectOptions) -> Result<Queued<Option<Row>>> {
        self.exec.get(table, opts)
    }

    /// Insert one row (JSON object); resolves to the new rowid.
    pub fn insert(&self, table: &str, row: &Value) -> Result<Queued<i64>> {
        self.exec.insert(table, row)
    }

    /// Insert several rows as one queued operation; resolves to the rowids.
    pub fn insert_many(&self, table: &str, rows: &[Value]) -> Result<Queued<Vec<i64>>> {
        self.exec.insert_many(table, rows)
    }

    /// Update matching rows; resolves to the affected-row count.
    pub fn update(
        &self,
        table: &str,
        set: &Value,
        filter: Option<&Value>,
    ) -> Result<Queued<usize>> {
        self.exec.update(table, set, filter)
    }

    /// Delete matching rows; resolves to the affected-row count.
    pub fn delete(&self, table: &str, filter: Option<&Value>) -> Result<Queued<usize>> {
        self.exec.delete(table, filter)
    }

    /// Count matching rows.
    pub fn count(&self, table: &str, filter: Option<&Value>) -> Result<Queued<i64>> {
        self.exec.count(table, filter)
    }

    /// Whether any row matches.
    pub fn exists(&self, table: &str, filter: Option<&Value>) -> Result<Queued<bool>> {
        self.exec.exists(table, filter)
    }

    /// Execute arbitrary SQL (DML/DDL) with named parameters.
    pub fn execute(&self, sql: impl Into<String>, params: NamedParams) -> Queued<usize> {
        self.exec.execute(sql, params)
    }

    /// Run an arbitrary query with named parameters.
    pub fn query(&self, sql: impl Into<String>, params: NamedParams) -> Queued<Vec<Row>> {
        self.exec.query(sql, params)
    }

    /// Execute a multi-statement SQL script.
    pub fn execute_script(&self, sql: impl Into<String>) -> Queued<()> {
        self.exec.script(sql.into())
    }

    /// Load a `.sql` file and execute it as a script.
    ///
    /// The file is read synchronously at call time, so missing-file errors
    /// surface before anything is queued.
    pub fn execute_script_file<P: AsRef<Path>>(&self, path: P) -> Result<Queued<()>> {
        let sql = std::fs::read_to_string(path)?;
        Ok(self.exec.script(sql))
    }

    /// Create a transaction handle.
    ///
    /// The transaction holds a slot in the transaction FIFO from this moment
    /// on; its statements run only between [`Transaction::start`] and the
    /// drain that follows [`Transaction::end`].
    pub fn transaction(&self) -> Transaction {
        let core = self.transactions.admit();
        Transaction {
            exec: Executor::new(core.ops.clone(), Arc::clone(&self.conn)),
            core,
        }
    }

    /// Stop admitting work on the connection-wide scheduler once its queue
    /// empties. Open transactions are unaffected.
    pub fn close(&self) {
        debug!("closing connection-wide scheduler");
        self.sched.close();
    }
}

/// A transaction: a private statement queue plus caller-controlled start and
/// end boundaries.
///
/// Statement methods mirror [`Database`]'s but enqueue on the transaction's
/// own scheduler. Calling them before [`start`](Transaction::start) is
/// legal: work sits queued until the transaction is both started and at the
/// head of the FIFO. Calling them after [`end`](Transaction::end) settles
/// the returned future with `SchedulerClosed`.
///
/// Dropping the handle fires `end` implicitly, so an abandoned transaction
/// releases its FIFO slot instead of blocking the connection forever.
pub struct Transaction {
    core: Arc<TransactionCore>,
    exec: Executor,
}

impl Transaction {
    /// Declare the transaction ready to run. Idempotent.
    pub fn start(&self) {
        self.core.start.fire();
    }

    /// Declare the transaction finished. Idempotent.
    ///
    /// Statements already enqueued still run; the next transaction is
    /// admitted once this one's queue empties.
    pub fn end(&self) {
        self.core.end.fire();
        self.core.ops.close();
    }

    /// Enqueue `BEGIN`.
    pub fn begin(&self) -> Queued<usize> {
        self.exec.execute("BEGIN", NamedParams::new())
    }

    /// Enqueue `COMMIT`.
    pub fn commit(&self) -> Queued<usize> {
        self.exec.execute("COMMIT", NamedParams::new())
    }

    /// Enqueue `ROLLBACK`.
    pub fn rollback(&self) -> Queued<usize> {
        self.exec.execute("ROLLBACK", NamedParams::new())
    }

    pub fn select(&self, table: &str, opts: &SelectOptions) -> Result<Queued<Vec<Row>>> {
        self.exec.select(table, opts)
    }

    pub fn get(&self, table: &str, opts: &SelectOptions) -> Result<Queued<Option<Row>>> {
        self.exec.get(table, opts)
    }

    pub fn insert(&self, table: &str, row: &Value) -> Result<Queued<i64>> {
        self.exec.insert(table, row)
    }

    pub fn insert_many(&self, table: &str, rows: &[Value]) -> Result<Queued<Vec<i64>>> {
        self.exec.insert_many(table, rows)
    }

    pub fn update(
        &self,
        table: &str,
        set: &Value,
        filter: Option<&Value>,
    ) -> Result<Queued<usize>> {
        self.exec.update(table, set, filter)
    }

    pub fn delete(&self, table: &str, filter: Option<&Value>) -> Result<Queued<usize>> {
        self.exec.delete(table, filter)
    }

    pub fn count(&self, table: &str, filter: Option<&Value>) -> Result<Queued<i64>> {
        self.exec.count(table, filter)
    }

    pub fn exists(&self, table: &str, filter: Option<&Value>) -> Result<Queued<bool>> {
        self.exec.exists(table, filter)
    }

    pub fn execute(&self, sql: impl Into<String>, params: NamedParams) -> Queued<usize> {
        self.exec.execute(sql, params)
    }

    pub fn query(&self, sql: impl Into<String>, params: NamedParams) -> Queued<Vec<Row>> {
        self.exec.query(sql, params)
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        self.core.end.fire();
        self.core.ops.close();
    }
}
