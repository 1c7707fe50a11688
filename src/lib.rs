//! turnstile - ordered access to embedded SQLite.
//!
//! A query-construction and execution-ordering layer in front of a single
//! `rusqlite` connection:
//! - Declarative JSON filter trees compile to parameterized SQL predicates
//!   (`@whr1`, `@whr2`, ...) with stable, globally unique parameter names.
//! - Every statement runs through a FIFO, single-flight scheduler, so a
//!   non-reentrant connection stays safe even when callers fire many
//!   operations without awaiting each one.
//! - Transactions hold caller-controlled start/end boundaries and execute
//!   strictly in creation order, never interleaved.

pub mod config;
pub mod database;
pub mod query;
pub mod sched;
pub mod storage;
pub mod types;

pub use config::DbOptions;
pub use database::{Database, Transaction};
pub use query::{compile, CompiledPredicate, Connector, Operator, SelectOptions};
pub use sched::{OperationScheduler, Queued, TransactionScheduler};
pub use storage::Connection;
pub use types::{DatabaseError, NamedParams, Result, Row, SqlValue};
