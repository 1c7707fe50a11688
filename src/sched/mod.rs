//! Execution scheduling: the single-flight operation queue and the
//! transaction FIFO layered on top of it.

pub mod operation;
pub mod signal;
pub mod transaction;

pub use operation::{OperationScheduler, Queued};
pub use transaction::TransactionScheduler;
