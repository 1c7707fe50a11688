//! Transaction scheduler: FIFO sequencing of whole transactions.
//!
//! Each transaction owns a paused [`OperationScheduler`] plus two one-shot
//! signals, *start* and *end*. The scheduler admits one transaction at a
//! time: it waits for the caller to fire *start*, drives the private queue
//! until *end* fires and the queue is dry, then moves to the next
//! transaction. Two guarantees fall out: transactions execute strictly in
//! creation order, never interleaved, and statements within a transaction
//! execute strictly in invocation order.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::sched::operation::OperationScheduler;
use crate::sched::signal::Signal;

/// Shared lifecycle state of one transaction: the two boundary signals and
/// the private statement queue.
pub(crate) struct TransactionCore {
    pub(crate) start: Signal,
    pub(crate) end: Signal,
    pub(crate) ops: OperationScheduler,
}

impl TransactionCore {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            start: Signal::new(),
            end: Signal::new(),
            ops: OperationScheduler::paused(),
        })
    }
}

struct State {
    queue: VecDeque<Arc<TransactionCore>>,
    running: bool,
}

struct Inner {
    state: Mutex<State>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("transaction scheduler state poisoned")
    }
}

/// FIFO queue of transactions against one connection.
#[derive(Clone)]
pub struct TransactionScheduler {
    inner: Arc<Inner>,
}

impl TransactionScheduler {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    queue: VecDeque::new(),
                    running: false,
                }),
            }),
        }
    }

    /// Create a transaction slot, append it to the FIFO, and start the
    /// drive loop if it is idle.
    pub(crate) fn admit(&self) -> Arc<TransactionCore> {
        let core = TransactionCore::new();
        let mut state = self.inner.lock();
        state.queue.push_back(Arc::clone(&core));
        debug!(queued = state.queue.len(), "transaction admitted");
        if !state.running {
            state.running = true;
            drop(state);
            self.spawn_drive();
        }
        core
    }

    fn spawn_drive(&self) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            loop {
                let core = {
                    let mut state = inner.lock();
                    match state.queue.pop_front() {
                        Some(core) => core,
                        None => {
                            state.running = false;
                            break;
                        }
                    }
                };
                drive_one(&core).await;
            }
        });
    }
}

impl Default for TransactionScheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Run one transaction's lifecycle while it holds the connection slot.
async fn drive_one(core: &TransactionCore) {
    tokio::select! {
        _ = core.start.wait() => {
            debug!("transaction started");
            loop {
                core.ops.drain_queued().await;
                tokio::select! {
                    _ = core.end.wait() => break,
                    _ = core.ops.work_arrived() => {}
                }
            }
            // Statements enqueued after start but before end are honored.
            core.ops.drain_queued().await;
            core.ops.close();
            debug!("transaction ended");
        }
        _ = core.end.wait() => {
            // Ended (or dropped) without ever starting: release the slot.
            // If start also fired in the same race, honor the queue once.
            if core.start.is_fired() {
                core.ops.drain_queued().await;
                core.ops.close();
            } else {
                core.ops.discard_queued();
            }
            debug!("transaction released without running");
        }
    }
}
