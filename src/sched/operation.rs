//! FIFO, single-flight operation scheduler.
//!
//! One scheduler fronts one connection. `enqueue` hands back a [`Queued`]
//! future immediately; the operation itself runs on the scheduler's drain
//! task, strictly in submission order, one at a time. A failing operation
//! settles its own future and never blocks the rest of the queue.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};

use tokio::sync::{oneshot, Notify};
use tracing::trace;

use crate::types::{DatabaseError, Result};

type Job = Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send>;

struct State {
    queue: VecDeque<Job>,
    running: bool,
    closed: bool,
}

struct Inner {
    state: Mutex<State>,
    work: Notify,
    /// Self-draining when true; a paused scheduler is driven externally
    /// (by the transaction scheduler).
    auto: bool,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("scheduler state poisoned")
    }
}

/// FIFO execution queue bound to one connection.
///
/// Cloning yields another handle to the same queue. All methods are safe to
/// call from any task; `enqueue` must run inside a tokio runtime (it spawns
/// the drain task on first use).
#[derive(Clone)]
pub struct OperationScheduler {
    inner: Arc<Inner>,
}

impl OperationScheduler {
    /// New self-draining scheduler: enqueueing on an idle queue starts the
    /// drain task in the same call.
    pub fn new() -> Self {
        Self::with_mode(true)
    }

    /// New paused scheduler; drained only via [`drain_queued`].
    ///
    /// [`drain_queued`]: OperationScheduler::drain_queued
    pub(crate) fn paused() -> Self {
        Self::with_mode(false)
    }

    fn with_mode(auto: bool) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    queue: VecDeque::new(),
                    running: false,
                    closed: false,
                }),
                work: Notify::new(),
                auto,
            }),
        }
    }

    /// Submit an operation; returns its settlement future immediately.
    ///
    /// The thunk takes no arguments; its closure captures the connection
    /// facade and any bound parameters. Submission order is execution order;
    /// at most one operation is in flight at any instant.
    ///
    /// On a closed scheduler the returned future resolves to
    /// `DatabaseError::SchedulerClosed` without the operation ever running.
    pub fn enqueue<F, Fut, T>(&self, operation: F) -> Queued<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();

        let mut state = self.inner.lock();
        if state.closed {
            drop(state);
            let _ = tx.send(Err(DatabaseError::SchedulerClosed));
            return Queued { rx };
        }

        state.queue.push_back(Box::new(move || {
            let fut: Pin<Box<dyn Future<Output = ()> + Send>> = Box::pin(async move {
                let result = operation().await;
                // Receiver may be gone; the operation still ran.
                let _ = tx.send(result);
            });
            fut
        }));
        trace!(pending = state.queue.len(), "operation enqueued");

        if self.inner.auto {
            if !state.running {
                state.running = true;
                drop(state);
                self.spawn_drain();
            }
        } else {
            drop(state);
            self.inner.work.notify_one();
        }

        Queued { rx }
    }

    /// Stop admitting operations once the current queue empties.
    ///
    /// Operations already queued still run; later `enqueue` calls settle
    /// with `SchedulerClosed`.
    pub fn close(&self) {
        self.inner.lock().closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Number of operations waiting (excludes the one in flight).
    pub fn pending(&self) -> usize {
        self.inner.lock().queue.len()
    }

    fn spawn_drain(&self) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            loop {
                let job = {
                    let mut state = inner.lock();
                    match state.queue.pop_front() {
                        Some(job) => job,
                        None => {
                            state.running = false;
                            break;
                        }
                    }
                };
                job().await;
            }
            trace!("drain task idle");
        });
    }

    /// Run everything currently queued, in order, to completion.
    ///
    /// Driver-side API for paused schedulers; the transaction scheduler is
    /// the only caller, so there is no concurrent-drain race to guard.
    pub(crate) async fn drain_queued(&self) {
        loop {
            let job = { self.inner.lock().queue.pop_front() };
            match job {
                Some(job) => job().await,
                None => break,
            }
        }
    }

    /// Resolves when new work may have arrived on a paused scheduler.
    pub(crate) async fn work_arrived(&self) {
        self.inner.work.notified().await;
    }

    /// Close and drop everything still queued. The abandoned delivery
    /// channels settle the corresponding futures with `SchedulerClosed`.
    pub(crate) fn discard_queued(&self) {
        let dropped = {
            let mut state = self.inner.lock();
            state.closed = true;
            std::mem::take(&mut state.queue)
        };
        drop(dropped);
    }
}

impl Default for OperationScheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Settlement future for an enqueued operation.
///
/// Dropping it does not cancel the operation. Once enqueued, the operation
/// will run; only the result delivery is abandoned.
pub struct Queued<T> {
    rx: oneshot::Receiver<Result<T>>,
}

impl<T> Future for Queued<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.get_mut().rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            // Sender dropped without delivering: the queue was discarded
            // before the operation ran.
            Poll::Ready(Err(_)) => Poll::Ready(Err(DatabaseError::SchedulerClosed)),
            Poll::Pending => Poll::Pending,
        }
    }
}
