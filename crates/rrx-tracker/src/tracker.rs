#![forbid(unsafe_code)]

//! Scheduling context: current-computation stack and the flush queue.
//!
//! # Flush
//!
//! [`Tracker::flush`] drains the queue in rounds. A round takes everything
//! queued at its start and re-runs each computation once, in invalidation
//! order. Anything invalidated while the round runs (typically downstream
//! observers of a value that just changed) is queued for the next round.
//! The flush ends when a round starts with an empty queue.
//!
//! Because a queued computation is never queued twice, any burst of
//! invalidations between two flushes costs exactly one re-run.
//!
//! A computation that a reader brings up to date mid-round through
//! [`Computation::flush`] is not run again when the round reaches it.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use crate::computation::{Body, Computation, ComputationId, ComputationInner};
use crate::config::{ErrorPolicy, TrackerConfig};
use crate::error::{BoxError, TrackerError};

/// Counters describing one completed flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushStats {
    /// Rounds executed.
    pub rounds: usize,
    /// Computation bodies executed.
    pub recomputations: usize,
    /// Bodies that returned an error (non-zero only under
    /// [`ErrorPolicy::Isolate`]).
    pub failures: usize,
}

pub(crate) struct TrackerInner {
    config: TrackerConfig,
    pending: RefCell<VecDeque<Rc<ComputationInner>>>,
    /// `None` entries mark [`Tracker::nonreactive`] sections.
    stack: RefCell<Vec<Option<Rc<ComputationInner>>>>,
    flushing: Cell<bool>,
    /// Runs triggered through [`Computation::flush`] during the current flush.
    early_runs: Cell<usize>,
    next_id: Cell<u64>,
}

impl TrackerInner {
    pub(crate) fn enqueue(&self, computation: Rc<ComputationInner>) {
        self.pending.borrow_mut().push_back(computation);
    }

    pub(crate) fn dequeue(&self, id: ComputationId) {
        self.pending.borrow_mut().retain(|c| c.id != id);
    }

    pub(crate) fn note_early_run(&self) {
        if self.flushing.get() {
            self.early_runs.set(self.early_runs.get() + 1);
        }
    }

    /// Push `current` for the lifetime of the returned guard.
    pub(crate) fn enter(&self, current: Option<Rc<ComputationInner>>) -> StackFrame<'_> {
        self.stack.borrow_mut().push(current);
        StackFrame { tracker: self }
    }
}

/// Pops the current-computation stack on drop, unwinding included.
pub(crate) struct StackFrame<'a> {
    tracker: &'a TrackerInner,
}

impl Drop for StackFrame<'_> {
    fn drop(&mut self) {
        self.tracker.stack.borrow_mut().pop();
    }
}

struct FlushGuard<'a>(&'a Cell<bool>);

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Handle to a single-threaded dependency-tracking context.
///
/// Cloning yields another handle to the same context. Trackers are
/// independent: a computation of one tracker is never scheduled by another.
#[derive(Clone)]
pub struct Tracker {
    inner: Rc<TrackerInner>,
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new()
    }
}

impl Tracker {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(TrackerConfig::default())
    }

    #[must_use]
    pub fn with_config(config: TrackerConfig) -> Self {
        Self {
            inner: Rc::new(TrackerInner {
                config,
                pending: RefCell::new(VecDeque::new()),
                stack: RefCell::new(Vec::new()),
                flushing: Cell::new(false),
                early_runs: Cell::new(0),
                next_id: Cell::new(1),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &TrackerConfig {
        &self.inner.config
    }

    fn next_id(&self) -> ComputationId {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        ComputationId(id)
    }

    fn start(&self, body: Body) -> (Computation, Result<(), BoxError>) {
        let inner = Rc::new(ComputationInner::new(
            self.next_id(),
            Rc::downgrade(&self.inner),
            body,
        ));
        tracing::debug!(message = "computation.start", id = inner.id.get());
        let result = inner.run();
        (Computation { inner }, result)
    }

    /// Create a computation and run it once, synchronously.
    ///
    /// The body re-runs at each flush following an invalidation of any
    /// dependency it read during its previous run.
    pub fn autorun<F>(&self, mut body: F) -> Computation
    where
        F: FnMut(&Computation) + 'static,
    {
        let (computation, _) = self.start(Box::new(move |c| {
            body(c);
            Ok(())
        }));
        computation
    }

    /// Fallible [`autorun`](Tracker::autorun).
    ///
    /// If the first run fails the computation is stopped before the error is
    /// returned, so nothing stays subscribed. Failures of later runs are
    /// reported by [`flush`](Tracker::flush).
    pub fn try_autorun<F>(&self, body: F) -> Result<Computation, TrackerError>
    where
        F: FnMut(&Computation) -> Result<(), BoxError> + 'static,
    {
        let (computation, result) = self.start(Box::new(body));
        match result {
            Ok(()) => Ok(computation),
            Err(source) => {
                computation.stop();
                Err(TrackerError::Computation {
                    id: computation.id(),
                    source,
                })
            }
        }
    }

    /// Run every queued computation until the queue is empty.
    ///
    /// # Errors
    ///
    /// - [`TrackerError::ReentrantFlush`] if called from inside a
    ///   computation or another flush.
    /// - [`TrackerError::Computation`] if a body fails, according to the
    ///   configured [`ErrorPolicy`].
    /// - [`TrackerError::FlushLimit`] if work is still queued after
    ///   `max_flush_rounds` rounds. The queue is left as is.
    pub fn flush(&self) -> Result<FlushStats, TrackerError> {
        if self.is_active() || self.inner.flushing.get() {
            return Err(TrackerError::ReentrantFlush);
        }
        self.inner.flushing.set(true);
        self.inner.early_runs.set(0);
        let _guard = FlushGuard(&self.inner.flushing);

        let config = self.inner.config;
        let mut stats = FlushStats::default();
        let mut first_error: Option<TrackerError> = None;

        while self.has_pending() {
            if stats.rounds >= config.max_flush_rounds {
                tracing::warn!(
                    message = "tracker.flush_limit",
                    rounds = stats.rounds,
                    pending = self.pending_count()
                );
                return Err(TrackerError::FlushLimit {
                    rounds: stats.rounds,
                });
            }
            stats.rounds += 1;

            let batch: Vec<_> = self.inner.pending.borrow_mut().drain(..).collect();
            for (idx, computation) in batch.iter().enumerate() {
                // Skipped if stopped or already brought up to date this round.
                if computation.is_stopped() || !computation.is_invalidated() {
                    continue;
                }
                stats.recomputations += 1;
                let Err(source) = computation.run() else {
                    continue;
                };
                stats.failures += 1;
                let err = TrackerError::Computation {
                    id: computation.id,
                    source,
                };
                match config.error_policy {
                    ErrorPolicy::FailFast => {
                        let mut pending = self.inner.pending.borrow_mut();
                        for rest in batch[idx + 1..].iter().rev() {
                            pending.push_front(Rc::clone(rest));
                        }
                        return Err(err);
                    }
                    ErrorPolicy::Isolate => {
                        tracing::warn!(
                            message = "tracker.computation_failed",
                            id = computation.id.get(),
                            error = %err
                        );
                        first_error.get_or_insert(err);
                    }
                }
            }
        }

        stats.recomputations += self.inner.early_runs.replace(0);
        if stats.recomputations > 0 {
            tracing::debug!(
                message = "tracker.flush",
                rounds = stats.rounds,
                recomputations = stats.recomputations,
                failures = stats.failures
            );
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(stats),
        }
    }

    /// Run `f` with no current computation, so nothing it reads is tracked.
    pub fn nonreactive<R>(&self, f: impl FnOnce() -> R) -> R {
        let _frame = self.inner.enter(None);
        f()
    }

    pub(crate) fn current_inner(&self) -> Option<Rc<ComputationInner>> {
        self.inner.stack.borrow().last().cloned().flatten()
    }

    /// The computation whose body is currently running, if any.
    #[must_use]
    pub fn current(&self) -> Option<Computation> {
        self.current_inner().map(|inner| Computation { inner })
    }

    /// Whether a computation body is currently running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.current_inner().is_some()
    }

    /// Whether a flush is in progress.
    #[must_use]
    pub fn is_flushing(&self) -> bool {
        self.inner.flushing.get()
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.inner.pending.borrow().is_empty()
    }

    /// Computations waiting for the next flush.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.pending.borrow().len()
    }

    /// Whether two handles refer to the same tracker.
    #[must_use]
    pub fn ptr_eq(&self, other: &Tracker) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Tracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracker")
            .field("config", &self.inner.config)
            .field("pending", &self.pending_count())
            .field("flushing", &self.inner.flushing.get())
            .finish()
    }
}
