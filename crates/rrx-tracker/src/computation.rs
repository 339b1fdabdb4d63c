#![forbid(unsafe_code)]

//! Subscribed recomputations.
//!
//! A [`Computation`] owns a body closure. The body runs once when the
//! computation is created and again at every flush after the computation has
//! been invalidated. While the body runs, the computation is the tracker's
//! current computation, so every [`Dependency::depend`](crate::Dependency::depend)
//! it triggers subscribes it.
//!
//! # Lifecycle
//!
//! ```text
//! created ──run──▶ valid ──invalidate──▶ queued ──flush──▶ valid ...
//!                    │                     │
//!                    └──────stop───────────┴──▶ stopped (terminal)
//! ```
//!
//! # Failure Modes
//!
//! - **Body returns `Err`**: the computation stays subscribed to whatever it
//!   read before failing and re-runs on the next invalidation. The error is
//!   handed to the caller of the flush (or of `try_autorun` for the first run).
//! - **Body panics**: the current-computation stack is unwound by a drop
//!   guard. The body is lost and the computation behaves as stopped.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::dependency::DependencyInner;
use crate::error::{BoxError, TrackerError};
use crate::tracker::TrackerInner;

pub(crate) type Body = Box<dyn FnMut(&Computation) -> Result<(), BoxError>>;

/// Identifier of a computation, unique within its tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComputationId(pub(crate) u64);

impl ComputationId {
    /// Raw numeric id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ComputationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub(crate) struct ComputationInner {
    pub(crate) id: ComputationId,
    tracker: Weak<TrackerInner>,
    /// `None` while the body is running and after stop.
    body: RefCell<Option<Body>>,
    invalidated: Cell<bool>,
    stopped: Cell<bool>,
    first_run: Cell<bool>,
    runs: Cell<u64>,
    /// Dependencies that currently hold this computation as a dependent.
    sources: RefCell<Vec<Weak<DependencyInner>>>,
}

impl ComputationInner {
    pub(crate) fn new(id: ComputationId, tracker: Weak<TrackerInner>, body: Body) -> Self {
        Self {
            id,
            tracker,
            body: RefCell::new(Some(body)),
            invalidated: Cell::new(false),
            stopped: Cell::new(false),
            first_run: Cell::new(true),
            runs: Cell::new(0),
            sources: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.stopped.get()
    }

    pub(crate) fn is_invalidated(&self) -> bool {
        self.invalidated.get()
    }

    pub(crate) fn add_source(&self, source: Weak<DependencyInner>) {
        self.sources.borrow_mut().push(source);
    }

    /// Unregister from every dependency read during the last run.
    fn detach_sources(&self) {
        let sources = std::mem::take(&mut *self.sources.borrow_mut());
        for source in sources {
            if let Some(dep) = source.upgrade() {
                dep.remove_dependent(self.id);
            }
        }
    }

    pub(crate) fn invalidate(self: &Rc<Self>) {
        if self.invalidated.get() || self.stopped.get() {
            return;
        }
        self.invalidated.set(true);
        self.detach_sources();
        tracing::trace!(message = "computation.invalidate", id = self.id.0);
        if let Some(tracker) = self.tracker.upgrade() {
            tracker.enqueue(Rc::clone(self));
        }
    }

    pub(crate) fn stop(&self) {
        if self.stopped.replace(true) {
            return;
        }
        self.detach_sources();
        let body = self.body.borrow_mut().take();
        drop(body);
        if let Some(tracker) = self.tracker.upgrade() {
            tracker.dequeue(self.id);
        }
        tracing::debug!(message = "computation.stop", id = self.id.0);
    }

    /// Run now if invalidated, taking the computation off the queue.
    ///
    /// `None` if there was nothing to run. A body already running further up
    /// the stack is left to finish.
    pub(crate) fn flush(self: &Rc<Self>) -> Option<Result<(), BoxError>> {
        if !self.invalidated.get() || self.stopped.get() || self.body.borrow().is_none() {
            return None;
        }
        if let Some(tracker) = self.tracker.upgrade() {
            tracker.dequeue(self.id);
            tracker.note_early_run();
        }
        tracing::trace!(message = "computation.flush", id = self.id.0);
        Some(self.run())
    }

    /// Run the body once with this computation as the current one.
    ///
    /// A stopped computation is skipped and reports success.
    pub(crate) fn run(self: &Rc<Self>) -> Result<(), BoxError> {
        if self.stopped.get() {
            return Ok(());
        }
        let Some(mut body) = self.body.borrow_mut().take() else {
            // Already running further up the stack.
            return Ok(());
        };
        self.invalidated.set(false);
        self.detach_sources();

        let handle = Computation {
            inner: Rc::clone(self),
        };
        let result = match self.tracker.upgrade() {
            Some(tracker) => {
                let _frame = tracker.enter(Some(Rc::clone(self)));
                body(&handle)
            }
            None => body(&handle),
        };

        self.runs.set(self.runs.get() + 1);
        self.first_run.set(false);
        if !self.stopped.get() {
            *self.body.borrow_mut() = Some(body);
        }
        tracing::trace!(
            message = "computation.run",
            id = self.id.0,
            runs = self.runs.get(),
            ok = result.is_ok()
        );
        result
    }
}

/// Handle to a subscribed recomputation.
///
/// Cloning yields another handle to the same computation. Dropping every
/// handle does **not** stop it: a computation stays alive as long as some
/// dependency or the tracker's queue references it. Call
/// [`stop()`](Computation::stop) to tear it down.
#[derive(Clone)]
pub struct Computation {
    pub(crate) inner: Rc<ComputationInner>,
}

impl Computation {
    /// Identifier within the owning tracker.
    #[must_use]
    pub fn id(&self) -> ComputationId {
        self.inner.id
    }

    /// Whether the body is running for the first time.
    ///
    /// Only meaningful inside the body; afterwards it is always `false`.
    #[must_use]
    pub fn first_run(&self) -> bool {
        self.inner.first_run.get()
    }

    /// Whether the computation is queued for the next flush.
    #[must_use]
    pub fn is_invalidated(&self) -> bool {
        self.inner.invalidated.get()
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.get()
    }

    /// Number of completed body runs, successful or not.
    #[must_use]
    pub fn run_count(&self) -> u64 {
        self.inner.runs.get()
    }

    /// Schedule a re-run at the next flush.
    ///
    /// Repeated calls before the flush are no-ops, as is any call after
    /// [`stop()`](Computation::stop).
    pub fn invalidate(&self) {
        self.inner.invalidate();
    }

    /// Re-run now if invalidated instead of waiting for the next flush.
    ///
    /// Returns whether the body ran. Inside [`Tracker::flush`](crate::Tracker::flush)
    /// this lets a reader bring a producer up to date before reading it; the
    /// producer is then skipped for the rest of the round.
    ///
    /// # Errors
    ///
    /// [`TrackerError::Computation`] if the body failed.
    pub fn flush(&self) -> Result<bool, TrackerError> {
        match self.inner.flush() {
            None => Ok(false),
            Some(Ok(())) => Ok(true),
            Some(Err(source)) => Err(TrackerError::Computation {
                id: self.inner.id,
                source,
            }),
        }
    }

    /// Stop the computation permanently.
    ///
    /// Safe to call at any time, including from inside the body and more
    /// than once. The body is dropped and never runs again.
    pub fn stop(&self) {
        self.inner.stop();
    }
}

impl PartialEq for Computation {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Computation {}

impl fmt::Debug for Computation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computation")
            .field("id", &self.inner.id)
            .field("invalidated", &self.inner.invalidated.get())
            .field("stopped", &self.inner.stopped.get())
            .field("runs", &self.inner.runs.get())
            .finish()
    }
}
