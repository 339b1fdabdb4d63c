#![forbid(unsafe_code)]

//! The reactive matcher.
//!
//! # Activation
//!
//! Construction only stores references. The recomputation is started by the
//! first [`current_match()`](ReactiveMatcher::current_match) or
//! [`invalidate()`](ReactiveMatcher::invalidate), runs once synchronously,
//! and from then on re-runs at every flush following a change of the input
//! or an explicit invalidation. [`add_route()`](ReactiveMatcher::add_route)
//! never activates.
//!
//! # Consistent reads during a flush
//!
//! A reader invalidated by the same input change as the matcher may be
//! scheduled ahead of it. When `current_match()` is called during a flush
//! while the matcher is still invalidated, the matcher recomputes first, so
//! the reader sees the new input next to the new match and runs once.
//!
//! # Stop
//!
//! [`stop()`](ReactiveMatcher::stop) is terminal. The cached match is frozen,
//! reads keep returning it, and `add_route`/`invalidate` only touch the
//! engine.
//!
//! # Failure Modes
//!
//! - **Engine fails on activation**: the matcher stays inactive with
//!   [`CachedMatch::Unset`] and the error is returned. The next read retries.
//! - **Engine fails on a later recomputation**: the error surfaces from
//!   [`Tracker::flush`]. The cached match keeps its previous value and the
//!   matcher stays subscribed to the input, so the next input change retries.
//! - **Engine fails while catching up during a flush**: the error is returned
//!   to the reader from `current_match()` instead of from the flush.
//! - **Engine borrowed mutably across a flush**: the recomputation borrows the
//!   engine, so holding `router().borrow_mut()` while flushing panics.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use rrx_tracker::{BoxError, Computation, Dependency, Tracker, TrackerError};

use crate::engine::MatchEngine;
use crate::error::{MatcherError, Result};

/// The memoized state of a matcher.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CachedMatch<M> {
    /// No recomputation has completed yet.
    #[default]
    Unset,
    /// The last recomputation matched.
    Matched(M),
    /// The last recomputation found no matching rule.
    Absent,
}

impl<M> CachedMatch<M> {
    /// The match, treating `Unset` like `Absent`.
    #[must_use]
    pub fn as_option(&self) -> Option<&M> {
        match self {
            Self::Matched(m) => Some(m),
            Self::Unset | Self::Absent => None,
        }
    }

    #[must_use]
    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }
}

impl<M> From<Option<M>> for CachedMatch<M> {
    fn from(value: Option<M>) -> Self {
        value.map_or(Self::Absent, Self::Matched)
    }
}

struct MatcherInner<E: MatchEngine> {
    tracker: Tracker,
    engine: Rc<RefCell<E>>,
    input: Box<dyn Fn() -> E::Target>,
    cached: RefCell<CachedMatch<E::Match>>,
    /// Readers of `current_match()`.
    dependency: Dependency,
    /// `None` until activation. Kept after stop so the matcher never restarts.
    computation: RefCell<Option<Computation>>,
    recomputes: Cell<u64>,
}

impl<E: MatchEngine> MatcherInner<E> {
    fn recompute(&self) -> std::result::Result<(), BoxError> {
        self.recomputes.set(self.recomputes.get() + 1);
        let target = (self.input)();
        let next = {
            let engine = self.engine.borrow();
            if engine.does_match(&target)? {
                CachedMatch::Matched(engine.match_target(&target)?)
            } else {
                CachedMatch::Absent
            }
        };

        let changed = {
            let mut cached = self.cached.borrow_mut();
            if *cached == next {
                false
            } else {
                *cached = next;
                true
            }
        };
        if changed {
            tracing::trace!(
                message = "matcher.changed",
                matched = !matches!(*self.cached.borrow(), CachedMatch::Absent),
                readers = self.dependency.dependent_count()
            );
            self.dependency.changed();
        }
        Ok(())
    }

    fn computation(&self) -> Option<Computation> {
        self.computation.borrow().clone()
    }
}

impl<E: MatchEngine> Drop for MatcherInner<E> {
    fn drop(&mut self) {
        if let Some(computation) = self.computation.get_mut().take() {
            computation.stop();
        }
    }
}

/// A lazily computed, reactively cached match over an engine and an input.
///
/// Cloning yields another handle to the same matcher. Dropping the last
/// handle stops the recomputation, but a reader computation that captured a
/// handle keeps it alive: the matcher holds its readers and the reader holds
/// the matcher. Stop such readers (or the matcher) explicitly to release it.
pub struct ReactiveMatcher<E: MatchEngine> {
    inner: Rc<MatcherInner<E>>,
}

impl<E: MatchEngine> Clone for ReactiveMatcher<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<E> fmt::Debug for ReactiveMatcher<E>
where
    E: MatchEngine,
    E::Match: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveMatcher")
            .field("cached", &*self.inner.cached.borrow())
            .field("active", &self.is_active())
            .field("stopped", &self.is_stopped())
            .field("recomputes", &self.inner.recomputes.get())
            .finish()
    }
}

impl<E> ReactiveMatcher<E>
where
    E: MatchEngine + 'static,
    E::Target: 'static,
    E::Match: 'static,
{
    /// Wrap a shared engine and a reactive input.
    ///
    /// `input` must read its value through a dependency of `tracker` (e.g.
    /// [`Var::accessor`](rrx_tracker::Var::accessor)) for the matcher to
    /// follow input changes. Nothing is computed or subscribed here.
    pub fn new(
        tracker: &Tracker,
        engine: Rc<RefCell<E>>,
        input: impl Fn() -> E::Target + 'static,
    ) -> Self {
        Self {
            inner: Rc::new(MatcherInner {
                tracker: tracker.clone(),
                engine,
                input: Box::new(input),
                cached: RefCell::new(CachedMatch::Unset),
                dependency: Dependency::new(tracker),
                computation: RefCell::new(None),
                recomputes: Cell::new(0),
            }),
        }
    }

    /// [`new`](ReactiveMatcher::new) for an engine nobody else holds yet.
    pub fn with_engine(
        tracker: &Tracker,
        engine: E,
        input: impl Fn() -> E::Target + 'static,
    ) -> Self {
        Self::new(tracker, Rc::new(RefCell::new(engine)), input)
    }

    /// The current match, or `None` if no rule matches.
    ///
    /// Reactive: the calling computation is re-run whenever the cached match
    /// changes. The first call activates the matcher, so the value returned
    /// is computed from the input as it is now.
    ///
    /// # Errors
    ///
    /// [`MatcherError::Engine`] if activation, or catching up during a flush,
    /// ran the engine and it failed.
    pub fn current_match(&self) -> Result<Option<E::Match>> {
        self.activate()?;
        self.catch_up()?;
        self.inner.dependency.depend();
        Ok(self.inner.cached.borrow().as_option().cloned())
    }

    /// Force a recomputation at the next flush, or activate the matcher
    /// (which computes immediately) if it is not active yet.
    ///
    /// # Errors
    ///
    /// [`MatcherError::Engine`] if activation ran the engine and it failed.
    pub fn invalidate(&self) -> Result<()> {
        match self.inner.computation() {
            Some(computation) => {
                computation.invalidate();
                Ok(())
            }
            None => self.activate(),
        }
    }

    /// Alias for [`invalidate`](ReactiveMatcher::invalidate).
    pub fn rematch(&self) -> Result<()> {
        self.invalidate()
    }

    fn activate(&self) -> Result<()> {
        if self.inner.computation.borrow().is_some() {
            return Ok(());
        }
        let weak: Weak<MatcherInner<E>> = Rc::downgrade(&self.inner);
        let computation = self
            .inner
            .tracker
            .try_autorun(move |_| match weak.upgrade() {
                Some(inner) => inner.recompute(),
                None => Ok(()),
            })
            .map_err(engine_failure)?;
        tracing::debug!(
            message = "matcher.activate",
            computation = computation.id().get()
        );
        *self.inner.computation.borrow_mut() = Some(computation);
        Ok(())
    }

    fn catch_up(&self) -> Result<()> {
        if !self.inner.tracker.is_flushing() {
            return Ok(());
        }
        if let Some(computation) = self.inner.computation() {
            computation.flush().map_err(engine_failure)?;
        }
        Ok(())
    }
}

fn engine_failure(err: TrackerError) -> MatcherError {
    match err {
        TrackerError::Computation { source, .. } => MatcherError::Engine(source),
        other => MatcherError::Tracker(other),
    }
}

impl<E: MatchEngine> ReactiveMatcher<E> {
    /// The engine this matcher was built with.
    #[must_use]
    pub fn router(&self) -> Rc<RefCell<E>> {
        Rc::clone(&self.inner.engine)
    }

    #[must_use]
    pub fn tracker(&self) -> &Tracker {
        &self.inner.tracker
    }

    /// Register `rule` with the engine and schedule a recomputation if the
    /// matcher is active.
    pub fn add_route(&self, rule: E::Rule) {
        self.inner.engine.borrow_mut().add_route(rule);
        if let Some(computation) = self.inner.computation() {
            computation.invalidate();
        }
    }

    /// Stop recomputing, permanently. No-op if never activated or already
    /// stopped.
    pub fn stop(&self) {
        if let Some(computation) = self.inner.computation() {
            if !computation.is_stopped() {
                computation.stop();
                tracing::debug!(
                    message = "matcher.stop",
                    computation = computation.id().get(),
                    recomputes = self.inner.recomputes.get()
                );
            }
        }
    }

    /// Whether the recomputation is running (activated and not stopped).
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.inner
            .computation()
            .is_some_and(|computation| !computation.is_stopped())
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.inner
            .computation()
            .is_some_and(|computation| computation.is_stopped())
    }

    /// Snapshot of the cached state. Not reactive and never activates.
    #[must_use]
    pub fn cached(&self) -> CachedMatch<E::Match> {
        self.inner.cached.borrow().clone()
    }

    /// Number of recomputations attempted so far.
    #[must_use]
    pub fn recompute_count(&self) -> u64 {
        self.inner.recomputes.get()
    }
}
