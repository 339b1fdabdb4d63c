#![forbid(unsafe_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use rrx_router::{MatchEngine, MatcherError, ReactiveMatcher};
use rrx_tracker::Computation;

/// A computation that reads a matcher on every run.
///
/// Mirrors how an application view would consume the matcher: read it inside
/// an autorun, re-render on re-run.
pub struct Observer<M> {
    computation: Computation,
    reruns: Rc<Cell<u32>>,
    last: Rc<RefCell<Option<Result<Option<M>, String>>>>,
}

impl<M: Clone + 'static> Observer<M> {
    /// Start observing `matcher`. The first read happens immediately.
    pub fn attach<E>(matcher: &ReactiveMatcher<E>) -> Self
    where
        E: MatchEngine<Match = M> + 'static,
        E::Target: 'static,
    {
        let reruns = Rc::new(Cell::new(0));
        let last = Rc::new(RefCell::new(None));
        let (reruns_in, last_in) = (Rc::clone(&reruns), Rc::clone(&last));
        let tracker = matcher.tracker().clone();
        let matcher = matcher.clone();
        let computation = tracker.autorun(move |c| {
            let seen = matcher
                .current_match()
                .map_err(|err: MatcherError| err.to_string());
            *last_in.borrow_mut() = Some(seen);
            if !c.first_run() {
                reruns_in.set(reruns_in.get() + 1);
            }
        });
        Self {
            computation,
            reruns,
            last,
        }
    }

    /// Runs after the first one.
    #[must_use]
    pub fn reruns(&self) -> u32 {
        self.reruns.get()
    }

    /// What the last run read.
    #[must_use]
    pub fn last(&self) -> Option<Result<Option<M>, String>> {
        self.last.borrow().clone()
    }

    #[must_use]
    pub fn computation(&self) -> &Computation {
        &self.computation
    }

    /// Stop the underlying computation.
    pub fn detach(&self) {
        self.computation.stop();
    }
}
